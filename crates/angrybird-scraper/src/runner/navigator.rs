use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use angrybird_dataset::VideoRecord;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::{Limits, SelectorMap};
use crate::extract::record_from_tile;
use crate::filter::ContentFilter;
use crate::page::FeedPage;
use crate::progress::ScrapeObserver;
use crate::{Error, Result};

/// Why scrolling stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_items` records were kept.
    TargetReached,
    /// `max_idle_rounds` rounds in a row brought nothing new.
    Exhausted,
    /// The stop flag was raised.
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => write!(f, "target reached"),
            StopReason::Exhausted => write!(f, "no new videos"),
            StopReason::Cancelled => write!(f, "stopped"),
        }
    }
}

/// What a scroll session collected.
#[derive(Debug)]
pub struct Harvest {
    /// Kept records, unique by id, in the order they appeared.
    pub records: Vec<VideoRecord>,
    /// Unique videos seen, kept or not.
    pub seen: usize,
    /// Tiles dropped by the extractor.
    pub skipped: usize,
    pub rounds: u32,
    pub stop: StopReason,
}

/// Reaches the listing and scrolls it until one of the stop conditions.
pub struct Navigator<'a> {
    limits: &'a Limits,
    selectors: &'a SelectorMap,
    filter: &'a ContentFilter,
    today: NaiveDate,
}

impl<'a> Navigator<'a> {
    pub fn new(
        limits: &'a Limits,
        selectors: &'a SelectorMap,
        filter: &'a ContentFilter,
        today: NaiveDate,
    ) -> Self {
        Self {
            limits,
            selectors,
            filter,
            today,
        }
    }

    /// Load `url`, bounded by `navigation_timeout_ms`.
    pub async fn open<P: FeedPage + ?Sized>(&self, page: &mut P, url: &str) -> Result<()> {
        info!("Navigating to: {}", url);
        let limit = Duration::from_millis(self.limits.navigation_timeout_ms);
        match tokio::time::timeout(limit, page.open(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::NavigationTimeout(format!("{}: {}", url, e))),
            Err(_) => Err(Error::NavigationTimeout(format!(
                "{} did not load within {}ms",
                url, self.limits.navigation_timeout_ms
            ))),
        }
    }

    /// Wait for results to render, backing off exponentially between checks.
    ///
    /// A listing that never shows a single result means the session was
    /// not accepted, so this fails with [`Error::Authentication`].
    pub async fn wait_ready<P: FeedPage + ?Sized>(&self, page: &P) -> Result<()> {
        let attempts = self.limits.ready_attempts;
        let mut delay = self.limits.ready_backoff_ms;

        for attempt in 1..=attempts {
            match page.has(&self.selectors.ready).await {
                Ok(true) => {
                    debug!("results rendered after {} check(s)", attempt);
                    return Ok(());
                }
                Ok(false) => debug!("results not rendered yet ({}/{})", attempt, attempts),
                Err(e) => debug!("ready check {}/{} failed: {}", attempt, attempts, e),
            }
            if attempt < attempts {
                page.pause(delay).await;
                delay = delay.saturating_mul(2);
            }
        }

        let url = page.current_url().await.unwrap_or_default();
        Err(Error::Authentication(format!(
            "no results rendered at {} after {} checks; the cookie is probably invalid or expired",
            url, attempts
        )))
    }

    /// Scroll and extract until a stop condition holds.
    ///
    /// `checkpoint` is called with all kept records after every round that
    /// added at least one.
    pub async fn collect<P: FeedPage + ?Sized>(
        &self,
        page: &P,
        observer: &mut dyn ScrapeObserver,
        cancel: &AtomicBool,
        checkpoint: &mut dyn FnMut(&[VideoRecord]),
    ) -> Result<Harvest> {
        let mut ids: HashSet<String> = HashSet::new();
        let mut records: Vec<VideoRecord> = Vec::new();
        let mut skipped = 0;
        let mut rounds = 0;
        let mut idle_rounds = 0;

        let stop = loop {
            if cancel.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            rounds += 1;
            page.pause(self.limits.settle_ms).await;

            let tiles = match page.tiles(self.selectors).await {
                Ok(tiles) => tiles,
                Err(e) => {
                    warn!("Round {}: extraction failed, treating as empty: {}", rounds, e);
                    Vec::new()
                }
            };

            let kept_before = records.len();
            let mut fresh = 0;
            for tile in &tiles {
                match record_from_tile(tile, self.today) {
                    Ok(record) => {
                        if !ids.insert(record.id.clone()) {
                            continue;
                        }
                        fresh += 1;
                        if records.len() < self.limits.max_items && self.filter.matches(&record) {
                            observer.record(&record);
                            records.push(record);
                        }
                    }
                    Err(reason) => {
                        skipped += 1;
                        debug!("Round {}: skipped tile: {}", rounds, reason);
                        observer.skipped(&reason);
                    }
                }
            }

            observer.round(rounds, ids.len(), records.len());
            if records.len() > kept_before {
                checkpoint(&records);
            }

            if records.len() >= self.limits.max_items {
                break StopReason::TargetReached;
            }
            if fresh == 0 {
                idle_rounds += 1;
                debug!(
                    "Round {}: nothing new ({}/{})",
                    rounds, idle_rounds, self.limits.max_idle_rounds
                );
                if idle_rounds >= self.limits.max_idle_rounds {
                    break StopReason::Exhausted;
                }
            } else {
                idle_rounds = 0;
            }

            if let Err(e) = page.scroll().await {
                warn!("Round {}: scroll failed: {}", rounds, e);
            }
            page.pause(self.limits.scroll_pause_ms).await;
        };

        info!(
            "Stopped after {} rounds ({}): {} kept of {} seen",
            rounds,
            stop,
            records.len(),
            ids.len()
        );

        Ok(Harvest {
            seen: ids.len(),
            records,
            skipped,
            rounds,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Field;
    use crate::page::testing::{tile, FakePage};
    use crate::page::RawTile;
    use crate::progress::NullObserver;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    fn limits() -> Limits {
        Limits {
            max_items: 100,
            max_idle_rounds: 3,
            scroll_pause_ms: 10,
            settle_ms: 5,
            ready_attempts: 3,
            ready_backoff_ms: 100,
            navigation_timeout_ms: 50,
        }
    }

    async fn collect(
        page: &FakePage,
        limits: &Limits,
        filter: &ContentFilter,
        cancel: bool,
    ) -> (Harvest, usize) {
        let selectors = SelectorMap::default();
        let nav = Navigator::new(limits, &selectors, filter, today());
        let mut checkpoints = 0;
        let harvest = nav
            .collect(
                page,
                &mut NullObserver,
                &AtomicBool::new(cancel),
                &mut |_| checkpoints += 1,
            )
            .await
            .unwrap();
        (harvest, checkpoints)
    }

    #[tokio::test]
    async fn test_zero_items_stops_after_idle_rounds() {
        let page = FakePage::new(vec![Vec::new()]);
        let (harvest, checkpoints) =
            collect(&page, &limits(), &ContentFilter::disabled(), false).await;
        assert_eq!(harvest.stop, StopReason::Exhausted);
        assert_eq!(harvest.rounds, 3);
        assert!(harvest.records.is_empty());
        assert_eq!(page.tile_calls.get(), 3);
        assert_eq!(page.called("scroll"), 2);
        assert_eq!(checkpoints, 0);
    }

    #[tokio::test]
    async fn test_overlapping_rounds_are_deduplicated() {
        let page = FakePage::new(vec![
            vec![tile("1", "a", "x"), tile("2", "b", "y")],
            vec![tile("2", "b", "y"), tile("3", "c", "z")],
            vec![tile("3", "c", "z")],
        ]);
        let (harvest, checkpoints) =
            collect(&page, &limits(), &ContentFilter::disabled(), false).await;
        let ids: Vec<&str> = harvest.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(harvest.seen, 3);
        assert_eq!(harvest.stop, StopReason::Exhausted);
        // two productive rounds, then three idle ones
        assert_eq!(harvest.rounds, 5);
        assert_eq!(checkpoints, 2);
    }

    #[tokio::test]
    async fn test_stops_at_max_items() {
        let page = FakePage::new(vec![vec![
            tile("1", "a", "x"),
            tile("2", "b", "y"),
            tile("3", "c", "z"),
        ]]);
        let mut limits = limits();
        limits.max_items = 2;
        let (harvest, _) = collect(&page, &limits, &ContentFilter::disabled(), false).await;
        assert_eq!(harvest.stop, StopReason::TargetReached);
        assert_eq!(harvest.records.len(), 2);
        assert_eq!(harvest.rounds, 1);
        assert_eq!(page.called("scroll"), 0);
    }

    #[tokio::test]
    async fn test_filter_drops_but_counts_as_seen() {
        let page = FakePage::new(vec![vec![
            tile("1", "a", "new stock just dropped"),
            tile("2", "b", "my dog"),
        ]]);
        let filter = ContentFilter::new(["stock"]).unwrap();
        let (harvest, _) = collect(&page, &limits(), &filter, false).await;
        assert_eq!(harvest.records.len(), 1);
        assert_eq!(harvest.records[0].id, "1");
        assert_eq!(harvest.seen, 2);
    }

    #[tokio::test]
    async fn test_cancel_before_first_round() {
        let page = FakePage::new(vec![vec![tile("1", "a", "x")]]);
        let (harvest, _) = collect(&page, &limits(), &ContentFilter::disabled(), true).await;
        assert_eq!(harvest.stop, StopReason::Cancelled);
        assert_eq!(harvest.rounds, 0);
        assert_eq!(page.tile_calls.get(), 0);
    }

    #[tokio::test]
    async fn test_failed_round_is_not_fatal() {
        let mut page = FakePage::new(vec![
            vec![tile("1", "a", "x")],
            vec![tile("1", "a", "x")],
            vec![tile("2", "b", "y")],
            vec![],
        ]);
        page.failing_rounds = vec![1];
        let (harvest, _) = collect(&page, &limits(), &ContentFilter::disabled(), false).await;
        assert_eq!(harvest.records.len(), 2);
        assert_eq!(harvest.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_skipped_tiles_are_counted() {
        let page = FakePage::new(vec![
            vec![
                RawTile::default(),
                RawTile::default().with(Field::Likes, "3"),
                tile("1", "a", "x"),
            ],
            vec![],
        ]);
        let (harvest, _) = collect(&page, &limits(), &ContentFilter::disabled(), false).await;
        assert_eq!(harvest.records.len(), 1);
        assert_eq!(harvest.skipped, 2);
    }

    #[tokio::test]
    async fn test_not_ready_is_authentication_failure() {
        let mut page = FakePage::new(Vec::new());
        page.ready = false;
        let limits = limits();
        let selectors = SelectorMap::default();
        let filter = ContentFilter::disabled();
        let nav = Navigator::new(&limits, &selectors, &filter, today());

        let err = nav.wait_ready(&page).await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)), "{err}");
        assert_eq!(page.called("has"), 3);
        // backoff doubles between checks, none after the last
        let pauses: Vec<String> = page
            .calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with("pause"))
            .cloned()
            .collect();
        assert_eq!(pauses, vec!["pause 100", "pause 200"]);
    }

    #[tokio::test]
    async fn test_open_times_out() {
        let mut page = FakePage::new(Vec::new());
        page.hang_on_open = true;
        let limits = limits();
        let selectors = SelectorMap::default();
        let filter = ContentFilter::disabled();
        let nav = Navigator::new(&limits, &selectors, &filter, today());

        let err = nav.open(&mut page, "https://www.tiktok.com/").await.unwrap_err();
        assert!(matches!(err, Error::NavigationTimeout(_)), "{err}");
    }
}
