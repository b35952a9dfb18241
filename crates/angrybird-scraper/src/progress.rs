//! Progress reporting for a scrape run. Frontends implement this to show
//! what is going on; the library itself only logs.

use angrybird_dataset::VideoRecord;
use tracing::info;

use crate::extract::SkipReason;

/// Callbacks fired during a run. Every method has a no-op default.
pub trait ScrapeObserver {
    /// Free-form status line for human eyes.
    fn status(&mut self, _msg: &str) {}

    /// A new record passed the filter and was kept.
    fn record(&mut self, _record: &VideoRecord) {}

    /// A tile was dropped.
    fn skipped(&mut self, _reason: &SkipReason) {}

    /// A scroll round finished.
    fn round(&mut self, _round: u32, _seen: usize, _kept: usize) {}
}

/// Ignores everything.
pub struct NullObserver;
impl ScrapeObserver for NullObserver {}

/// Writes progress through `tracing` at info level.
#[derive(Default)]
pub struct LogObserver;

impl ScrapeObserver for LogObserver {
    fn status(&mut self, msg: &str) {
        info!("{}", msg);
    }

    fn record(&mut self, record: &VideoRecord) {
        let date = record.upload_date_text();
        info!(
            "{} - Date: {} - {}",
            record.author,
            if date.is_empty() { "?" } else { &date },
            record.description
        );
    }

    fn round(&mut self, round: u32, seen: usize, kept: usize) {
        info!("round {}: {} seen, {} kept", round, seen, kept);
    }
}
