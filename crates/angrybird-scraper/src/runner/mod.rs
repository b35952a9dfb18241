mod navigator;

pub use navigator::{Harvest, Navigator, StopReason};

use crate::config::{BrowserConfig, Config};
use crate::export::Exporter;
use crate::filter::ContentFilter;
use crate::page::{BrowserPage, FeedPage};
use crate::progress::ScrapeObserver;
use crate::session::{authenticate, detect_nickname, CookieJar};
use crate::Result;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Outcome of a finished scrape.
#[derive(Debug)]
pub struct ScrapeReport {
    /// Rows written to the spreadsheet.
    pub exported: usize,
    /// Unique videos seen, kept or not.
    pub seen: usize,
    /// Tiles the extractor dropped.
    pub skipped: usize,
    pub rounds: u32,
    pub stop: StopReason,
    pub output: PathBuf,
    /// Nickname of the signed-in account, when the page revealed it.
    pub logged_in_as: Option<String>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// Authenticate, navigate, scroll, extract, filter and export, in that order.
///
/// The cookie is parsed before the page is touched, so a malformed or empty
/// cookie fails without any navigation or extraction.
pub async fn run_pipeline<P: FeedPage + ?Sized>(
    page: &mut P,
    config: &Config,
    cookie: &str,
    observer: &mut dyn ScrapeObserver,
    cancel: &AtomicBool,
) -> Result<ScrapeReport> {
    let start = Instant::now();
    let jar = CookieJar::parse(cookie)?;
    let filter = ContentFilter::from_config(&config.filter)?;
    let exporter = Exporter::new(&config.output);
    let url = config.target_url()?;
    let today = chrono::Local::now().date_naive();

    observer.status(&format!("Starting scrape: {} ({})", config.name, config.target));
    authenticate(page, &jar, &config.session.domain).await?;

    let navigator = Navigator::new(&config.limits, &config.selectors, &filter, today);
    navigator.open(page, &url).await?;

    let logged_in_as = match page.source().await {
        Ok(html) => detect_nickname(&html),
        Err(e) => {
            debug!("could not read page source: {}", e);
            None
        }
    };
    match logged_in_as {
        Some(ref name) => observer.status(&format!("Logged in as {}", name)),
        None => warn!("Could not detect the logged-in account"),
    }

    navigator.wait_ready(&*page).await?;

    let harvest = navigator
        .collect(&*page, observer, cancel, &mut |records| {
            if exporter.checkpoint(records) {
                debug!("checkpoint: {} rows", records.len());
            }
        })
        .await?;

    exporter.export(&harvest.records)?;
    observer.status(&format!(
        "Data saved to '{}' ({} videos)",
        exporter.path().display(),
        harvest.records.len()
    ));

    Ok(ScrapeReport {
        exported: harvest.records.len(),
        seen: harvest.seen,
        skipped: harvest.skipped,
        rounds: harvest.rounds,
        stop: harvest.stop,
        output: exporter.path().to_path_buf(),
        logged_in_as,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Runs scrapes in a real browser.
pub struct Scraper {
    page: BrowserPage,
}

impl Scraper {
    /// Launch the browser.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        Ok(Self {
            page: BrowserPage::launch(config).await?,
        })
    }

    /// Underlying browser tab.
    pub fn page(&self) -> &BrowserPage {
        &self.page
    }

    /// Run one scrape; on failure a screenshot is saved if configured.
    pub async fn run(
        &mut self,
        config: &Config,
        cookie: &str,
        observer: &mut dyn ScrapeObserver,
        cancel: &AtomicBool,
    ) -> Result<ScrapeReport> {
        let result = run_pipeline(&mut self.page, config, cookie, observer, cancel).await;
        if let Err(ref e) = result {
            warn!("Scrape failed: {}", e);
            self.handle_failure(config).await;
        }
        result
    }

    async fn handle_failure(&self, config: &Config) {
        let Some(ref template) = config.output.failure_screenshot else {
            return;
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = PathBuf::from(
            template
                .to_string_lossy()
                .replace("{timestamp}", &timestamp.to_string()),
        );
        info!("Saving failure screenshot to: {}", path.display());
        if let Err(e) = self.page.screenshot(&path).await {
            warn!("Failed to save screenshot: {}", e);
        }
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.page.close().await
    }
}
