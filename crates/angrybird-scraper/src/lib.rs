//! # angrybird-scraper
//!
//! Cookie-authenticated feed scraper. Opens the platform in a real browser,
//! scrolls the chosen listing, turns each video tile into a
//! [`VideoRecord`](angrybird_dataset::VideoRecord), keeps the ones that look
//! like dropshipping content and writes them to a spreadsheet.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use angrybird_scraper::{Config, LogObserver, Scraper};
//! use std::sync::atomic::AtomicBool;
//!
//! # #[tokio::main]
//! # async fn main() -> angrybird_scraper::Result<()> {
//! let config = Config::load("scrape.yaml")?;
//! let cookie = std::fs::read_to_string("cookie.txt")?;
//! let mut scraper = Scraper::launch(&config.browser).await?;
//! let report = scraper
//!     .run(&config, &cookie, &mut LogObserver, &AtomicBool::new(false))
//!     .await?;
//! println!("exported {} videos to {}", report.exported, report.output.display());
//! scraper.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod export;
mod extract;
mod filter;
mod page;
mod progress;
mod runner;
mod session;

pub use config::{
    BrowserConfig, Config, Field, FilterConfig, Limits, OutputConfig, SelectorMap, SessionConfig,
    Target, Viewport, DEFAULT_KEYWORDS, DEFAULT_OUTPUT,
};
pub use export::Exporter;
pub use extract::{record_from_tile, video_id, SkipReason};
pub use filter::ContentFilter;
pub use page::{BrowserPage, FeedPage, RawTile};
pub use progress::{LogObserver, NullObserver, ScrapeObserver};
pub use runner::{run_pipeline, Harvest, Navigator, ScrapeReport, Scraper, StopReason};
pub use session::{authenticate, detect_nickname, Cookie, CookieJar, DEFAULT_COOKIE_FILE};

/// Result type for angrybird-scraper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a scrape run. Per-tile problems are [`SkipReason`]s.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("export failed: {0}")]
    Export(#[source] angrybird_dataset::Error),

    #[error("keyword filter: {0}")]
    Filter(#[from] aho_corasick::BuildError),
}
