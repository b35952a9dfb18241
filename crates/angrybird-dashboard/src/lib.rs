//! # angrybird-dashboard
//!
//! Local web dashboard over the spreadsheet written by `angrybird-scrape`.
//! Every request re-reads the file, so a fresh scrape shows up on reload.
//!
//! ```rust,no_run
//! use angrybird_dashboard::{router, AppState, DashboardConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = DashboardConfig::default();
//! let state = Arc::new(AppState::new(config, reqwest::Client::new()));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8501").await?;
//! axum::serve(listener, router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod charts;
pub mod config;
pub mod html;
pub mod insight;
pub mod loader;
pub mod query;
pub mod server;
pub mod stats;
pub mod trends;

pub use config::{DashboardConfig, InsightConfig, TrendsConfig};
pub use insight::{ChatCompletions, InsightGenerator, LanguageModel};
pub use loader::DataSource;
pub use query::{RowQuery, SortKey, SortOrder};
pub use server::{router, AppState};
pub use stats::{HashtagStat, HashtagStats, Summary};
pub use trends::{KeywordTrend, TrendsClient};

/// Result type for dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Dataset(#[from] angrybird_dataset::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("api returned an empty response")]
    EmptyResponse,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chart error: {0}")]
    Chart(String),
}

impl Error {
    /// HTTP status the error is reported with.
    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Dataset(angrybird_dataset::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Error::Dataset(_) | Error::Io(_) | Error::Chart(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Http(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Error::Http(_) | Error::Api { .. } | Error::EmptyResponse => StatusCode::BAD_GATEWAY,
        }
    }
}
