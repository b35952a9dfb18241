//! # angrybird-dataset
//!
//! The one artifact the scraper and the dashboard share: a spreadsheet with a
//! fixed column set, one row per scraped video.
//!
//! ```rust,no_run
//! use angrybird_dataset::{read_workbook, write_workbook, VideoRecord};
//!
//! # fn main() -> angrybird_dataset::Result<()> {
//! let records = vec![VideoRecord::new("7301", "someone")];
//! write_workbook("tiktok_video_data.xlsx", &records)?;
//! let back = read_workbook("tiktok_video_data.xlsx")?;
//! assert_eq!(back.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod count;
pub mod date;
pub mod schema;
mod xlsx;

use std::path::PathBuf;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

pub use count::parse_count;
pub use date::parse_upload_date;
pub use schema::{Column, SHEET_NAME};
pub use xlsx::{read_workbook, read_workbook_from, write_to_buffer, write_workbook};

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while writing or reading the exported dataset.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xlsx write error: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("xlsx read error: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("workbook has no worksheet")]
    EmptyWorkbook,
}

/// One scraped video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    /// Unique within a scrape run.
    pub id: String,
    pub author: String,
    pub description: String,
    /// Lower-cased `#tags`, de-duplicated, in order of appearance.
    pub hashtags: Vec<String>,
    pub upload_date: Option<NaiveDate>,
    pub likes: u64,
    pub comments: u64,
    pub favorites: u64,
    pub shares: u64,
    pub music: String,
}

impl VideoRecord {
    /// A record with the given identity and every other field at its default.
    pub fn new(id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            description: String::new(),
            hashtags: Vec::new(),
            upload_date: None,
            likes: 0,
            comments: 0,
            favorites: 0,
            shares: 0,
            music: String::new(),
        }
    }

    /// Likes + comments + shares.
    pub fn engagement(&self) -> u64 {
        self.likes
            .saturating_add(self.comments)
            .saturating_add(self.shares)
    }

    /// Upload date as `YYYY-MM-DD`, or empty when unknown.
    pub fn upload_date_text(&self) -> String {
        self.upload_date
            .map(|d| d.format(date::ISO_FORMAT).to_string())
            .unwrap_or_default()
    }
}

fn hashtag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"))
}

/// Collect `#tags` from free text, merged with any extra tag texts.
///
/// Output is lower-cased with the leading `#`, duplicates dropped.
pub fn collect_hashtags<'a>(
    description: &str,
    extra: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        let tag = format!("#{}", tag.to_lowercase());
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    for cap in hashtag_regex().captures_iter(description) {
        push(&cap[1]);
    }
    for text in extra {
        for cap in hashtag_regex().captures_iter(text) {
            push(&cap[1]);
        }
    }
    tags
}
