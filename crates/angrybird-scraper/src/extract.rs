//! Raw tile text to [`VideoRecord`].

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use angrybird_dataset::{collect_hashtags, parse_count, parse_upload_date, VideoRecord};
use chrono::NaiveDate;
use regex::Regex;

use crate::config::Field;
use crate::page::RawTile;

/// Why a tile produced no record. Logged and counted, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing rendered yet (placeholder or ad slot).
    Blank,
    /// No link, author or description to identify the video by.
    Unidentifiable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Blank => write!(f, "tile has not rendered"),
            SkipReason::Unidentifiable => write!(f, "tile has no link, author or description"),
        }
    }
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/video/(\d+)").expect("valid video id regex"))
}

/// Numeric video id from a tile link.
pub fn video_id(link: &str) -> Option<String> {
    video_id_regex()
        .captures(link)
        .map(|c| c[1].to_string())
}

fn fingerprint(author: &str, description: &str, date: &str) -> String {
    let mut hasher = DefaultHasher::new();
    author.hash(&mut hasher);
    description.hash(&mut hasher);
    date.hash(&mut hasher);
    format!("fp-{:016x}", hasher.finish())
}

/// Build a record; missing text is `""`, missing counts are 0.
pub fn record_from_tile(tile: &RawTile, today: NaiveDate) -> Result<VideoRecord, SkipReason> {
    if tile.is_empty() {
        return Err(SkipReason::Blank);
    }

    let text = |field: Field| tile.get(field).unwrap_or_default().to_string();
    let count = |field: Field| tile.get(field).map(parse_count).unwrap_or(0);

    let author = text(Field::Author);
    let description = text(Field::Description);
    let date_text = text(Field::UploadDate);

    let id = match tile.get(Field::Link).and_then(video_id) {
        Some(id) => id,
        None if !author.is_empty() || !description.is_empty() => {
            fingerprint(&author, &description, &date_text)
        }
        None => return Err(SkipReason::Unidentifiable),
    };

    let hashtags = collect_hashtags(&description, tile.get(Field::Hashtags));

    Ok(VideoRecord {
        id,
        author,
        hashtags,
        upload_date: parse_upload_date(&date_text, today),
        likes: count(Field::Likes),
        comments: count(Field::Comments),
        favorites: count(Field::Favorites),
        shares: count(Field::Shares),
        music: text(Field::Music),
        description,
    })
}
