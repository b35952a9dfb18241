//! Row filter and sort from the dashboard sidebar.

use std::cmp::Ordering;

use angrybird_dataset::VideoRecord;
use serde::{Deserialize, Deserializer};

/// Rows the table shows; the download carries every matching row.
pub const MAX_DISPLAY_ROWS: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    UploadDate,
    Likes,
    Comments,
    Favorites,
    Shares,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::UploadDate,
        SortKey::Likes,
        SortKey::Comments,
        SortKey::Favorites,
        SortKey::Shares,
    ];

    /// Query-string value.
    pub fn key(self) -> &'static str {
        match self {
            SortKey::UploadDate => "upload_date",
            SortKey::Likes => "likes",
            SortKey::Comments => "comments",
            SortKey::Favorites => "favorites",
            SortKey::Shares => "shares",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::UploadDate => "Upload Date",
            SortKey::Likes => "Likes",
            SortKey::Comments => "Comments",
            SortKey::Favorites => "Favorites",
            SortKey::Shares => "Shares",
        }
    }

    fn compare(self, a: &VideoRecord, b: &VideoRecord) -> Ordering {
        match self {
            // unknown dates sort before every known one
            SortKey::UploadDate => a.upload_date.cmp(&b.upload_date),
            SortKey::Likes => a.likes.cmp(&b.likes),
            SortKey::Comments => a.comments.cmp(&b.comments),
            SortKey::Favorites => a.favorites.cmp(&b.favorites),
            SortKey::Shares => a.shares.cmp(&b.shares),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter and sort parameters, deserialized from the query string.
/// Empty form fields count as unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RowQuery {
    /// Case-insensitive substring of the uploader.
    pub uploader: Option<String>,
    #[serde(deserialize_with = "blank_as_zero")]
    pub min_likes: u64,
    #[serde(deserialize_with = "blank_as_zero")]
    pub min_comments: u64,
    pub sort: SortKey,
    pub order: SortOrder,
}

fn blank_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(0),
        Some(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl RowQuery {
    fn uploader_needle(&self) -> Option<String> {
        self.uploader
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Matching rows, sorted. The sort is stable, so equal keys keep file
    /// order.
    pub fn apply(&self, records: &[VideoRecord]) -> Vec<VideoRecord> {
        let needle = self.uploader_needle();
        let mut rows: Vec<VideoRecord> = records
            .iter()
            .filter(|r| match needle {
                Some(ref n) => r.author.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .filter(|r| r.likes >= self.min_likes && r.comments >= self.min_comments)
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let ord = self.sort.compare(a, b);
            match self.order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
        rows
    }

    /// The same query as a URL query string, for links that must keep it.
    pub fn to_query_string(&self) -> String {
        let mut pairs = url::form_urlencoded::Serializer::new(String::new());
        if let Some(ref uploader) = self.uploader {
            pairs.append_pair("uploader", uploader);
        }
        pairs
            .append_pair("min_likes", &self.min_likes.to_string())
            .append_pair("min_comments", &self.min_comments.to_string())
            .append_pair("sort", self.sort.key())
            .append_pair(
                "order",
                match self.order {
                    SortOrder::Ascending => "ascending",
                    SortOrder::Descending => "descending",
                },
            );
        pairs.finish()
    }
}
