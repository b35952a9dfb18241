//! Every site-specific CSS selector lives here.
//!
//! The rest of the crate asks for a [`Field`] and never sees a class name,
//! so a layout change on the site is a config edit, not a code change.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A named piece of metadata read from one feed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Link,
    Author,
    Description,
    Hashtags,
    UploadDate,
    Likes,
    Comments,
    Favorites,
    Shares,
    Music,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Link,
        Field::Author,
        Field::Description,
        Field::Hashtags,
        Field::UploadDate,
        Field::Likes,
        Field::Comments,
        Field::Favorites,
        Field::Shares,
        Field::Music,
    ];

    /// Key used in the extraction script's output.
    pub fn key(self) -> &'static str {
        match self {
            Field::Link => "link",
            Field::Author => "author",
            Field::Description => "description",
            Field::Hashtags => "hashtags",
            Field::UploadDate => "upload_date",
            Field::Likes => "likes",
            Field::Comments => "comments",
            Field::Favorites => "favorites",
            Field::Shares => "shares",
            Field::Music => "music",
        }
    }

    /// Fields that join the text of every match instead of taking the first.
    pub fn is_multi(self) -> bool {
        matches!(self, Field::Hashtags)
    }
}

/// Selector per field, plus the tile container and the "results rendered" marker.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectorMap {
    /// One match per video tile.
    pub item: String,
    /// Present once results have rendered; absent on a login wall.
    pub ready: String,
    pub link: String,
    pub author: String,
    pub description: String,
    pub hashtags: String,
    pub upload_date: String,
    pub likes: String,
    pub comments: String,
    pub favorites: String,
    pub shares: String,
    pub music: String,
}

/// Tile containers of the feed, the search grid and a profile grid.
const ITEM: &str = concat!(
    r#"article[data-e2e="recommend-list-item-container"], "#,
    r#"div[data-e2e="search_top-item"], "#,
    r#"div[data-e2e="user-post-item"]"#
);

impl Default for SelectorMap {
    fn default() -> Self {
        Self {
            item: ITEM.into(),
            // any tile at all, so grid targets count as rendered too
            ready: ITEM.into(),
            link: r#"a[href*="/video/"]"#.into(),
            author: r#"h3[data-e2e="video-author-uniqueid"], [data-e2e="video-author-uniqueid"]"#
                .into(),
            description: r#"h1[data-e2e="video-desc"], [data-e2e="video-desc"]"#.into(),
            hashtags: r#"a[data-e2e="search-common-link"]"#.into(),
            upload_date: r#"a.e1g2yhv81, span[data-e2e="browser-nickname"] span:last-child"#
                .into(),
            likes: r#"strong[data-e2e="like-count"]"#.into(),
            comments: r#"strong[data-e2e="comment-count"]"#.into(),
            favorites: r#"button[aria-label*="Favorites"] strong, strong[data-e2e="undefined-count"]"#
                .into(),
            shares: r#"strong[data-e2e="share-count"]"#.into(),
            music: r#"div.css-pvx3oa-DivMusicText, [data-e2e="video-music"]"#.into(),
        }
    }
}

impl SelectorMap {
    /// Selector for one field.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Link => &self.link,
            Field::Author => &self.author,
            Field::Description => &self.description,
            Field::Hashtags => &self.hashtags,
            Field::UploadDate => &self.upload_date,
            Field::Likes => &self.likes,
            Field::Comments => &self.comments,
            Field::Favorites => &self.favorites,
            Field::Shares => &self.shares,
            Field::Music => &self.music,
        }
    }

    /// Name of the first selector left empty, if any.
    pub fn first_empty(&self) -> Option<&'static str> {
        if self.item.trim().is_empty() {
            return Some("item");
        }
        if self.ready.trim().is_empty() {
            return Some("ready");
        }
        Field::ALL
            .into_iter()
            .find(|f| self.get(*f).trim().is_empty())
            .map(Field::key)
    }

    /// Argument object handed to the in-page extraction script.
    pub fn to_script_arg(&self) -> Value {
        let fields: Map<String, Value> = Field::ALL
            .into_iter()
            .map(|f| (f.key().to_string(), Value::String(self.get(f).to_string())))
            .collect();
        let multi: Vec<Value> = Field::ALL
            .into_iter()
            .filter(|f| f.is_multi())
            .map(|f| Value::String(f.key().to_string()))
            .collect();
        serde_json::json!({
            "item": self.item,
            "link": Field::Link.key(),
            "fields": fields,
            "multi": multi,
        })
    }
}
