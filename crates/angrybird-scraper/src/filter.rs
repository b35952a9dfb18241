//! Keyword allow-list over description and hashtags.

use aho_corasick::AhoCorasick;
use angrybird_dataset::VideoRecord;

use crate::config::FilterConfig;
use crate::Result;

/// Keeps a record iff its description or hashtags contain any keyword,
/// case-insensitively. A disabled filter keeps everything.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    matcher: Option<AhoCorasick>,
    keywords: Vec<String>,
}

impl ContentFilter {
    /// Filter that keeps every record.
    pub fn disabled() -> Self {
        Self {
            matcher: None,
            keywords: Vec::new(),
        }
    }

    /// Build from keywords; blank keywords are dropped.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        let matcher = AhoCorasick::new(&keywords)?;
        Ok(Self {
            matcher: Some(matcher),
            keywords,
        })
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        if config.enabled {
            Self::new(&config.keywords)
        } else {
            Ok(Self::disabled())
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.matcher.is_some()
    }

    /// Lower-cased keywords in use.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether `record` passes.
    pub fn matches(&self, record: &VideoRecord) -> bool {
        let Some(ref matcher) = self.matcher else {
            return true;
        };
        if matcher.is_match(&record.description.to_lowercase()) {
            return true;
        }
        record
            .hashtags
            .iter()
            .any(|tag| matcher.is_match(&tag.to_lowercase()))
    }

    /// Keep the passing records, preserving order.
    pub fn apply(&self, records: Vec<VideoRecord>) -> Vec<VideoRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
