//! Aggregates shown on the dashboard.

use std::collections::HashMap;

use angrybird_dataset::VideoRecord;
use serde::Serialize;

/// How many hashtags the top lists and the chart show.
pub const TOP_HASHTAGS: usize = 10;

/// Totals and per-video averages.
///
/// Views are not scraped, so the engagement rate is engagement per video:
/// `(likes + comments + shares) / videos`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub videos: usize,
    pub total_likes: u64,
    pub total_comments: u64,
    pub total_shares: u64,
    pub total_favorites: u64,
    pub average_likes: f64,
    pub average_comments: f64,
    pub average_shares: f64,
    pub average_favorites: f64,
    pub total_engagement: u64,
    pub engagement_per_video: f64,
}

impl Summary {
    pub fn from_records(records: &[VideoRecord]) -> Self {
        let sum = |f: fn(&VideoRecord) -> u64| {
            records
                .iter()
                .map(f)
                .fold(0u64, |acc, v| acc.saturating_add(v))
        };
        let videos = records.len();
        let average = |total: u64| {
            if videos == 0 {
                0.0
            } else {
                total as f64 / videos as f64
            }
        };

        let total_likes = sum(|r| r.likes);
        let total_comments = sum(|r| r.comments);
        let total_shares = sum(|r| r.shares);
        let total_favorites = sum(|r| r.favorites);
        let total_engagement = sum(VideoRecord::engagement);

        Self {
            videos,
            total_likes,
            total_comments,
            total_shares,
            total_favorites,
            average_likes: average(total_likes),
            average_comments: average(total_comments),
            average_shares: average(total_shares),
            average_favorites: average(total_favorites),
            total_engagement,
            engagement_per_video: average(total_engagement),
        }
    }
}

/// One hashtag across every video that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashtagStat {
    pub tag: String,
    /// Videos using the tag.
    pub videos: usize,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

impl HashtagStat {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            videos: 0,
            likes: 0,
            comments: 0,
            shares: 0,
        }
    }

    pub fn engagement(&self) -> u64 {
        self.likes
            .saturating_add(self.comments)
            .saturating_add(self.shares)
    }
}

/// Per-hashtag totals, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct HashtagStats {
    stats: Vec<HashtagStat>,
}

impl HashtagStats {
    pub fn from_records(records: &[VideoRecord]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut stats: Vec<HashtagStat> = Vec::new();

        for record in records {
            for tag in &record.hashtags {
                let i = *index.entry(tag.as_str()).or_insert_with(|| {
                    stats.push(HashtagStat::new(tag));
                    stats.len() - 1
                });
                let stat = &mut stats[i];
                stat.videos += 1;
                stat.likes = stat.likes.saturating_add(record.likes);
                stat.comments = stat.comments.saturating_add(record.comments);
                stat.shares = stat.shares.saturating_add(record.shares);
            }
        }
        Self { stats }
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn all(&self) -> &[HashtagStat] {
        &self.stats
    }

    /// Most used first; ties keep first-seen order.
    pub fn top_by_frequency(&self, n: usize) -> Vec<HashtagStat> {
        self.top(n, |s| s.videos as u64)
    }

    /// Highest likes + comments + shares first.
    pub fn top_by_engagement(&self, n: usize) -> Vec<HashtagStat> {
        self.top(n, HashtagStat::engagement)
    }

    fn top(&self, n: usize, key: impl Fn(&HashtagStat) -> u64) -> Vec<HashtagStat> {
        let mut sorted = self.stats.clone();
        sorted.sort_by_key(|s| std::cmp::Reverse(key(s)));
        sorted.truncate(n);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, likes: u64, tags: &[&str]) -> VideoRecord {
        let mut r = VideoRecord::new(id, "author");
        r.likes = likes;
        r.comments = 1;
        r.shares = 1;
        r.hashtags = tags.iter().map(|t| t.to_string()).collect();
        r
    }

    #[test]
    fn test_totals_and_averages() {
        let records = vec![
            record("1", 10, &[]),
            record("2", 20, &[]),
            record("3", 30, &[]),
        ];
        let summary = Summary::from_records(&records);
        assert_eq!(summary.videos, 3);
        assert_eq!(summary.total_likes, 60);
        assert_eq!(summary.average_likes, 20.0);
        assert_eq!(summary.total_engagement, 66);
        assert_eq!(summary.engagement_per_video, 22.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::from_records(&[]);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_hashtag_rankings() {
        let records = vec![
            record("1", 5, &["#shop", "#fyp"]),
            record("2", 1000, &["#viral"]),
            record("3", 7, &["#shop", "#fyp"]),
            record("4", 2, &["#shop"]),
        ];
        let stats = HashtagStats::from_records(&records);
        assert_eq!(stats.len(), 3);

        let freq = stats.top_by_frequency(2);
        assert_eq!(freq[0].tag, "#shop");
        assert_eq!(freq[0].videos, 3);
        assert_eq!(freq[0].likes, 14);
        assert_eq!(freq[1].tag, "#fyp");

        let engaged = stats.top_by_engagement(TOP_HASHTAGS);
        assert_eq!(engaged.len(), 3);
        assert_eq!(engaged[0].tag, "#viral");
        assert_eq!(engaged[0].engagement(), 1002);
    }
}
