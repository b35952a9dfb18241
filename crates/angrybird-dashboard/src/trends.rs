//! Keyword search volume and trend lookup.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use url::Url;

use crate::config::TrendsConfig;
use crate::{Error, Result};

/// Competition index at or above which a keyword counts as crowded.
pub const CROWDED_COMPETITION: f64 = 60.0;

/// One related keyword as the trend service reports it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct KeywordTrend {
    #[serde(rename(deserialize = "text"))]
    pub keyword: String,
    #[serde(default, deserialize_with = "number")]
    pub volume: f64,
    /// Percent change.
    #[serde(default, deserialize_with = "number")]
    pub trend: f64,
    #[serde(rename(deserialize = "competition_index"), default, deserialize_with = "number")]
    pub competition: f64,
    #[serde(default, deserialize_with = "number")]
    pub low_bid: f64,
    #[serde(default, deserialize_with = "number")]
    pub high_bid: f64,
}

impl KeywordTrend {
    pub fn is_rising(&self) -> bool {
        self.trend > 0.0
    }

    pub fn is_crowded(&self) -> bool {
        self.competition >= CROWDED_COMPETITION
    }
}

/// Numbers arrive as JSON numbers, numeric strings or null.
fn number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(n)) => n,
        Some(Raw::Text(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        None => 0.0,
    })
}

pub struct TrendsClient {
    http: reqwest::Client,
    config: TrendsConfig,
}

impl TrendsClient {
    pub fn new(http: reqwest::Client, config: TrendsConfig) -> Self {
        Self { http, config }
    }

    /// Lookup URL for `keyword`.
    pub fn url(&self, keyword: &str) -> Result<Url> {
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| Error::Config(format!("trends base url: {}", e)))?;
        let mut url = base
            .join("/api/global-key/")
            .map_err(|e| Error::Config(format!("trends url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("keyword", keyword)
            .append_pair("lang", "en");
        Ok(url)
    }

    pub async fn search(&self, keyword: &str) -> Result<Vec<KeywordTrend>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(Error::Config("keyword is empty".into()));
        }
        let url = self.url(keyword)?;
        debug!("trend lookup: {}", url);

        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_payload() {
        let json = r#"[
            {"text": "phone case", "volume": 74000, "trend": 12.5, "competition_index": 81,
             "low_bid": 0.35, "high_bid": "1.20"},
            {"text": "cute phone case", "volume": "9900", "trend": -4, "competition_index": null}
        ]"#;
        let trends: Vec<KeywordTrend> = serde_json::from_str(json).unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].keyword, "phone case");
        assert_eq!(trends[0].volume, 74000.0);
        assert_eq!(trends[0].high_bid, 1.2);
        assert!(trends[0].is_rising());
        assert!(trends[0].is_crowded());
        assert_eq!(trends[1].volume, 9900.0);
        assert_eq!(trends[1].competition, 0.0);
        assert_eq!(trends[1].low_bid, 0.0);
        assert!(!trends[1].is_rising());
    }

    #[test]
    fn test_url_encodes_keyword() {
        let client = TrendsClient::new(reqwest::Client::new(), TrendsConfig::default());
        let url = client.url("dog & cat toys").unwrap();
        assert_eq!(
            url.as_str(),
            "https://serptag.co.uk/api/global-key/?format=json&keyword=dog+%26+cat+toys&lang=en"
        );
    }

    #[tokio::test]
    async fn test_blank_keyword_rejected() {
        let client = TrendsClient::new(reqwest::Client::new(), TrendsConfig::default());
        assert!(matches!(
            client.search("  ").await.unwrap_err(),
            Error::Config(_)
        ));
    }
}
