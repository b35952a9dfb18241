//! Settings read once at startup and handed to the server.

use std::path::PathBuf;

/// Spreadsheet the scraper writes by default.
pub const DEFAULT_DATA_PATH: &str = "tiktok_video_data.xlsx";

pub const DEFAULT_PORT: u16 = 8501;

/// Groq's OpenAI-compatible endpoint.
pub const DEFAULT_INSIGHT_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub const DEFAULT_INSIGHT_MODEL: &str = "llama-3.3-70b-versatile";

pub const DEFAULT_TRENDS_BASE_URL: &str = "https://serptag.co.uk";

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Spreadsheet read on every request.
    pub data_path: PathBuf,
    pub port: u16,
    pub insight: InsightConfig,
    pub trends: TrendsConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            port: DEFAULT_PORT,
            insight: InsightConfig::default(),
            trends: TrendsConfig::default(),
        }
    }
}

/// Language-model endpoint used by the insight generator.
#[derive(Clone)]
pub struct InsightConfig {
    /// `None` disables insights; the rest of the dashboard still works.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Rows included in the condensed summary sent with a question.
    pub max_rows: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_INSIGHT_BASE_URL.into(),
            model: DEFAULT_INSIGHT_MODEL.into(),
            timeout_secs: 60,
            max_rows: 50,
        }
    }
}

// never print the key
impl std::fmt::Debug for InsightConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_rows", &self.max_rows)
            .finish()
    }
}

/// Keyword-trend lookup service.
#[derive(Debug, Clone)]
pub struct TrendsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TRENDS_BASE_URL.into(),
            timeout_secs: 10,
        }
    }
}
