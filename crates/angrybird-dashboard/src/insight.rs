//! Questions about the dataset, answered by a language model.
//!
//! The model never sees the spreadsheet. It gets a condensed text: one
//! aggregate line and at most `max_rows` pipe-delimited rows.

use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use angrybird_dataset::VideoRecord;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::InsightConfig;
use crate::stats::Summary;
use crate::{Error, Result};

/// Longest description kept per row, in characters.
const MAX_DESCRIPTION_CHARS: usize = 160;

/// Something that completes a single-turn prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible `chat/completions` endpoint (Groq by default).
pub struct ChatCompletions {
    http: reqwest::Client,
    config: InsightConfig,
}

impl ChatCompletions {
    pub fn new(http: reqwest::Client, config: InsightConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl LanguageModel for ChatCompletions {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.trim().is_empty())
        else {
            return Err(Error::Config(
                "API_KEY is not set; insights are unavailable".into(),
            ));
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        });

        debug!("asking {} ({} prompt chars)", self.config.model, prompt.len());
        let response = self
            .http
            .post(url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .bearer_auth(api_key.trim())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        let value: serde_json::Value = response.json().await?;
        value
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(Error::EmptyResponse)
    }
}

/// Who said a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// `YYYY-MM-DD HH:MM:SS`, local time.
    pub timestamp: String,
}

impl ChatMessage {
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Builds the prompt and relays the model's answer verbatim.
#[derive(Clone)]
pub struct InsightGenerator {
    model: Arc<dyn LanguageModel>,
    max_rows: usize,
}

impl InsightGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, max_rows: usize) -> Self {
        Self { model, max_rows }
    }

    pub async fn answer(&self, question: &str, records: &[VideoRecord]) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::BadRequest("question is empty".into()));
        }
        let data = condense(records, self.max_rows);
        match self.model.complete(&build_prompt(question, &data)).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                warn!("insight request failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Aggregate line plus at most `max_rows` rows of
/// `index|uploader|upload_date|description|likes|comments|shares|favorites|music`.
pub fn condense(records: &[VideoRecord], max_rows: usize) -> String {
    let summary = Summary::from_records(records);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Below is the TikTok video data ({} videos; totals: {} likes, {} comments, {} shares, {} favorites; {:.1} engagements per video).",
        summary.videos,
        summary.total_likes,
        summary.total_comments,
        summary.total_shares,
        summary.total_favorites,
        summary.engagement_per_video
    );
    let shown = records.len().min(max_rows);
    if shown < records.len() {
        let _ = writeln!(out, "Only the first {} rows are listed.", shown);
    }
    let _ = writeln!(
        out,
        "Every row follows this format: index|uploader|upload_date|description|likes|comments|shares|favorites|music_text"
    );
    out.push('\n');

    for (i, r) in records.iter().take(max_rows).enumerate() {
        let _ = writeln!(
            out,
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            i,
            cell(&r.author, usize::MAX),
            r.upload_date_text(),
            cell(&r.description, MAX_DESCRIPTION_CHARS),
            r.likes,
            r.comments,
            r.shares,
            r.favorites,
            cell(&r.music, usize::MAX)
        );
    }
    out
}

/// One field on one line, without the delimiter, cut to `max` chars.
fn cell(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '|' || c.is_control() { ' ' } else { c })
        .collect();
    let flat = flat.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let mut cut: String = flat.chars().take(max).collect();
        cut.push('…');
        cut
    } else {
        flat
    }
}

pub fn build_prompt(question: &str, data: &str) -> String {
    format!(
        "You are a data analyst. Always base your response strictly on the data provided, \
         using clear examples and logical reasoning. Provide specific insights, identify \
         patterns, and explain any trends or anomalies. When relevant, offer actionable \
         recommendations backed by data. Prompt by the user: {} Data: {}",
        question, data
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Returns a canned answer and remembers the prompts it got.
    pub(crate) struct FakeModel {
        pub answer: std::result::Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        pub(crate) fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Err(message.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.answer {
                Ok(ref a) => Ok(a.clone()),
                Err(ref e) => Err(Error::Api {
                    status: 500,
                    body: e.clone(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeModel;
    use super::*;

    fn records(n: usize) -> Vec<VideoRecord> {
        (0..n)
            .map(|i| {
                let mut r = VideoRecord::new(i.to_string(), format!("user{}", i));
                r.description = "new | drop\nlink in bio".into();
                r.likes = 10;
                r
            })
            .collect()
    }

    #[test]
    fn test_condense_caps_rows() {
        let text = condense(&records(80), 50);
        let rows: Vec<&str> = text.lines().filter(|l| l.contains("|user")).collect();
        assert_eq!(rows.len(), 50);
        assert!(text.contains("80 videos"));
        assert!(text.contains("800 likes"));
        assert!(text.contains("Only the first 50 rows"));
    }

    #[test]
    fn test_condense_row_format() {
        let text = condense(&records(1), 50);
        let row = text.lines().last().unwrap();
        // the description's own pipe and newline are flattened
        assert_eq!(row, "0|user0||new drop link in bio|10|0|0|0|");
        assert_eq!(row.matches('|').count(), 8);
    }

    #[test]
    fn test_long_descriptions_truncated() {
        let long = "x".repeat(500);
        let cut = cell(&long, MAX_DESCRIPTION_CHARS);
        assert_eq!(cut.chars().count(), MAX_DESCRIPTION_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_prompt_carries_question_and_data() {
        let prompt = build_prompt("Which uploader wins?", "0|a|...");
        assert!(prompt.starts_with("You are a data analyst."));
        assert!(prompt.contains("Prompt by the user: Which uploader wins? Data: 0|a|..."));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let model = ChatCompletions::new(reqwest::Client::new(), InsightConfig::default());
        let err = model.complete("hello").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err}");
        assert!(err.to_string().contains("API_KEY"));
    }

    #[tokio::test]
    async fn test_answer_is_relayed_verbatim() {
        let model = FakeModel::answering("  **user3** leads.  ");
        let generator = InsightGenerator::new(model.clone(), 2);
        let answer = generator.answer("who leads?", &records(5)).await.unwrap();
        assert_eq!(answer, "  **user3** leads.  ");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("who leads?"));
        assert!(prompts[0].contains("1|user1|"));
        assert!(!prompts[0].contains("2|user2|"));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let model = FakeModel::answering("unused");
        let generator = InsightGenerator::new(model.clone(), 2);
        let err = generator.answer("   ", &records(1)).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)), "{err}");
        assert!(model.prompts.lock().unwrap().is_empty());
    }
}
