//! HTTP routes. Each panel fails on its own: a missing API key or an
//! unreachable trend service never takes the rest of the page down.

use std::sync::Arc;

use angrybird_dataset::write_to_buffer;
use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::charts::hashtag_engagement_chart;
use crate::config::DashboardConfig;
use crate::html::{render_page, PageView, TrendPanel};
use crate::insight::{ChatCompletions, ChatMessage, InsightGenerator, Role};
use crate::loader::DataSource;
use crate::query::RowQuery;
use crate::stats::{HashtagStat, HashtagStats, Summary, TOP_HASHTAGS};
use crate::trends::{KeywordTrend, TrendsClient};
use crate::Error;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const DOWNLOAD_NAME: &str = "filtered_tiktok_data.xlsx";

pub struct AppState {
    pub config: DashboardConfig,
    pub data: DataSource,
    pub insight: InsightGenerator,
    pub trends: TrendsClient,
    /// Lives as long as the server.
    pub chat: Mutex<Vec<ChatMessage>>,
}

impl AppState {
    /// State talking to the configured language model and trend service.
    pub fn new(config: DashboardConfig, http: reqwest::Client) -> Self {
        let model = Arc::new(ChatCompletions::new(http.clone(), config.insight.clone()));
        let insight = InsightGenerator::new(model, config.insight.max_rows);
        Self::with_insight(config, http, insight)
    }

    pub fn with_insight(
        config: DashboardConfig,
        http: reqwest::Client,
        insight: InsightGenerator,
    ) -> Self {
        Self {
            data: DataSource::new(&config.data_path),
            trends: TrendsClient::new(http, config.trends.clone()),
            insight,
            chat: Mutex::new(Vec::new()),
            config,
        }
    }

    fn insight_notice(&self) -> Option<String> {
        match self.config.insight.api_key {
            Some(ref key) if !key.trim().is_empty() => None,
            _ => Some(
                "API_KEY is not set; the chat bot is unavailable. Set API_KEY (or GROQ_API_KEY) and restart."
                    .into(),
            ),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/summary", get(api_summary))
        .route("/api/records", get(api_records))
        .route("/api/hashtags", get(api_hashtags))
        .route("/api/insight", post(api_insight))
        .route("/api/trends", get(api_trends))
        .route("/chart/hashtags.svg", get(hashtag_chart))
        .route("/download", get(download))
        .route("/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: Error) -> ApiError {
    (
        e.status(),
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

#[derive(Debug, Default, Deserialize)]
struct KeywordParams {
    keyword: Option<String>,
}

async fn index(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RowQuery>,
    Query(params): Query<KeywordParams>,
) -> Html<String> {
    let (records, load_error) = match state.data.load() {
        Ok(records) => (records, None),
        Err(e) => {
            warn!("could not load {}: {}", state.data.path().display(), e);
            (Vec::new(), Some(e.to_string()))
        }
    };

    let rows = query.apply(&records);
    let top = HashtagStats::from_records(&rows).top_by_frequency(TOP_HASHTAGS);

    let trends = match params.keyword.as_deref().map(str::trim) {
        Some(keyword) if !keyword.is_empty() => Some(match state.trends.search(keyword).await {
            Ok(trends) => TrendPanel::Results {
                keyword: keyword.to_string(),
                trends,
            },
            Err(e) => TrendPanel::Failed {
                keyword: keyword.to_string(),
                message: format!("Keyword search failed: {}", e),
            },
        }),
        _ => None,
    };

    let chat = state.chat.lock().await;
    Html(render_page(&PageView {
        load_error,
        summary: Summary::from_records(&records),
        rows: &rows,
        query: &query,
        top_hashtags: &top,
        trends,
        chat: &chat,
        insight_notice: state.insight_notice(),
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "angrybird-dashboard",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn api_summary(State(state): State<Arc<AppState>>) -> Result<Json<Summary>, ApiError> {
    let records = state.data.load().map_err(api_error)?;
    Ok(Json(Summary::from_records(&records)))
}

#[derive(Debug, Serialize)]
struct RecordsResponse {
    total: usize,
    matched: usize,
    records: Vec<angrybird_dataset::VideoRecord>,
}

async fn api_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RowQuery>,
) -> Result<Json<RecordsResponse>, ApiError> {
    let records = state.data.load().map_err(api_error)?;
    let rows = query.apply(&records);
    Ok(Json(RecordsResponse {
        total: records.len(),
        matched: rows.len(),
        records: rows,
    }))
}

#[derive(Debug, Serialize)]
struct HashtagsResponse {
    distinct: usize,
    by_frequency: Vec<HashtagStat>,
    by_engagement: Vec<HashtagStat>,
}

async fn api_hashtags(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RowQuery>,
) -> Result<Json<HashtagsResponse>, ApiError> {
    let records = state.data.load().map_err(api_error)?;
    let stats = HashtagStats::from_records(&query.apply(&records));
    Ok(Json(HashtagsResponse {
        distinct: stats.len(),
        by_frequency: stats.top_by_frequency(TOP_HASHTAGS),
        by_engagement: stats.top_by_engagement(TOP_HASHTAGS),
    }))
}

async fn hashtag_chart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RowQuery>,
) -> Result<Response, ApiError> {
    let records = state.data.load().map_err(api_error)?;
    let top = HashtagStats::from_records(&query.apply(&records)).top_by_engagement(TOP_HASHTAGS);
    let svg = hashtag_engagement_chart(&top).map_err(api_error)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RowQuery>,
) -> Result<Response, ApiError> {
    let records = state.data.load().map_err(api_error)?;
    let rows = query.apply(&records);
    let bytes = write_to_buffer(&rows).map_err(|e| api_error(e.into()))?;
    info!("download: {} rows", rows.len());
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_NAME),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct QuestionRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct InsightResponse {
    answer: String,
}

async fn api_insight(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<InsightResponse>, ApiError> {
    let records = state.data.load().map_err(api_error)?;
    let answer = state
        .insight
        .answer(&request.question, &records)
        .await
        .map_err(api_error)?;
    Ok(Json(InsightResponse { answer }))
}

/// Form post from the page; the answer (or the error) lands in the chat
/// history and the browser is sent back to `/`.
async fn chat(State(state): State<Arc<AppState>>, Form(request): Form<QuestionRequest>) -> Redirect {
    let question = request.question.trim();
    if question.is_empty() {
        return Redirect::to("/");
    }

    let answer = match state.data.load() {
        Ok(records) => state.insight.answer(question, &records).await,
        Err(e) => Err(e),
    };
    let reply = match answer {
        Ok(answer) => answer,
        Err(e) => format!("Error generating response: {}", e),
    };

    let mut history = state.chat.lock().await;
    history.push(ChatMessage::now(Role::User, question));
    history.push(ChatMessage::now(Role::Bot, reply));
    Redirect::to("/")
}

async fn api_trends(
    State(state): State<Arc<AppState>>,
    Query(params): Query<KeywordParams>,
) -> Result<Json<Vec<KeywordTrend>>, ApiError> {
    let keyword = params.keyword.unwrap_or_default();
    let trends = state.trends.search(&keyword).await.map_err(api_error)?;
    Ok(Json(trends))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::testing::FakeModel;
    use angrybird_dataset::{read_workbook_from, write_workbook, VideoRecord};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn data_file(name: &str, likes: &[u64]) -> std::path::PathBuf {
        let path = std::env::temp_dir()
            .join(format!("angrybird-server-{}", std::process::id()))
            .join(name);
        let records: Vec<VideoRecord> = likes
            .iter()
            .enumerate()
            .map(|(i, &l)| {
                let mut r = VideoRecord::new(format!("{}", i + 1), format!("user{}", i + 1));
                r.likes = l;
                r.description = format!("video {} #shop", i + 1);
                r.hashtags = vec!["#shop".into()];
                r
            })
            .collect();
        write_workbook(&path, &records).unwrap();
        path
    }

    fn state_for(path: std::path::PathBuf, insight: Option<InsightGenerator>) -> Arc<AppState> {
        let config = DashboardConfig {
            data_path: path,
            ..Default::default()
        };
        let http = reqwest::Client::new();
        Arc::new(match insight {
            Some(insight) => AppState::with_insight(config, http, insight),
            None => AppState::new(config, http),
        })
    }

    async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_summary_endpoint() {
        let state = state_for(data_file("summary.xlsx", &[10, 20, 30]), None);
        let (status, body) = get(state, "/api/summary").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["videos"], 3);
        assert_eq!(json["total_likes"], 60);
        assert_eq!(json["average_likes"], 20.0);
    }

    #[tokio::test]
    async fn test_missing_key_degrades_insight_only() {
        let state = state_for(data_file("nokey.xlsx", &[1, 2]), None);

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/insight")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"question":"what sells?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("API_KEY"));

        let (status, body) = get(state, "/").await;
        assert_eq!(status, StatusCode::OK);
        let html = String::from_utf8(body).unwrap();
        assert!(html.contains("Number of results: 2"));
        assert!(html.contains("API_KEY is not set"));
    }

    #[tokio::test]
    async fn test_blank_question_is_bad_request() {
        let model = FakeModel::answering("unused");
        let insight = InsightGenerator::new(model.clone(), 50);
        let state = state_for(data_file("blank.xlsx", &[1]), Some(insight));

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/insight")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"question":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_data_file() {
        let state = state_for("/definitely/not/here.xlsx".into(), None);
        let (status, _) = get(state.clone(), "/api/summary").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get(state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("No data available"));
    }

    #[tokio::test]
    async fn test_records_filter_and_sort() {
        let state = state_for(data_file("records.xlsx", &[5, 50, 500]), None);
        let (status, body) =
            get(state, "/api/records?min_likes=10&sort=likes&order=descending").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["matched"], 2);
        assert_eq!(json["records"][0]["likes"], 500);
    }

    #[tokio::test]
    async fn test_download_is_filtered_xlsx() {
        let state = state_for(data_file("download.xlsx", &[5, 50, 500]), None);
        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/download?uploader=user3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], XLSX_MIME);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let rows = read_workbook_from(std::io::Cursor::new(body.to_vec())).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author, "user3");
    }

    #[tokio::test]
    async fn test_chart_and_hashtags() {
        let state = state_for(data_file("chart.xlsx", &[1, 2, 3]), None);
        let (status, body) = get(state.clone(), "/chart/hashtags.svg").await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("#shop"));

        let (_, body) = get(state, "/api/hashtags").await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["distinct"], 1);
        assert_eq!(json["by_frequency"][0]["videos"], 3);
    }

    #[tokio::test]
    async fn test_chat_appends_history() {
        let model = FakeModel::answering("user3 has the most likes.");
        let insight = InsightGenerator::new(model.clone(), 50);
        let state = state_for(data_file("chat.xlsx", &[1, 2, 3]), Some(insight));

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("question=who+is+ahead%3F"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let history = state.chat.lock().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "who is ahead?");
        assert_eq!(history[1].content, "user3 has the most likes.");
        assert!(model.prompts.lock().unwrap()[0].contains("2|user3|"));
    }

    #[tokio::test]
    async fn test_chat_records_failure_as_reply() {
        let model = FakeModel::failing("model overloaded");
        let insight = InsightGenerator::new(model, 50);
        let state = state_for(data_file("chatfail.xlsx", &[1]), Some(insight));

        router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("question=hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        let history = state.chat.lock().await;
        assert!(history[1]
            .content
            .starts_with("Error generating response:"));
        assert!(history[1].content.contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_health() {
        let state = state_for("/unused.xlsx".into(), None);
        let (status, body) = get(state, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }
}
