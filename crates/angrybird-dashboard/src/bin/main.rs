//! angrybird-dashboard - browse, filter and question a scraped spreadsheet

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use angrybird_dashboard::config::{
    DEFAULT_DATA_PATH, DEFAULT_INSIGHT_BASE_URL, DEFAULT_INSIGHT_MODEL, DEFAULT_PORT,
    DEFAULT_TRENDS_BASE_URL,
};
use angrybird_dashboard::{router, AppState, DashboardConfig, InsightConfig, TrendsConfig};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "angrybird-dashboard")]
#[command(about = "Local dashboard over the scraped video spreadsheet", long_about = None)]
#[command(version)]
struct Cli {
    /// Spreadsheet written by angrybird-scrape
    #[arg(short, long, env = "ANGRYBIRD_DATA", default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Port to listen on (127.0.0.1 only)
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Language-model API key; insights are disabled without one
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Fallback key variable
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, hide = true)]
    groq_api_key: Option<String>,

    #[arg(long, env = "INSIGHT_MODEL", default_value = DEFAULT_INSIGHT_MODEL)]
    model: String,

    /// OpenAI-compatible base URL
    #[arg(long, env = "INSIGHT_BASE_URL", default_value = DEFAULT_INSIGHT_BASE_URL)]
    base_url: String,

    /// Seconds to wait for an answer
    #[arg(long, env = "INSIGHT_TIMEOUT_SECS", default_value_t = 60)]
    timeout: u64,

    /// Rows sent to the model with each question
    #[arg(long, default_value_t = 50)]
    max_rows: usize,

    #[arg(long, env = "TRENDS_BASE_URL", default_value = DEFAULT_TRENDS_BASE_URL)]
    trends_url: String,
}

impl Cli {
    fn into_config(self) -> DashboardConfig {
        let api_key = self
            .api_key
            .or(self.groq_api_key)
            .filter(|k| !k.trim().is_empty());
        DashboardConfig {
            data_path: self.data,
            port: self.port,
            insight: InsightConfig {
                api_key,
                base_url: self.base_url,
                model: self.model,
                timeout_secs: self.timeout,
                max_rows: self.max_rows,
            },
            trends: TrendsConfig {
                base_url: self.trends_url,
                ..Default::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Cli::parse().into_config();
    if config.insight.api_key.is_none() {
        warn!("API_KEY is not set; the chat bot will report an error instead of answering");
    }
    if !config.data_path.exists() {
        warn!(
            "{} does not exist yet; run angrybird-scrape first",
            config.data_path.display()
        );
    }

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let port = config.port;
    info!(
        "serving {} with model {}",
        config.data_path.display(),
        config.insight.model
    );
    let state = Arc::new(AppState::new(config, http));

    let bind_addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("dashboard listening on http://{}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                match sigterm {
                    Some(ref mut s) => { s.recv().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
