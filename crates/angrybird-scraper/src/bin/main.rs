use angrybird_scraper::{Config, CookieJar, LogObserver, Scraper, Target, DEFAULT_COOKIE_FILE};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "angrybird-scrape")]
#[command(about = "Scrape short-video metadata into a spreadsheet")]
#[command(version)]
struct Cli {
    /// Config file (defaults are used when omitted)
    config: Option<PathBuf>,

    /// Raw cookie header copied from a logged-in browser
    #[arg(long, env = "ANGRYBIRD_COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// File holding the cookie header
    #[arg(long, default_value = DEFAULT_COOKIE_FILE)]
    cookie_file: PathBuf,

    /// Scroll video search results for this query instead of the feed
    #[arg(long, conflicts_with = "profile")]
    search: Option<String>,

    /// Scroll one account's uploads instead of the feed
    #[arg(long)]
    profile: Option<String>,

    /// Stop after this many kept videos
    #[arg(long)]
    max_items: Option<usize>,

    /// Filter keyword (can be used multiple times, replaces the configured list)
    #[arg(short = 'k', long = "keyword", value_name = "KEYWORD")]
    keywords: Vec<String>,

    /// Keep every video, not only the ones matching a keyword
    #[arg(long, conflicts_with = "keywords")]
    no_filter: bool,

    /// Spreadsheet to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(ref query) = self.search {
            config.target = Target::Search(query.clone());
        }
        if let Some(ref handle) = self.profile {
            config.target = Target::Profile(handle.clone());
        }
        if let Some(max) = self.max_items {
            config.limits.max_items = max;
        }
        if !self.keywords.is_empty() {
            config.filter.enabled = true;
            config.filter.keywords = self.keywords.clone();
        }
        if self.no_filter {
            config.filter.enabled = false;
        }
        if let Some(ref path) = self.output {
            config.output.path = path.clone();
        }
        if self.headless {
            config.browser.headless = true;
        }
    }

    fn cookie(&self) -> angrybird_scraper::Result<String> {
        match self.cookie {
            Some(ref raw) => Ok(raw.clone()),
            None => std::fs::read_to_string(&self.cookie_file).map_err(|e| {
                angrybird_scraper::Error::Authentication(format!(
                    "no --cookie given and {} is unreadable: {}",
                    self.cookie_file.display(),
                    e
                ))
            }),
        }
    }
}

#[tokio::main]
async fn main() -> angrybird_scraper::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let mut config = match cli.config {
        Some(ref path) => Config::load(path)?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    if cli.check {
        println!("Config valid: {}", config.name);
        println!("  Target: {} ({})", config.target, config.target_url()?);
        println!("  Max items: {}", config.limits.max_items);
        println!("  Idle rounds: {}", config.limits.max_idle_rounds);
        if config.filter.enabled {
            println!("  Keywords: {}", config.filter.keywords.join(", "));
        } else {
            println!("  Keywords: (filter disabled)");
        }
        println!("  Output: {}", config.output.path.display());
        return Ok(());
    }

    // fail on a bad cookie before a browser is launched
    let cookie = cli.cookie()?;
    let jar = CookieJar::parse(&cookie)?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stopping after the current round");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    println!("Running: {} ({} cookies)", config.name, jar.len());

    let mut scraper = Scraper::launch(&config.browser).await?;
    let result = scraper
        .run(&config, &cookie, &mut LogObserver, &cancel)
        .await;
    if let Err(e) = scraper.close().await {
        warn!("Failed to close browser: {}", e);
    }

    println!();
    match result {
        Ok(report) => {
            println!("✓ Success ({})", report.stop);
            if let Some(ref name) = report.logged_in_as {
                println!("  Account: {}", name);
            }
            println!("  Exported: {} of {} seen", report.exported, report.seen);
            if report.skipped > 0 {
                println!("  Skipped tiles: {}", report.skipped);
            }
            println!("  Rounds: {}", report.rounds);
            println!("  Output: {}", report.output.display());
            println!("  Duration: {}ms", report.duration_ms);
            Ok(())
        }
        Err(e) => {
            println!("✗ Failed");
            println!("  Error: {}", e);
            std::process::exit(1);
        }
    }
}
