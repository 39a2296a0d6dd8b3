//! archipelago-profile - Archipelago profile page loader
//!
//! Fetches a user's profile, island and Slack roster entry from the
//! Archipelago backend, enriches them with doubloon balances from the
//! leaderboard, and renders the page data as JSON or Markdown.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, required endpoint, render or write failure)

mod aggregate;
mod cli;
mod config;
mod fetch;
mod models;
mod report;

use aggregate::{LeaderboardLayout, ProfileAggregator};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use fetch::HttpFetcher;
use indicatif::{ProgressBar, ProgressStyle};
use report::PageMetadata;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("archipelago-profile v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_profile(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .archipelago.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    eprintln!("Created {} with default settings.", CONFIG_FILE);
    eprintln!("Set [leaderboard] url to enable doubloon lookups.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr; stdout carries only the rendered page.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load, aggregate, render and write one profile page.
async fn run_profile(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let endpoints = config.endpoint_config()?;
    info!("Using {} backend at {}", endpoints.environment, endpoints.base);
    if endpoints.leaderboard.is_none() {
        debug!("No leaderboard configured; doubloons will be omitted");
    }

    let fetcher = HttpFetcher::new(
        Duration::from_secs(config.http.timeout_seconds),
        &config.http.user_agent,
    )
    .context("Failed to create HTTP client")?;

    let aggregator = ProfileAggregator::new(Box::new(fetcher))
        .with_layout(LeaderboardLayout::from(&config.leaderboard))
        .with_leaderboard_headers(config.leaderboard.headers());

    let user_id = args.user_id();
    let spinner = start_spinner(&args, user_id);
    let aggregated = aggregator.aggregate(user_id, &endpoints).await;
    spinner.finish_and_clear();

    let result = aggregated
        .map_err(|e| {
            debug!("Required {} endpoint failed", e.role());
            e
        })
        .with_context(|| format!("Failed to load profile for {}", user_id))?;

    let output = match config.general.format {
        OutputFormat::Json => report::render_json(&result)?,
        OutputFormat::Markdown => {
            let metadata = PageMetadata::new(user_id, endpoints.environment);
            report::render_markdown(&result, &metadata)
        }
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write page to {}", path))?;
            info!("Page saved to {}", path);
        }
        None => println!("{}", output),
    }

    info!("Done in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Spinner on stderr while the endpoints are queried.
fn start_spinner(args: &Args, user_id: &str) -> ProgressBar {
    if args.quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Loading profile for {}", user_id));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Fall back to the default location; a malformed file is still an error
    Config::discover(Path::new("."))
}
