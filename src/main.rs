//! Crawl-Relay main entry point
//!
//! This is the command-line interface for the Crawl-Relay batch crawl service.

use anyhow::Context;
use clap::Parser;
use crawl_relay::config::{load_config_with_hash, Config};
use crawl_relay::crawler::{BatchRequest, Coordinator};
use crawl_relay::output::{print_report_summary, write_markdown_report};
use crawl_relay::server::{serve, shutdown_signal};
use crawl_relay::url::parse_target_url;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Crawl-Relay: a batch crawl service
///
/// Without URLs, Crawl-Relay serves its HTTP API. With one or more `--url`
/// arguments it crawls them as a single batch, prints statistics and exits.
#[derive(Parser, Debug)]
#[command(name = "crawl-relay")]
#[command(version)]
#[command(about = "A batch crawl service", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// URL to crawl as part of a one-shot batch (repeatable)
    #[arg(short, long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Concurrency limit for the one-shot batch
    #[arg(short, long, requires = "urls")]
    concurrency: Option<usize>,

    /// Write a markdown report of the one-shot batch to this path
    #[arg(long, value_name = "PATH", requires = "urls")]
    report: Option<PathBuf>,

    /// Validate config and show what would run without crawling or serving
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &cli.urls, cli.concurrency);
    } else if cli.urls.is_empty() {
        handle_serve(config).await?;
    } else {
        handle_batch(&config, cli.urls, cli.concurrency, cli.report).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_relay=info,tower_http=info,warn"),
            1 => EnvFilter::new("crawl_relay=debug,tower_http=debug,info"),
            2 => EnvFilter::new("crawl_relay=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, urls: &[String], concurrency: Option<usize>) {
    println!("=== Crawl-Relay Dry Run ===\n");

    println!("Server Configuration:");
    println!("  Bind address: {}", config.server.bind_address);
    println!("  Allow any origin: {}", config.server.allow_any_origin);

    println!("\nCrawler Configuration:");
    println!(
        "  Default concurrency: {}",
        config.crawler.default_concurrency
    );
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Page timeout: {}ms", config.crawler.page_timeout_ms);

    println!("\nRetry Policy:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Delay: {}s to {}s ({})",
        config.retry.min_delay_secs,
        config.retry.max_delay_secs,
        if config.retry.exponential {
            "exponential"
        } else {
            "fixed"
        }
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");

    if urls.is_empty() {
        println!("✓ Would serve the API on {}", config.server.bind_address);
        return;
    }

    println!("\nURLs ({}):", urls.len());
    let mut valid = 0;
    for url in urls {
        match parse_target_url(url) {
            Ok(_) => {
                valid += 1;
                println!("  * {}", url);
            }
            Err(e) => println!("  ✗ {}", e),
        }
    }

    println!(
        "✓ Would crawl {} of {} URLs with concurrency {}",
        valid,
        urls.len(),
        concurrency.unwrap_or(config.crawler.default_concurrency)
    );
}

/// Handles the default mode: serves the HTTP API until shutdown
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(&config)?;

    serve(&config.server, coordinator, shutdown_signal())
        .await
        .context("server stopped with an error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Handles a one-shot batch given on the command line
async fn handle_batch(
    config: &Config,
    urls: Vec<String>,
    concurrency: Option<usize>,
    report_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let coordinator = Coordinator::from_config(config)?;

    let mut request = BatchRequest::new(urls);
    request.concurrent_limit = concurrency.map(|n| i64::try_from(n).unwrap_or(i64::MAX));

    // Ctrl-C stops admitting new URLs; in-flight ones finish
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    let report = coordinator.run_batch_until(request, cancel).await?;

    print_report_summary(&report);

    if let Some(path) = report_path {
        write_markdown_report(&report, &path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("\n✓ Report written to: {}", path.display());
    }

    Ok(())
}
