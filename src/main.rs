//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest crawl engine.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_harvest::config::{load_config_with_hash, validate, Config};
use sumi_harvest::crawler::{run_crawl, write_outputs, HttpFetcher};
use sumi_harvest::output::print_statistics;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a polite, selector-driven crawl engine
///
/// Sumi-Harvest crawls websites while respecting robots.txt and per-host
/// rate limits, extracts fields from every page with CSS selectors, and
/// writes the aggregated values as JSON.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A polite, selector-driven crawl engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the JSON output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Override the page budget
    #[arg(long, value_name = "N")]
    max_pages: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, &config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        })
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(path) = &cli.output {
        config.output.json_path = path.display().to_string();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = Some(max_pages);
    }
    if cli.output.is_some() || cli.max_pages.is_some() {
        validate(config).context("invalid command-line override")?;
    }
    Ok(())
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Crawl order: {:?}", crawler.crawl_order);
    println!("  Max concurrency: {}", crawler.max_concurrency);
    println!("  Max concurrent per host: {}", crawler.max_concurrent_per_host);
    println!("  Min interval per host: {}ms", crawler.min_interval_per_host);
    println!("  Fetch timeout: {}ms", crawler.fetch_timeout);
    println!(
        "  Retries: {} (backoff {}ms to {}ms)",
        crawler.max_retries, crawler.retry_base_delay, crawler.retry_max_delay
    );
    match crawler.max_pages {
        Some(n) => println!("  Page budget: {}", n),
        None => println!("  Page budget: unlimited"),
    }
    match crawler.max_duration {
        Some(secs) => println!("  Time budget: {}s", secs),
        None => println!("  Time budget: unlimited"),
    }
    println!("  Respect robots.txt: {}", crawler.respect_robots);

    println!("\nUser Agent: {}", config.user_agent.user_agent_string());

    println!("\nOutput:");
    println!("  JSON: {}", config.output.json_path);
    if let Some(path) = &config.output.summary_path {
        println!("  Summary: {}", path);
    }
    if let Some(path) = &config.output.database_path {
        println!("  Database: {}", path);
    }

    if !config.scope.allowed_domains.is_empty() {
        println!("\nAllowed Domains ({}):", config.scope.allowed_domains.len());
        for domain in &config.scope.allowed_domains {
            println!("  - {}", domain);
        }
    }
    if !config.scope.blocked_domains.is_empty() {
        println!("\nBlocked Domains ({}):", config.scope.blocked_domains.len());
        for domain in &config.scope.blocked_domains {
            println!("  - {}", domain);
        }
    }

    println!("\nFields ({}):", config.fields.len());
    for field in &config.fields {
        match &field.attribute {
            Some(attr) => println!("  - {}: {} @{}", field.key, field.selector, attr),
            None => println!("  - {}: {} (text)", field.key, field.selector),
        }
    }

    println!("\nStart URLs ({}):", config.start_urls.len());
    for url in &config.start_urls {
        println!("  * {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Start URLs: {}, fields: {}",
        config.start_urls.len(),
        config.fields.len()
    );

    let fetcher = HttpFetcher::new(&config.user_agent).context("failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            signal_token.cancel();
        }
    });

    let report = run_crawl(&config, Arc::new(fetcher), cancel)
        .await
        .context("crawl failed")?;

    write_outputs(&config.output, &report, config_hash).context("failed to write output")?;

    print_statistics(&report.stats);

    Ok(())
}
