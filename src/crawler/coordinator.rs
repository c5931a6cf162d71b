//! Crawl coordination
//!
//! Wires a validated configuration into a scheduler run:
//! - Compiling the selector spec
//! - Normalizing start URLs
//! - Building the robots cache and worker context
//! - Writing the finished report to the configured outputs

use crate::config::{Config, OutputConfig};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::scheduler::{CrawlReport, Scheduler};
use crate::crawler::worker::WorkerContext;
use crate::output::{self, JsonFileSink, MarkdownSink, OutputSink, SqliteSink};
use crate::robots::RobotsCache;
use crate::url::{normalize_url, LinkScope};
use crate::{ConfigError, HarvestError};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Runs one crawl with the given fetcher
///
/// The configuration is expected to be validated already; selector and URL
/// problems are still reported as `ConfigError`s before anything is fetched.
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `fetcher` - Performs all HTTP requests, including robots.txt
/// * `cancel` - Cancelling this token drains the run early
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished (possibly through a budget or cancellation)
/// * `Err(HarvestError)` - The run could not be started
pub async fn run_crawl(
    config: &Config,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
) -> Result<CrawlReport, HarvestError> {
    let spec = config.selector_spec()?;
    let seeds = normalize_seeds(&config.start_urls)?;

    let robots = if config.crawler.respect_robots {
        Some(Arc::new(RobotsCache::new(
            Arc::clone(&fetcher),
            config.user_agent.crawler_name.clone(),
            config.crawler.fetch_timeout(),
        )))
    } else {
        tracing::warn!("robots.txt will not be consulted");
        None
    };

    let context = WorkerContext {
        fetcher,
        spec: Arc::new(spec),
        robots,
        retry: RetryPolicy::from_config(&config.crawler),
        fetch_timeout: config.crawler.fetch_timeout(),
        scope: LinkScope::from_config(&config.scope),
    };

    let mut scheduler = Scheduler::new(&config.crawler, context, cancel);

    let added = scheduler.seed(&seeds);
    if added < seeds.len() {
        tracing::debug!("{} duplicate start URLs ignored", seeds.len() - added);
    }

    scheduler.run().await
}

fn normalize_seeds(start_urls: &[String]) -> Result<Vec<Url>, ConfigError> {
    start_urls
        .iter()
        .map(|raw| {
            normalize_url(raw).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", raw, e)))
        })
        .collect()
}

/// Builds the output sinks described by the configuration
///
/// The JSON file is always written; the markdown summary and the SQLite
/// database only when their paths are set.
pub fn build_sinks(
    config: &OutputConfig,
    config_hash: &str,
) -> Result<Vec<Box<dyn OutputSink>>, HarvestError> {
    let mut sinks: Vec<Box<dyn OutputSink>> = vec![Box::new(JsonFileSink::new(&config.json_path))];

    if let Some(path) = &config.summary_path {
        sinks.push(Box::new(MarkdownSink::new(
            path,
            Some(config_hash.to_string()),
        )));
    }

    if let Some(path) = &config.database_path {
        sinks.push(Box::new(SqliteSink::new(Path::new(path), config_hash)?));
    }

    Ok(sinks)
}

/// Writes a finished crawl to every configured output
pub fn write_outputs(
    config: &OutputConfig,
    report: &CrawlReport,
    config_hash: &str,
) -> Result<(), HarvestError> {
    let mut sinks = build_sinks(config, config_hash)?;
    output::write_all(&mut sinks, &report.output, &report.stats)?;
    Ok(())
}
