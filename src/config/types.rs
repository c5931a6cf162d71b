use crate::selector::{FieldSpec, SelectorSpec};
use crate::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// URLs the crawl starts from (depth 0)
    pub start_urls: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub user_agent: UserAgentConfig,

    #[serde(default)]
    pub scope: ScopeConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Fields to extract from every page, in output order
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldSpec>,
}

impl Config {
    /// Compiles the configured fields into a `SelectorSpec`
    pub fn selector_spec(&self) -> Result<SelectorSpec, ConfigError> {
        SelectorSpec::new(self.fields.clone())
    }
}

/// Order in which pending URLs leave the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlOrder {
    /// FIFO: every page at depth N before any page at depth N+1
    #[default]
    BreadthFirst,
    /// LIFO: follow the most recently discovered link first
    DepthFirst,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum link depth from the start URLs (0 = start URLs only)
    pub max_depth: u32,

    /// Maximum number of concurrent page fetches
    pub max_concurrency: u32,

    /// Maximum number of concurrent fetches against one host
    pub max_concurrent_per_host: u32,

    /// Minimum time between requests to the same host (milliseconds)
    pub min_interval_per_host: u64,

    /// Timeout for a single fetch attempt (milliseconds)
    pub fetch_timeout: u64,

    /// How many times a transient failure is retried
    pub max_retries: u32,

    /// First retry delay; doubles on each further attempt (milliseconds)
    pub retry_base_delay: u64,

    /// Upper bound for a single retry delay (milliseconds)
    pub retry_max_delay: u64,

    /// Stop dispatching after this many pages have been recorded
    pub max_pages: Option<u64>,

    /// Stop dispatching after this much wall-clock time (seconds)
    pub max_duration: Option<u64>,

    /// Frontier order
    pub crawl_order: CrawlOrder,

    /// Whether robots.txt allow/disallow and crawl-delay are honoured
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            max_concurrency: 4,
            max_concurrent_per_host: 2,
            min_interval_per_host: 1000,
            fetch_timeout: 30_000,
            max_retries: 3,
            retry_base_delay: 500,
            retry_max_delay: 30_000,
            max_pages: None,
            max_duration: None,
            crawl_order: CrawlOrder::BreadthFirst,
            respect_robots: true,
        }
    }
}

impl CrawlerConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_per_host)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration.map(Duration::from_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL)`, or `Name/Version` without a contact.
    pub fn user_agent_string(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Domain scope applied to discovered links
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScopeConfig {
    /// Domain patterns links must match (empty = any domain)
    pub allowed_domains: Vec<String>,

    /// Domain patterns whose links are never followed
    pub blocked_domains: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the JSON output file
    pub json_path: String,

    /// Path to the markdown summary file
    pub summary_path: Option<String>,

    /// Path to the SQLite database file
    pub database_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: "output.json".to_string(),
            summary_path: None,
            database_path: None,
        }
    }
}
