//! Sumi-Harvest: a polite, selector-driven crawl engine
//!
//! This crate crawls websites under concurrency and per-host politeness limits,
//! extracts structured fields from every page with declarative CSS selectors,
//! and aggregates the results into a single keyed output.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod selector;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
///
/// Per-page failures never surface here; they are recorded on the page's
/// `PageResult` instead. Only startup and output problems abort a run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid crawl phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are fatal at startup: a crawl never begins with an invalid config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector for field '{key}': {message}")]
    InvalidSelector { key: String, message: String },

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Errors reported by the fetch collaborator
///
/// Everything except `InvalidUrl` is considered transient and may be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection reset: {0}")]
    Reset(String),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns true if a later attempt may succeed
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CrawlReport, Fetcher, HttpFetcher};
pub use output::{CrawlOutput, CrawlStats};
pub use selector::{FieldSpec, SelectorSpec};
pub use state::{CrawlPhase, FailureReason, PageResult, PageStatus};
pub use crate::url::{extract_host_key, normalize_url};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_transience() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::Connect("refused".into()).is_transient());
        assert!(TransportError::Reset("reset by peer".into()).is_transient());
        assert!(TransportError::Dns("no such host".into()).is_transient());
        assert!(!TransportError::InvalidUrl("bad".into()).is_transient());
    }
}
