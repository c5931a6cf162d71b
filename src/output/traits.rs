//! Output sink trait and errors

use crate::output::aggregator::CrawlOutput;
use crate::output::stats::CrawlStats;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A destination for the results of a finished crawl
pub trait OutputSink {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Writes the output and statistics of one run
    fn write(&mut self, output: &CrawlOutput, stats: &CrawlStats) -> OutputResult<()>;
}
