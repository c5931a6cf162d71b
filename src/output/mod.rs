//! Output module for crawl results
//!
//! This module handles:
//! - Merging page results into the crawl output and statistics
//! - Writing the output as JSON and to SQLite
//! - Generating markdown summaries of a run

pub(crate) mod aggregator;
mod json;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use aggregator::CrawlOutput;
pub use json::JsonFileSink;
pub use markdown::{format_markdown_summary, generate_markdown_summary, MarkdownSink};
pub use sqlite_output::SqliteSink;
pub use stats::{print_statistics, CrawlStats};
pub use traits::{OutputError, OutputResult, OutputSink};

/// Writes a finished crawl to every sink, in order
///
/// Stops at the first sink that fails.
pub fn write_all(
    sinks: &mut [Box<dyn OutputSink>],
    output: &CrawlOutput,
    stats: &CrawlStats,
) -> OutputResult<()> {
    for sink in sinks.iter_mut() {
        tracing::debug!("Writing {} output", sink.name());
        sink.write(output, stats)?;
    }
    Ok(())
}
