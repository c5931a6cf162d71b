//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a crawl run:
//! run information, page statistics, values per field and failures.

use crate::output::aggregator::CrawlOutput;
use crate::output::stats::CrawlStats;
use crate::output::traits::{OutputResult, OutputSink};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes a markdown summary to `output_path`
///
/// # Arguments
///
/// * `output` - The merged crawl output
/// * `stats` - The run statistics
/// * `config_hash` - Hash of the configuration file, if known
/// * `output_path` - Path where the markdown file should be written
pub fn generate_markdown_summary(
    output: &CrawlOutput,
    stats: &CrawlStats,
    config_hash: Option<&str>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(output, stats, config_hash);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl run as markdown
pub fn format_markdown_summary(
    output: &CrawlOutput,
    stats: &CrawlStats,
    config_hash: Option<&str>,
) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Harvest Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", stats.started_at.to_rfc3339()));
    if let Some(finished) = stats.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = stats.duration() {
        md.push_str(&format!(
            "- **Duration**: {:.2} seconds\n",
            duration.num_milliseconds() as f64 / 1000.0
        ));
    }
    if let Some(reason) = stats.stop_reason {
        md.push_str(&format!("- **Stop Reason**: {}\n", reason));
    }
    if let Some(hash) = config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Recorded**: {}\n", stats.attempted));
    md.push_str(&format!("- **Succeeded**: {}\n", stats.succeeded));
    md.push_str(&format!("- **Failed**: {}\n", stats.failed));
    md.push_str(&format!("- **Fetch Attempts**: {}\n", stats.fetch_attempts));
    md.push_str(&format!("- **Retries**: {}\n", stats.retried));
    md.push_str(&format!(
        "- **Links Discovered**: {}\n",
        stats.links_discovered
    ));
    md.push_str(&format!("- **Links Enqueued**: {}\n", stats.links_enqueued));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        stats.success_rate()
    ));
    if let Some(rate) = stats.pages_per_second() {
        md.push_str(&format!("- **Throughput**: {:.2} pages/sec\n", rate));
    }
    md.push('\n');

    // Values per field
    md.push_str("## Extracted Fields\n\n");
    if output.keys().next().is_none() {
        md.push_str("No fields configured.\n\n");
    } else {
        md.push_str("| Field | Values |\n");
        md.push_str("|-------|--------|\n");
        for (key, values) in output.iter() {
            md.push_str(&format!("| {} | {} |\n", key, values.len()));
        }
        md.push('\n');
    }

    // Failures
    if !stats.failures_by_kind.is_empty() {
        md.push_str("## Failure Summary\n\n");
        md.push_str("| Failure | Count |\n");
        md.push_str("|---------|-------|\n");

        let mut counts: Vec<_> = stats.failures_by_kind.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (kind, count) in counts {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    md
}

/// Writes the markdown summary as part of the output sinks
#[derive(Debug, Clone)]
pub struct MarkdownSink {
    path: PathBuf,
    config_hash: Option<String>,
}

impl MarkdownSink {
    pub fn new(path: impl Into<PathBuf>, config_hash: Option<String>) -> Self {
        Self {
            path: path.into(),
            config_hash,
        }
    }
}

impl OutputSink for MarkdownSink {
    fn name(&self) -> &str {
        "markdown"
    }

    fn write(&mut self, output: &CrawlOutput, stats: &CrawlStats) -> OutputResult<()> {
        generate_markdown_summary(output, stats, self.config_hash.as_deref(), &self.path)?;
        tracing::info!("Wrote summary to {}", self.path.display());
        Ok(())
    }
}
