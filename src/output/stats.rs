//! Crawl statistics
//!
//! Counters are updated by the aggregator as page results arrive and are
//! frozen when the run finishes.

use crate::state::StopReason;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStats {
    /// Page results recorded (successes plus failures)
    pub attempted: u64,

    /// Pages fetched and extracted successfully
    pub succeeded: u64,

    /// Pages that ended in a failure
    pub failed: u64,

    /// Failed attempts that were followed by a retry
    pub retried: u64,

    /// HTTP attempts made for pages, retries included
    pub fetch_attempts: u64,

    /// Links found on successful pages
    pub links_discovered: u64,

    /// Discovered links that were new and admitted to the frontier
    pub links_enqueued: u64,

    /// Failure count per failure kind (e.g. "http_5xx", "timeout")
    pub failures_by_kind: BTreeMap<String, u64>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,

    /// Why dispatching stopped
    pub stop_reason: Option<StopReason>,
}

impl CrawlStats {
    /// Creates empty statistics starting now
    pub fn new() -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            failed: 0,
            retried: 0,
            fetch_attempts: 0,
            links_discovered: 0,
            links_enqueued: 0,
            failures_by_kind: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
            stop_reason: None,
        }
    }

    /// Run duration, once finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|finished| finished - self.started_at)
    }

    /// Share of recorded pages that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.attempted as f64) * 100.0
    }

    /// Pages recorded per second of run time
    pub fn pages_per_second(&self) -> Option<f64> {
        let seconds = self.duration()?.num_milliseconds() as f64 / 1000.0;
        (seconds > 0.0).then(|| self.attempted as f64 / seconds)
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages recorded: {}", stats.attempted);
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);
    println!("  Fetch attempts: {} ({} retries)", stats.fetch_attempts, stats.retried);
    println!(
        "  Links: {} discovered, {} enqueued",
        stats.links_discovered, stats.links_enqueued
    );
    if let Some(reason) = stats.stop_reason {
        println!("  Stopped: {}", reason);
    }
    if let Some(duration) = stats.duration() {
        println!(
            "  Duration: {:.2}s",
            duration.num_milliseconds() as f64 / 1000.0
        );
    }
    println!();

    if !stats.failures_by_kind.is_empty() {
        println!("Failures by Kind:");
        let mut counts: Vec<_> = stats.failures_by_kind.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1));

        for (kind, count) in counts {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages)",
        stats.success_rate(),
        stats.succeeded,
        stats.attempted
    );
}
