//! Result aggregation
//!
//! The aggregator is owned by the scheduler loop and is the only place
//! page results are merged, so it needs no locking.

use crate::output::stats::CrawlStats;
use crate::selector::FieldMap;
use crate::state::{PageResult, PageStatus, StopReason};
use serde::Serialize;

/// The merged extraction output of a whole crawl
///
/// Keys appear in selector order and every configured key is present, even
/// when no page produced a value for it. Values for a key are appended in
/// the order pages completed; with more than one worker that order can
/// differ between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CrawlOutput {
    fields: FieldMap,
}

impl CrawlOutput {
    /// Creates an output with every key present and no values
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: FieldMap::with_keys(keys),
        }
    }

    /// Values collected for a key
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter()
    }

    /// Total number of values across all keys
    pub fn value_count(&self) -> usize {
        self.fields.value_count()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }
}

/// Merges page results into a `CrawlOutput` and `CrawlStats`
#[derive(Debug)]
pub(crate) struct Aggregator {
    output: CrawlOutput,
    stats: CrawlStats,
}

impl Aggregator {
    /// Creates an aggregator whose output holds the given keys
    pub(crate) fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: CrawlOutput::with_keys(keys),
            stats: CrawlStats::new(),
        }
    }

    /// Merges one final page result
    pub(crate) fn record(&mut self, result: PageResult) {
        self.stats.attempted += 1;

        match &result.status {
            PageStatus::Success => {
                self.stats.succeeded += 1;
                self.stats.links_discovered += result.discovered_links.len() as u64;
                self.output.fields.append(&result.fields);
            }
            PageStatus::Failed(reason) => {
                self.stats.failed += 1;
                *self
                    .stats
                    .failures_by_kind
                    .entry(reason.kind().to_string())
                    .or_insert(0) += 1;
                tracing::warn!(
                    "Failed {} (depth {}, {} attempts): {}",
                    result.url,
                    result.depth,
                    result.attempts,
                    reason
                );
            }
        }
    }

    /// Counts retried and total fetch attempts for a page
    pub(crate) fn add_attempts(&mut self, retries: u32, fetch_attempts: u32) {
        self.stats.retried += retries as u64;
        self.stats.fetch_attempts += fetch_attempts as u64;
    }

    /// Counts links admitted to the frontier
    pub(crate) fn add_enqueued(&mut self, count: usize) {
        self.stats.links_enqueued += count as u64;
    }

    /// Number of page results recorded so far
    pub(crate) fn recorded(&self) -> u64 {
        self.stats.attempted
    }

    /// Freezes the statistics and hands out the final output
    pub(crate) fn finalize(mut self, stop_reason: StopReason) -> (CrawlOutput, CrawlStats) {
        self.stats.finished_at = Some(chrono::Utc::now());
        self.stats.stop_reason = Some(stop_reason);
        (self.output, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FailureReason;
    use crate::selector::Fields;
    use url::Url;

    fn url(path: &str) -> Url {
        Url::parse(&format!("http://a.test{}", path)).unwrap()
    }

    fn success(path: &str, titles: &[&str]) -> PageResult {
        let mut fields = Fields::with_keys(["title", "links"]);
        for title in titles {
            fields.push("title", title.to_string());
        }
        PageResult::success(url(path), 0, 200, fields, vec![url("/next")])
    }

    #[test]
    fn test_all_keys_present_when_nothing_matches() {
        let mut aggregator = Aggregator::new(["title", "links"]);
        aggregator.record(success("/", &[]));

        let (output, stats) = aggregator.finalize(StopReason::FrontierExhausted);
        assert_eq!(output.keys().collect::<Vec<_>>(), vec!["title", "links"]);
        assert_eq!(output.value_count(), 0);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(
            serde_json::to_string(&output).unwrap(),
            r#"{"title":[],"links":[]}"#
        );
    }

    #[test]
    fn test_values_appended_in_completion_order() {
        let mut aggregator = Aggregator::new(["title", "links"]);
        aggregator.record(success("/b", &["B"]));
        aggregator.record(success("/a", &["A1", "A2"]));

        let (output, stats) = aggregator.finalize(StopReason::FrontierExhausted);
        assert_eq!(output.get("title").unwrap(), ["B", "A1", "A2"]);
        assert_eq!(stats.links_discovered, 2);
    }

    #[test]
    fn test_failures_counted_by_kind() {
        let mut aggregator = Aggregator::new(["title"]);
        aggregator.record(PageResult::failed(url("/x"), 1, FailureReason::HttpStatus(503)));
        aggregator.record(PageResult::failed(url("/y"), 1, FailureReason::HttpStatus(502)));
        aggregator.record(PageResult::failed(url("/z"), 1, FailureReason::HttpStatus(404)));
        aggregator.add_attempts(2, 3);
        aggregator.add_enqueued(4);

        assert_eq!(aggregator.recorded(), 3);
        let (output, stats) = aggregator.finalize(StopReason::PageBudget);

        assert_eq!(output.get("title").unwrap().len(), 0);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.failures_by_kind.get("http_5xx"), Some(&2));
        assert_eq!(stats.failures_by_kind.get("http_4xx"), Some(&1));
        assert_eq!(stats.retried, 2);
        assert_eq!(stats.fetch_attempts, 3);
        assert_eq!(stats.links_enqueued, 4);
        assert_eq!(stats.stop_reason, Some(StopReason::PageBudget));
        assert!(stats.finished_at.is_some());
    }
}
