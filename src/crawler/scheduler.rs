//! Scheduler: the dispatcher loop of a crawl run
//!
//! This module handles:
//! - The `Idle -> Running -> Draining -> Done` phase machine
//! - A bounded pool of worker tasks (`JoinSet`)
//! - Per-host politeness gating of every dispatch
//! - Page and time budgets, and cancellation
//! - Feeding discovered links back into the frontier
//!
//! Frontier, politeness state and aggregator are owned by the loop itself;
//! workers only ever see their own `UrlEntry` and report back an outcome.

use crate::config::CrawlerConfig;
use crate::crawler::frontier::{Frontier, UrlEntry};
use crate::crawler::politeness::PolitenessPolicy;
use crate::crawler::worker::{process, WorkerContext, WorkerOutcome};
use crate::output::aggregator::Aggregator;
use crate::output::{CrawlOutput, CrawlStats};
use crate::state::{CrawlPhase, FailureReason, PageResult, StopReason};
use crate::{HarvestError, TransportError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Pages between two progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Re-check interval when no host wake-up time is known and nothing is running
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Everything a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Extracted values, keyed by field
    pub output: CrawlOutput,

    /// Run statistics
    pub stats: CrawlStats,

    /// Why dispatching stopped
    pub stop_reason: StopReason,
}

type Completion = (UrlEntry, Result<WorkerOutcome, JoinError>);

/// Dispatcher for one crawl run
pub struct Scheduler {
    config: CrawlerConfig,
    frontier: Frontier,
    politeness: PolitenessPolicy,
    aggregator: Aggregator,
    phase: CrawlPhase,
    context: Arc<WorkerContext>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler in the `Idle` phase
    ///
    /// # Arguments
    ///
    /// * `config` - Concurrency, politeness, depth and budget settings
    /// * `context` - Shared worker dependencies (fetcher, selectors, robots, scope)
    /// * `cancel` - Cancels the run; workers receive child tokens
    pub fn new(config: &CrawlerConfig, context: WorkerContext, cancel: CancellationToken) -> Self {
        let aggregator = Aggregator::new(context.spec.keys());

        Self {
            config: config.clone(),
            frontier: Frontier::new(config.max_depth, config.crawl_order),
            politeness: PolitenessPolicy::from_config(config),
            aggregator,
            phase: CrawlPhase::Idle,
            context: Arc::new(context),
            cancel,
        }
    }

    /// Adds start URLs at depth 0
    ///
    /// Start URLs bypass the domain scope. Returns how many were new.
    pub fn seed<'a, I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a Url>,
    {
        let mut added = 0;
        for url in urls {
            if self.frontier.enqueue_url(url.clone(), 0, None) {
                added += 1;
            }
        }
        added
    }

    /// Current phase
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs the crawl to completion
    ///
    /// Per-page failures are recorded, never returned; the only errors are
    /// internal phase violations.
    pub async fn run(mut self) -> Result<CrawlReport, HarvestError> {
        self.phase.transition_to(CrawlPhase::Running)?;

        let started = Instant::now();
        let deadline = self
            .config
            .max_duration()
            .map(|limit| tokio::time::Instant::now() + limit);

        tracing::info!(
            "Starting crawl: {} seed URLs, max depth {}, {} workers",
            self.frontier.len(),
            self.config.max_depth,
            self.config.max_concurrency
        );

        let mut workers: JoinSet<Completion> = JoinSet::new();
        let mut stop_reason = StopReason::FrontierExhausted;

        loop {
            if self.phase == CrawlPhase::Running {
                if let Some(reason) = self.budget_exhausted(deadline) {
                    self.begin_draining(reason, workers.len())?;
                    stop_reason = reason;
                }
            }

            // Dispatch and the wake-up computation must agree on the time
            let now = Instant::now();

            if self.phase.accepts_dispatch() {
                self.dispatch(&mut workers, now);
            }

            if workers.is_empty()
                && (self.phase == CrawlPhase::Draining || self.frontier.is_empty())
            {
                break;
            }

            let mut wake_at = if self.phase.accepts_dispatch()
                && self.has_capacity(workers.len())
                && !self.frontier.is_empty()
            {
                self.politeness
                    .next_ready_at(self.frontier.pending_hosts(), now)
                    .map(tokio::time::Instant::from_std)
            } else {
                None
            };

            // The loop only ends through the checks above, never for want of a timer
            if workers.is_empty() && wake_at.is_none() {
                tracing::debug!(
                    "{} URLs pending with no wake-up time, polling",
                    self.frontier.len()
                );
                wake_at = Some(tokio::time::Instant::from_std(now + IDLE_POLL));
            }

            let running = self.phase == CrawlPhase::Running;

            tokio::select! {
                Some(joined) = workers.join_next() => match joined {
                    Ok((entry, outcome)) => self.complete(entry, outcome, started),
                    Err(e) => tracing::error!("Worker task failed: {}", e),
                },
                _ = sleep_until_opt(wake_at), if wake_at.is_some() => {}
                _ = self.cancel.cancelled(), if running => {}
                _ = sleep_until_opt(deadline), if running && deadline.is_some() => {}
            }
        }

        self.phase.transition_to(CrawlPhase::Done)?;

        tracing::debug!(
            "Politeness: {} hosts, {} fetches started",
            self.politeness.host_count(),
            self.politeness.total_requests()
        );

        let (output, stats) = self.aggregator.finalize(stop_reason);
        tracing::info!(
            "Crawl finished ({}): {} pages, {} succeeded, {} failed in {:?}",
            stop_reason,
            stats.attempted,
            stats.succeeded,
            stats.failed,
            started.elapsed()
        );

        Ok(CrawlReport {
            output,
            stats,
            stop_reason,
        })
    }

    /// Checks cancellation and both budgets
    fn budget_exhausted(&self, deadline: Option<tokio::time::Instant>) -> Option<StopReason> {
        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }

        if let Some(max_pages) = self.config.max_pages {
            if self.aggregator.recorded() >= max_pages {
                return Some(StopReason::PageBudget);
            }
        }

        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                return Some(StopReason::TimeBudget);
            }
        }

        None
    }

    fn begin_draining(&mut self, reason: StopReason, in_flight: usize) -> Result<(), HarvestError> {
        tracing::info!(
            "Stopping dispatch ({}): waiting for {} in-flight pages, {} left in frontier",
            reason,
            in_flight,
            self.frontier.len()
        );
        self.phase.transition_to(CrawlPhase::Draining)
    }

    /// Whether another worker may start: a free slot and room in the page budget
    fn has_capacity(&self, in_flight: usize) -> bool {
        if in_flight >= self.config.max_concurrency as usize {
            return false;
        }
        match self.config.max_pages {
            Some(max_pages) => self.aggregator.recorded() + (in_flight as u64) < max_pages,
            None => true,
        }
    }

    /// Fills free worker slots with URLs whose host is ready
    fn dispatch(&mut self, workers: &mut JoinSet<Completion>, now: Instant) {
        while self.has_capacity(workers.len()) {
            let politeness = &self.politeness;
            let Some(entry) = self
                .frontier
                .dequeue_where(|e| politeness.can_fetch_now(&e.host, now))
            else {
                break;
            };

            self.politeness.record_fetch_start(&entry.host, now);
            tracing::debug!("Dispatching {} (depth {})", entry.url, entry.depth);

            let context = Arc::clone(&self.context);
            let token = self.cancel.child_token();
            let task_entry = entry.clone();

            // The inner task isolates worker panics so the host slot is still released
            workers.spawn(async move {
                let outcome = tokio::spawn(process(context, task_entry, token)).await;
                (entry, outcome)
            });
        }
    }

    /// Handles a finished worker
    fn complete(
        &mut self,
        entry: UrlEntry,
        outcome: Result<WorkerOutcome, JoinError>,
        started: Instant,
    ) {
        self.politeness.record_fetch_end(&entry.host, Instant::now());

        let outcome = outcome.unwrap_or_else(|e| {
            tracing::error!("Worker for {} failed: {}", entry.url, e);
            WorkerOutcome {
                result: PageResult::failed(
                    entry.url.clone(),
                    entry.depth,
                    FailureReason::Transport(TransportError::Other(format!(
                        "worker task failed: {}",
                        e
                    ))),
                ),
                retries: 0,
                fetch_attempts: 0,
                crawl_delay: None,
            }
        });

        if let Some(delay) = outcome.crawl_delay {
            self.politeness.apply_crawl_delay(&entry.host, delay);
        }

        let child_depth = outcome.result.depth + 1;
        let mut enqueued = 0;
        for link in &outcome.result.discovered_links {
            let decision = self.context.scope.classify(link);
            if !decision.is_allowed() {
                tracing::trace!("Skipping {} ({:?})", link, decision);
                continue;
            }
            if self
                .frontier
                .enqueue_url(link.clone(), child_depth, Some(&entry.url))
            {
                enqueued += 1;
            }
        }

        self.aggregator
            .add_attempts(outcome.retries, outcome.fetch_attempts);
        self.aggregator.add_enqueued(enqueued);
        self.aggregator.record(outcome.result);

        let recorded = self.aggregator.recorded();
        if recorded % PROGRESS_INTERVAL == 0 {
            let rate = recorded as f64 / started.elapsed().as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                "Progress: {} pages recorded, {} in frontier, {:.2} pages/sec",
                recorded,
                self.frontier.len(),
                rate
            );
        }
    }
}

/// Sleeps until `at`, or forever when there is nothing to wait for
async fn sleep_until_opt(at: Option<tokio::time::Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
