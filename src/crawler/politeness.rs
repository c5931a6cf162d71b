//! Per-host politeness gate
//!
//! The policy owns one `HostState` per host key and decides whether a fetch
//! against a host may start now. It is mutated only by the scheduler loop.

use crate::config::CrawlerConfig;
use crate::state::HostState;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Rate limits and in-flight caps for every host seen in a run
#[derive(Debug)]
pub struct PolitenessPolicy {
    hosts: HashMap<String, HostState>,
    min_interval: Duration,
    max_in_flight: u32,
}

impl PolitenessPolicy {
    /// Creates a policy with the given per-host interval and in-flight cap
    pub fn new(min_interval: Duration, max_in_flight: u32) -> Self {
        Self {
            hosts: HashMap::new(),
            min_interval,
            max_in_flight,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.min_interval(), config.max_concurrent_per_host)
    }

    fn state_mut(&mut self, host: &str) -> &mut HostState {
        let min_interval = self.min_interval;
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| HostState::new(min_interval))
    }

    /// Returns true if a fetch against `host` may start at `now`
    ///
    /// A host that has never been fetched is always ready.
    pub fn can_fetch_now(&self, host: &str, now: Instant) -> bool {
        match self.hosts.get(host) {
            Some(state) => state.can_fetch(self.max_in_flight, now),
            None => self.max_in_flight > 0,
        }
    }

    /// Records that a fetch against `host` started at `now`
    pub fn record_fetch_start(&mut self, host: &str, now: Instant) {
        self.state_mut(host).record_start(now);
    }

    /// Records that a fetch against `host` finished at `now`
    pub fn record_fetch_end(&mut self, host: &str, now: Instant) {
        self.state_mut(host).record_end(now);
    }

    /// Raises the host's interval to a robots.txt crawl delay
    pub fn apply_crawl_delay(&mut self, host: &str, delay: Duration) {
        let state = self.state_mut(host);
        let before = state.min_interval;
        state.apply_crawl_delay(delay);
        if state.min_interval != before {
            tracing::debug!(
                "Crawl delay for {} raised interval to {:?}",
                host,
                state.min_interval
            );
        }
    }

    /// Earliest instant at which one of `hosts` may be fetched
    ///
    /// A host that is already ready (or never seen) yields `now`. Hosts
    /// blocked only by their in-flight cap are ignored: they free up when a
    /// worker completes, not with the passage of time. Returns None only when
    /// every host is capped.
    pub fn next_ready_at<'a, I>(&self, hosts: I, now: Instant) -> Option<Instant>
    where
        I: IntoIterator<Item = &'a str>,
    {
        hosts
            .into_iter()
            .filter_map(|host| match self.hosts.get(host) {
                None => (self.max_in_flight > 0).then_some(now),
                Some(state) if state.in_flight >= self.max_in_flight => None,
                Some(state) => Some(state.ready_at(now).unwrap_or(now)),
            })
            .min()
    }

    /// State for a host, if it has been seen
    pub fn host(&self, host: &str) -> Option<&HostState> {
        self.hosts.get(host)
    }

    /// Number of hosts seen
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Total fetches started across all hosts
    pub fn total_requests(&self) -> u64 {
        self.hosts.values().map(|s| s.request_count as u64).sum()
    }
}
