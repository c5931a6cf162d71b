use std::time::{Duration, Instant};

/// Tracks the politeness state of a single host during crawling
///
/// One `HostState` is created lazily the first time a URL for the host is
/// considered, and lives until the crawl run ends. It is only ever mutated
/// by the scheduler loop.
#[derive(Debug, Clone)]
pub struct HostState {
    /// When the last fetch to this host started or finished
    pub last_fetch_time: Option<Instant>,

    /// Minimum time between two fetches to this host
    pub min_interval: Duration,

    /// Number of fetches currently running against this host
    pub in_flight: u32,

    /// Number of fetches started against this host in the current run
    pub request_count: u32,
}

impl HostState {
    /// Creates a new HostState with the given minimum interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_fetch_time: None,
            min_interval,
            in_flight: 0,
            request_count: 0,
        }
    }

    /// Checks if a fetch can be started against this host right now
    ///
    /// # Arguments
    ///
    /// * `max_in_flight` - Maximum concurrent fetches allowed per host
    /// * `now` - The current time instant
    ///
    /// # Returns
    ///
    /// * `true` - If the interval has elapsed and the host has a free slot
    /// * `false` - If the fetch must wait
    pub fn can_fetch(&self, max_in_flight: u32, now: Instant) -> bool {
        if self.in_flight >= max_in_flight {
            return false;
        }

        self.time_until_ready(now).is_none()
    }

    /// Records that a fetch against this host has started
    pub fn record_start(&mut self, now: Instant) {
        self.in_flight += 1;
        self.request_count += 1;
        self.last_fetch_time = Some(now);
    }

    /// Records that a fetch against this host has finished
    ///
    /// The interval to the next fetch is measured from this point on.
    pub fn record_end(&mut self, now: Instant) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.last_fetch_time = Some(now);
    }

    /// Raises the minimum interval to honour a robots.txt crawl delay
    ///
    /// The interval never shrinks below what was configured.
    pub fn apply_crawl_delay(&mut self, delay: Duration) {
        if delay > self.min_interval {
            self.min_interval = delay;
        }
    }

    /// Calculates the time until the interval since the last fetch has elapsed
    ///
    /// Returns None if the interval has already elapsed.
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fetch_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }

    /// Returns the instant at which the interval elapses, if it is in the future
    pub fn ready_at(&self, now: Instant) -> Option<Instant> {
        self.time_until_ready(now).map(|wait| now + wait)
    }
}
