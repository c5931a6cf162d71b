//! Retry policy for transient fetch failures

use crate::config::CrawlerConfig;
use crate::state::FailureReason;
use std::time::Duration;

/// Bounded exponential backoff
///
/// | Retry | Delay |
/// |-------|-------|
/// | 1st | `base` |
/// | 2nd | `base * 2` |
/// | nth | `min(base * 2^(n-1), cap)` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.max_retries,
            config.retry_base_delay(),
            config.retry_max_delay(),
        )
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before the retry that follows `retries_done` earlier retries
    pub fn backoff(&self, retries_done: u32) -> Duration {
        let factor = 2u32.checked_pow(retries_done).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether a failure should be retried after `retries_done` retries
    pub fn should_retry(&self, reason: &FailureReason, retries_done: u32) -> bool {
        reason.is_transient() && retries_done < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportError;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(500), Duration::from_millis(3000))
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::from_millis(500));
        assert_eq!(p.backoff(1), Duration::from_millis(1000));
        assert_eq!(p.backoff(2), Duration::from_millis(2000));
        assert_eq!(p.backoff(3), Duration::from_millis(3000));
        assert_eq!(p.backoff(40), Duration::from_millis(3000));
    }

    #[test]
    fn test_should_retry_transient_only() {
        let p = policy();
        assert!(p.should_retry(&FailureReason::HttpStatus(503), 0));
        assert!(p.should_retry(&FailureReason::HttpStatus(429), 2));
        assert!(p.should_retry(&FailureReason::Transport(TransportError::Timeout), 1));

        assert!(!p.should_retry(&FailureReason::HttpStatus(503), 3));
        assert!(!p.should_retry(&FailureReason::HttpStatus(404), 0));
        assert!(!p.should_retry(&FailureReason::RobotsDisallowed, 0));
        assert!(!p.should_retry(&FailureReason::Parse("bad".into()), 0));
        assert!(!p.should_retry(&FailureReason::Cancelled, 0));
    }

    #[test]
    fn test_no_retries() {
        let p = RetryPolicy::none();
        assert!(!p.should_retry(&FailureReason::HttpStatus(500), 0));
    }
}
