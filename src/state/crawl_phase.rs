/// Crawl phase definitions for a single crawl run
///
/// A run moves strictly forward through `Idle -> Running -> Draining -> Done`.
/// `Running -> Done` is allowed directly when the frontier drains naturally.
use crate::HarvestError;
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Run has been created but nothing has been dispatched
    Idle,

    /// URLs are being dequeued and dispatched to workers
    Running,

    /// A stop condition was met; waiting for in-flight workers only
    Draining,

    /// No workers remain; output may be finalized
    Done,
}

impl CrawlPhase {
    /// Returns true if new URLs may be dispatched in this phase
    pub fn accepts_dispatch(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether moving from this phase to `next` is legal
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Draining)
                | (Self::Running, Self::Done)
                | (Self::Draining, Self::Done)
        )
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition_to(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: *self,
                to: next,
            });
        }
        tracing::debug!("Crawl phase {} -> {}", self, next);
        *self = next;
        Ok(())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a crawl run stopped dispatching new URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// Frontier emptied and all workers finished
    FrontierExhausted,

    /// The configured page budget was reached
    PageBudget,

    /// The configured time budget expired
    TimeBudget,

    /// The run was cancelled from outside
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FrontierExhausted => "frontier_exhausted",
            Self::PageBudget => "page_budget",
            Self::TimeBudget => "time_budget",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
