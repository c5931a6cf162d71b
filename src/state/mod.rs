//! State module for tracking crawl progress
//!
//! This module provides state types shared by the scheduler, the workers and
//! the aggregator.
//!
//! # Components
//!
//! - `CrawlPhase`: The run-level state machine (idle, running, draining, done)
//! - `HostState`: Per-host politeness tracking (interval and in-flight count)
//! - `PageResult`: The outcome of processing one URL

mod crawl_phase;
mod host_state;
mod page_result;

// Re-export main types
pub use crawl_phase::{CrawlPhase, StopReason};
pub use host_state::HostState;
pub use page_result::{FailureReason, PageResult, PageStatus};
