//! Crawler module for fetching pages and extracting fields
//!
//! This module contains the core crawling logic, including:
//! - The frontier of pending URLs
//! - Per-host politeness and retry policies
//! - HTTP fetching behind the `Fetcher` seam
//! - HTML parsing, field extraction and link discovery
//! - The dispatcher loop and overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod politeness;
mod retry;
mod scheduler;
mod worker;

pub use coordinator::{build_sinks, run_crawl, write_outputs};
pub use fetcher::{build_http_client, FetchResponse, Fetcher, HttpFetcher, MAX_REDIRECTS};
pub use frontier::{Frontier, UrlEntry};
pub use parser::{check_content_type, parse_page, ParsedPage};
pub use politeness::PolitenessPolicy;
pub use retry::RetryPolicy;
pub use scheduler::{CrawlReport, Scheduler};
pub use worker::{process, WorkerContext, WorkerOutcome};
