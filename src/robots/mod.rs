//! Robots.txt handling module
//!
//! This module fetches, parses, and caches robots.txt files. Allow/disallow
//! rules gate every page fetch and `Crawl-delay` raises a host's politeness
//! interval.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, RobotsVerdict};
pub use parser::ParsedRobots;
