//! Crawl frontier: the pending URL queue plus the visited set
//!
//! Every URL passes through normalization before it is compared or stored,
//! so `https://A.test/x/` and `https://a.test/x#top` count as one URL.
//! The visited set only grows: a URL is admitted at most once per run.

use crate::config::CrawlOrder;
use crate::url::{extract_host_key, normalize_parsed, normalize_url};
use std::collections::{HashMap, HashSet, VecDeque};
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    /// The normalized URL
    pub url: Url,

    /// Link distance from the nearest start URL
    pub depth: u32,

    /// Page the link was found on (None for start URLs)
    pub discovered_from: Option<Url>,

    /// Politeness key (`host[:port]`)
    pub host: String,
}

/// URL queue with deduplication and a depth limit
#[derive(Debug)]
pub struct Frontier {
    pending: VecDeque<UrlEntry>,
    visited: HashSet<String>,
    /// Pending URL count per host key
    pending_by_host: HashMap<String, usize>,
    max_depth: u32,
    order: CrawlOrder,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new(max_depth: u32, order: CrawlOrder) -> Self {
        Self {
            pending: VecDeque::new(),
            visited: HashSet::new(),
            pending_by_host: HashMap::new(),
            max_depth,
            order,
        }
    }

    /// Normalizes and enqueues a URL string
    ///
    /// # Returns
    ///
    /// * `true` - The URL was new and is now pending
    /// * `false` - The URL was unparseable, not http(s), already seen, or too deep
    pub fn enqueue(&mut self, url: &str, depth: u32, from: Option<&Url>) -> bool {
        match normalize_url(url) {
            Ok(normalized) => self.admit(normalized, depth, from),
            Err(e) => {
                tracing::trace!("Rejected {}: {}", url, e);
                false
            }
        }
    }

    /// Normalizes and enqueues an already parsed URL
    pub fn enqueue_url(&mut self, url: Url, depth: u32, from: Option<&Url>) -> bool {
        match normalize_parsed(url) {
            Ok(normalized) => self.admit(normalized, depth, from),
            Err(_) => false,
        }
    }

    fn admit(&mut self, url: Url, depth: u32, from: Option<&Url>) -> bool {
        if depth > self.max_depth {
            return false;
        }

        let Some(host) = extract_host_key(&url) else {
            return false;
        };

        if !self.visited.insert(url.as_str().to_string()) {
            return false;
        }

        *self.pending_by_host.entry(host.clone()).or_insert(0) += 1;
        self.pending.push_back(UrlEntry {
            url,
            depth,
            discovered_from: from.cloned(),
            host,
        });
        true
    }

    /// Removes the next URL in crawl order
    ///
    /// Breadth-first pops the oldest entry; depth-first pops the newest.
    pub fn dequeue(&mut self) -> Option<UrlEntry> {
        let entry = match self.order {
            CrawlOrder::BreadthFirst => self.pending.pop_front(),
            CrawlOrder::DepthFirst => self.pending.pop_back(),
        }?;
        self.release_host(&entry.host);
        Some(entry)
    }

    /// Removes the first entry in crawl order that satisfies `pred`
    ///
    /// Entries that are skipped keep their positions, so FIFO order holds
    /// among the entries that are eventually taken.
    pub fn dequeue_where<F>(&mut self, mut pred: F) -> Option<UrlEntry>
    where
        F: FnMut(&UrlEntry) -> bool,
    {
        let index = match self.order {
            CrawlOrder::BreadthFirst => self.pending.iter().position(|e| pred(e)),
            CrawlOrder::DepthFirst => self.pending.iter().rposition(|e| pred(e)),
        }?;
        let entry = self.pending.remove(index)?;
        self.release_host(&entry.host);
        Some(entry)
    }

    fn release_host(&mut self, host: &str) {
        if let Some(count) = self.pending_by_host.get_mut(host) {
            *count -= 1;
            if *count == 0 {
                self.pending_by_host.remove(host);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending URLs
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Number of URLs ever admitted
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Distinct hosts among the pending URLs
    ///
    /// Maintained on every enqueue and dequeue, so this does not scan the queue.
    pub fn pending_hosts(&self) -> impl Iterator<Item = &str> {
        self.pending_by_host.keys().map(String::as_str)
    }

    /// Number of pending URLs for a host
    pub fn pending_for_host(&self, host: &str) -> usize {
        self.pending_by_host.get(host).copied().unwrap_or(0)
    }
}
