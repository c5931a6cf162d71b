//! Per-host robots.txt cache shared by all workers
//!
//! Each host's robots.txt is fetched at most once per run. Concurrent workers
//! asking for the same host wait on the same in-progress fetch.

use crate::crawler::Fetcher;
use crate::robots::ParsedRobots;
use crate::url::{extract_host_key, origin_url};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }
}

/// Decision for a single URL
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotsVerdict {
    /// Whether the URL may be fetched
    pub allowed: bool,

    /// Crawl delay the host requests from this agent
    pub crawl_delay: Option<Duration>,
}

type Slot = Arc<OnceCell<Arc<CachedRobots>>>;

/// Lazily populated robots.txt cache keyed by host
pub struct RobotsCache {
    fetcher: Arc<dyn Fetcher>,
    agent: String,
    timeout: Duration,
    entries: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Used to download `/robots.txt`
    /// * `agent` - Product token matched against `User-agent` groups
    /// * `timeout` - Bound on each robots.txt fetch
    pub fn new(fetcher: Arc<dyn Fetcher>, agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            agent: agent.into(),
            timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluates a URL against its host's robots.txt, fetching it if needed
    pub async fn check(&self, url: &Url) -> RobotsVerdict {
        let cached = self.get(url).await;
        RobotsVerdict {
            allowed: cached.content.is_allowed(url.as_str(), &self.agent),
            crawl_delay: cached.content.crawl_delay(&self.agent),
        }
    }

    /// Returns the cached robots.txt for the URL's host
    pub async fn get(&self, url: &Url) -> Arc<CachedRobots> {
        let Some(host) = extract_host_key(url) else {
            return Arc::new(CachedRobots::new(ParsedRobots::allow_all()));
        };

        // The map lock is only held long enough to find the host's slot
        let slot = {
            let mut entries = self.entries.lock().await;
            entries.entry(host.clone()).or_default().clone()
        };

        slot.get_or_init(|| async {
            Arc::new(CachedRobots::new(self.fetch_robots(url, &host).await))
        })
        .await
        .clone()
    }

    /// Number of hosts with a cache slot
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn fetch_robots(&self, url: &Url, host: &str) -> ParsedRobots {
        let robots_url = match origin_url(url).and_then(|origin| origin.join("/robots.txt").ok()) {
            Some(u) => u,
            None => return ParsedRobots::allow_all(),
        };

        let response =
            tokio::time::timeout(self.timeout, self.fetcher.fetch(&robots_url, self.timeout)).await;

        match response {
            Ok(Ok(resp)) if (200..300).contains(&resp.status) => {
                tracing::debug!(host, "Loaded robots.txt");
                ParsedRobots::from_content(&String::from_utf8_lossy(&resp.body))
            }
            Ok(Ok(resp)) => {
                tracing::debug!(host, status = resp.status, "No robots.txt, allowing all");
                ParsedRobots::allow_all()
            }
            Ok(Err(e)) => {
                tracing::debug!(host, error = %e, "robots.txt fetch failed, allowing all");
                ParsedRobots::allow_all()
            }
            Err(_) => {
                tracing::debug!(host, "robots.txt fetch timed out, allowing all");
                ParsedRobots::allow_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::FetchResponse;
    use crate::TransportError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticRobots {
        status: u16,
        body: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for StaticRobots {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(url.path(), "/robots.txt");
            Ok(FetchResponse::new(self.status, url.clone(), self.body.as_bytes().to_vec()))
        }
    }

    fn cache(status: u16, body: &'static str) -> (Arc<StaticRobots>, RobotsCache) {
        let fetcher = Arc::new(StaticRobots {
            status,
            body,
            calls: AtomicUsize::new(0),
        });
        let cache = RobotsCache::new(fetcher.clone(), "TestBot", Duration::from_secs(1));
        (fetcher, cache)
    }

    #[tokio::test]
    async fn test_fetches_once_per_host() {
        let (fetcher, cache) = cache(200, "User-agent: *\nDisallow: /private\nCrawl-delay: 2");

        let a = Url::parse("http://a.test/private/x").unwrap();
        let b = Url::parse("http://a.test/public").unwrap();

        let verdict = cache.check(&a).await;
        assert!(!verdict.allowed);
        assert_eq!(verdict.crawl_delay, Some(Duration::from_secs(2)));
        assert!(cache.check(&b).await.allowed);

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let (_fetcher, cache) = cache(404, "User-agent: *\nDisallow: /");
        let url = Url::parse("http://a.test/anything").unwrap();

        let verdict = cache.check(&url).await;
        assert!(verdict.allowed);
        assert_eq!(verdict.crawl_delay, None);
    }

    #[tokio::test]
    async fn test_hosts_are_cached_separately() {
        let (fetcher, cache) = cache(200, "");
        cache.check(&Url::parse("http://a.test/").unwrap()).await;
        cache.check(&Url::parse("http://a.test:8080/").unwrap()).await;
        cache.check(&Url::parse("http://b.test/").unwrap()).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }
}
