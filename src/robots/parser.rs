//! Robots.txt parser implementation
//!
//! Allow/disallow evaluation is delegated to the robotstxt crate; the
//! `Crawl-delay` directive, which that crate ignores, is parsed here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Parsed robots.txt data for one host
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    /// Whether every path is allowed regardless of content
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt is missing, unreachable, or not a 2xx response.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns true if this instance allows every URL
    pub fn is_allow_all(&self) -> bool {
        self.allow_all || self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user agent token
    ///
    /// # Arguments
    ///
    /// * `url` - The full URL or path to check
    /// * `agent` - The crawler's product token (e.g. "SumiHarvest")
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }

    /// Gets the crawl delay that applies to the given user agent token
    ///
    /// A group naming the agent takes precedence over the `*` group.
    /// Fractional seconds are accepted; negative or unparseable values are
    /// ignored.
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        if self.is_allow_all() {
            return None;
        }

        let agent = agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;
        let mut for_agent: Option<f64> = None;
        let mut for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share one group
                    if !group_open {
                        group.clear();
                        group_open = true;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    let names_agent = group
                        .iter()
                        .any(|ua| !ua.is_empty() && ua != "*" && agent.contains(ua.as_str()));
                    if names_agent {
                        for_agent = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        for_wildcard = Some(delay);
                    }
                }
                _ => group_open = false,
            }
        }

        for_agent.or(for_wildcard).map(Duration::from_secs_f64)
    }
}
