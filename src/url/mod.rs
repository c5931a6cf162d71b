//! URL handling module for Sumi-Harvest
//!
//! This module provides URL normalization, host extraction, wildcard matching,
//! and the domain scope applied to discovered links.

mod domain;
mod matcher;
mod normalize;

use crate::config::ScopeConfig;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, extract_host_key, origin_url};
pub use matcher::matches_wildcard;
pub use normalize::{normalize_parsed, normalize_url};

/// Scope classification for a discovered link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeDecision {
    /// The link may be enqueued
    Allowed,
    /// The link's domain is explicitly blocked
    Blocked,
    /// An allow list exists and the domain is not on it
    OutOfScope,
}

impl ScopeDecision {
    /// Returns true if the link may be enqueued
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Domain filter applied to links before they reach the frontier
///
/// Start URLs are never filtered; only discovered links are.
#[derive(Debug, Clone, Default)]
pub struct LinkScope {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl LinkScope {
    /// Builds a scope from configuration
    pub fn from_config(config: &ScopeConfig) -> Self {
        Self {
            allowed: config.allowed_domains.clone(),
            blocked: config.blocked_domains.clone(),
        }
    }

    /// A scope that allows every domain
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Classifies a URL against the scope
    ///
    /// Priority order:
    /// 1. Blocked list (highest priority)
    /// 2. Allowed list, when non-empty
    /// 3. Allowed (default)
    pub fn classify(&self, url: &Url) -> ScopeDecision {
        let domain = match extract_domain(url) {
            Some(d) => d,
            None => return ScopeDecision::OutOfScope,
        };

        if self
            .blocked
            .iter()
            .any(|pattern| matches_wildcard(pattern, &domain))
        {
            return ScopeDecision::Blocked;
        }

        if !self.allowed.is_empty()
            && !self
                .allowed
                .iter()
                .any(|pattern| matches_wildcard(pattern, &domain))
        {
            return ScopeDecision::OutOfScope;
        }

        ScopeDecision::Allowed
    }
}
