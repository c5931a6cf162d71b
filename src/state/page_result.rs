use crate::selector::Fields;
use crate::TransportError;
use std::fmt;
use url::Url;

/// Why a page ended up failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The fetch collaborator reported a transport failure
    Transport(TransportError),

    /// The server answered with a non-2xx status
    HttpStatus(u16),

    /// The body could not be turned into a document
    Parse(String),

    /// robots.txt forbids fetching this URL
    RobotsDisallowed,

    /// A redirect led to a domain outside the crawl scope
    RedirectOutOfScope(String),

    /// The run was cancelled while this page was in flight
    Cancelled,
}

impl FailureReason {
    /// Returns true if another attempt may succeed
    ///
    /// | Reason | Retried |
    /// |--------|---------|
    /// | Timeout, connection refused/reset, DNS | yes |
    /// | HTTP 5xx, HTTP 429 | yes |
    /// | other HTTP 4xx | no |
    /// | invalid URL, parse error, robots, off-scope redirect, cancelled | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_transient(),
            Self::HttpStatus(code) => *code == 429 || (500..=599).contains(code),
            Self::Parse(_)
            | Self::RobotsDisallowed
            | Self::RedirectOutOfScope(_)
            | Self::Cancelled => false,
        }
    }

    /// A short, stable name used for grouping failures in statistics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(TransportError::Timeout) => "timeout",
            Self::Transport(TransportError::Connect(_)) => "connect",
            Self::Transport(TransportError::Reset(_)) => "reset",
            Self::Transport(TransportError::Dns(_)) => "dns",
            Self::Transport(TransportError::InvalidUrl(_)) => "invalid_url",
            Self::Transport(TransportError::Body(_)) => "body",
            Self::Transport(TransportError::Other(_)) => "transport",
            Self::HttpStatus(code) if (500..=599).contains(code) => "http_5xx",
            Self::HttpStatus(429) => "http_429",
            Self::HttpStatus(_) => "http_4xx",
            Self::Parse(_) => "parse",
            Self::RobotsDisallowed => "robots",
            Self::RedirectOutOfScope(_) => "redirect_out_of_scope",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "{}", err),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::Parse(message) => write!(f, "parse error: {}", message),
            Self::RobotsDisallowed => write!(f, "disallowed by robots.txt"),
            Self::RedirectOutOfScope(target) => write!(f, "redirected out of scope to {}", target),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome status of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Success,
    Failed(FailureReason),
}

impl PageStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The self-contained outcome of processing one URL
///
/// Workers produce exactly one `PageResult` per dispatched URL, after any
/// retries. Failed results carry no fields.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// The normalized URL that was processed
    pub url: Url,

    /// Depth of the URL relative to the start URLs
    pub depth: u32,

    /// Final status after retries
    pub status: PageStatus,

    /// HTTP status code of the last response, if any was received
    pub status_code: Option<u16>,

    /// Extracted field values (empty on failure)
    pub fields: Fields,

    /// Outbound links found on the page, in document order
    pub discovered_links: Vec<Url>,

    /// Number of fetch attempts made, including the final one
    pub attempts: u32,
}

impl PageResult {
    /// Creates a successful result
    pub fn success(
        url: Url,
        depth: u32,
        status_code: u16,
        fields: Fields,
        discovered_links: Vec<Url>,
    ) -> Self {
        Self {
            url,
            depth,
            status: PageStatus::Success,
            status_code: Some(status_code),
            fields,
            discovered_links,
            attempts: 1,
        }
    }

    /// Creates a failed result
    pub fn failed(url: Url, depth: u32, reason: FailureReason) -> Self {
        let status_code = match reason {
            FailureReason::HttpStatus(code) => Some(code),
            _ => None,
        };

        Self {
            url,
            depth,
            status: PageStatus::Failed(reason),
            status_code,
            fields: Fields::new(),
            discovered_links: Vec::new(),
            attempts: 1,
        }
    }

    /// Sets the number of attempts this result took
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Returns the failure reason, if the page failed
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            PageStatus::Success => None,
            PageStatus::Failed(reason) => Some(reason),
        }
    }
}
