//! HTTP fetch collaborator
//!
//! The crawl engine only talks to the network through the `Fetcher` trait,
//! so tests can script responses without a server. `HttpFetcher` is the
//! reqwest-backed implementation used by the binary.
//!
//! # Error Classification
//!
//! | reqwest condition | TransportError |
//! |-------------------|----------------|
//! | Timeout | `Timeout` |
//! | Connect, name resolution failed | `Dns` |
//! | Connect, anything else | `Connect` |
//! | Connection reset / broken pipe | `Reset` |
//! | Request could not be built | `InvalidUrl` |
//! | Body read failed | `Body` |
//! | Anything else (incl. redirect limit) | `Other` |

use crate::config::UserAgentConfig;
use crate::TransportError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum number of redirects followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// A received HTTP response, whatever its status
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,

    /// URL after redirects; relative links resolve against it
    pub final_url: Url,

    /// Response headers
    pub headers: HeaderMap,

    /// Raw body bytes
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Creates a response without headers
    pub fn new(status: u16, final_url: Url, body: Vec<u8>) -> Self {
        Self {
            status,
            final_url,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The Content-Type header value, if present and valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Fetches a URL within a time bound
///
/// Non-2xx responses are returned as `Ok`; only failures to obtain a
/// response at all are `TransportError`s.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, TransportError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::UserAgentConfig;
/// use sumi_harvest::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: Some("https://example.com/bot".to_string()),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent_string())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed `Fetcher`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher whose client identifies itself with `config`
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(error_chain(&e))
            }
        })?;

        Ok(FetchResponse {
            status,
            final_url,
            headers,
            body: body.to_vec(),
        })
    }
}

/// Maps a reqwest error onto the transport error taxonomy
fn classify_error(e: &reqwest::Error) -> TransportError {
    let detail = error_chain(e);
    let lowered = detail.to_lowercase();

    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_builder() {
        TransportError::InvalidUrl(detail)
    } else if e.is_connect() {
        if lowered.contains("dns") || lowered.contains("resolve") || lowered.contains("lookup") {
            TransportError::Dns(detail)
        } else {
            TransportError::Connect(detail)
        }
    } else if lowered.contains("reset") || lowered.contains("broken pipe") {
        TransportError::Reset(detail)
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(detail)
    } else {
        TransportError::Other(detail)
    }
}

/// Joins an error and all of its sources into one message
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
