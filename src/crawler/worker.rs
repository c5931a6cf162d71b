//! Fetch-extract worker
//!
//! A worker takes one frontier entry through robots evaluation, fetching
//! (with retries), field extraction, and link discovery. It never touches
//! shared crawl state: everything it learns comes back in a `WorkerOutcome`.

use crate::crawler::fetcher::{FetchResponse, Fetcher};
use crate::crawler::frontier::UrlEntry;
use crate::crawler::parser::{check_content_type, parse_page};
use crate::crawler::retry::RetryPolicy;
use crate::robots::RobotsCache;
use crate::selector::SelectorSpec;
use crate::state::{FailureReason, PageResult};
use crate::url::LinkScope;
use crate::TransportError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything a worker needs, shared by all workers of a run
pub struct WorkerContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub spec: Arc<SelectorSpec>,
    /// None when robots.txt is not respected
    pub robots: Option<Arc<RobotsCache>>,
    pub retry: RetryPolicy,
    pub fetch_timeout: Duration,
    /// Domain filter for discovered links and redirect targets
    pub scope: LinkScope,
}

/// What a worker reports back to the scheduler
#[derive(Debug)]
pub struct WorkerOutcome {
    /// The final result for the page
    pub result: PageResult,

    /// Failed attempts that were followed by another attempt
    pub retries: u32,

    /// HTTP attempts made, including the final one
    pub fetch_attempts: u32,

    /// Crawl delay requested by the host's robots.txt
    pub crawl_delay: Option<Duration>,
}

impl WorkerOutcome {
    fn new(result: PageResult, retries: u32, fetch_attempts: u32, crawl_delay: Option<Duration>) -> Self {
        Self {
            result,
            retries,
            fetch_attempts,
            crawl_delay,
        }
    }
}

/// Processes one frontier entry to completion
///
/// Cancellation is observed during the robots lookup, the fetch, and every
/// backoff sleep; a cancelled page is reported as `Failed(Cancelled)`.
pub async fn process(
    ctx: Arc<WorkerContext>,
    entry: UrlEntry,
    cancel: CancellationToken,
) -> WorkerOutcome {
    let mut crawl_delay = None;

    if let Some(robots) = &ctx.robots {
        let verdict = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return WorkerOutcome::new(cancelled(&entry, 0), 0, 0, None);
            }
            verdict = robots.check(&entry.url) => verdict,
        };

        crawl_delay = verdict.crawl_delay;

        if !verdict.allowed {
            tracing::info!("URL {} disallowed by robots.txt", entry.url);
            let result = PageResult::failed(
                entry.url.clone(),
                entry.depth,
                FailureReason::RobotsDisallowed,
            )
            .with_attempts(0);
            return WorkerOutcome::new(result, 0, 0, crawl_delay);
        }
    }

    let mut retries = 0u32;
    loop {
        let result = fetch_once(&ctx, &entry, &cancel).await;
        let attempts = retries + 1;

        let Some(reason) = result.failure() else {
            return WorkerOutcome::new(result.with_attempts(attempts), retries, attempts, crawl_delay);
        };

        if !ctx.retry.should_retry(reason, retries) {
            return WorkerOutcome::new(result.with_attempts(attempts), retries, attempts, crawl_delay);
        }

        let delay = ctx.retry.backoff(retries);
        tracing::debug!(
            "Retrying {} in {:?} after {} (attempt {}/{})",
            entry.url,
            delay,
            reason,
            attempts,
            ctx.retry.max_retries + 1
        );
        retries += 1;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return WorkerOutcome::new(cancelled(&entry, attempts), retries, attempts, crawl_delay);
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Makes a single fetch attempt and turns the response into a PageResult
async fn fetch_once(ctx: &WorkerContext, entry: &UrlEntry, cancel: &CancellationToken) -> PageResult {
    let fetch = tokio::time::timeout(
        ctx.fetch_timeout,
        ctx.fetcher.fetch(&entry.url, ctx.fetch_timeout),
    );

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return cancelled(entry, 1),
        response = fetch => response,
    };

    match response {
        Err(_elapsed) => failed(entry, FailureReason::Transport(TransportError::Timeout)),
        Ok(Err(e)) => failed(entry, FailureReason::Transport(e)),
        Ok(Ok(resp)) if redirected_out_of_scope(ctx, entry, &resp) => {
            tracing::info!("{} redirected out of scope to {}", entry.url, resp.final_url);
            let mut result = failed(
                entry,
                FailureReason::RedirectOutOfScope(resp.final_url.to_string()),
            );
            result.status_code = Some(resp.status);
            result
        }
        Ok(Ok(resp)) if !resp.is_success() => failed(entry, FailureReason::HttpStatus(resp.status)),
        Ok(Ok(resp)) => extract(ctx, entry, resp),
    }
}

/// The fetcher follows redirects itself, so the landing URL is checked here
fn redirected_out_of_scope(ctx: &WorkerContext, entry: &UrlEntry, response: &FetchResponse) -> bool {
    response.final_url.host_str() != entry.url.host_str()
        && !ctx.scope.classify(&response.final_url).is_allowed()
}

/// Parses a 2xx response
fn extract(ctx: &WorkerContext, entry: &UrlEntry, response: FetchResponse) -> PageResult {
    if let Err(message) = check_content_type(response.content_type()) {
        let mut result = failed(entry, FailureReason::Parse(message));
        result.status_code = Some(response.status);
        return result;
    }

    let body = String::from_utf8_lossy(&response.body);
    let parsed = parse_page(&body, &response.final_url, &ctx.spec);

    tracing::debug!(
        "Parsed {} ({} values, {} links)",
        entry.url,
        parsed.fields.value_count(),
        parsed.links.len()
    );

    PageResult::success(
        entry.url.clone(),
        entry.depth,
        response.status,
        parsed.fields,
        parsed.links,
    )
}

fn failed(entry: &UrlEntry, reason: FailureReason) -> PageResult {
    PageResult::failed(entry.url.clone(), entry.depth, reason)
}

fn cancelled(entry: &UrlEntry, attempts: u32) -> PageResult {
    failed(entry, FailureReason::Cancelled).with_attempts(attempts)
}
