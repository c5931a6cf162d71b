//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end through the real HTTP fetcher.

use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_harvest::config::{parse_config, Config};
use sumi_harvest::crawler::{run_crawl, write_outputs, HttpFetcher};
use sumi_harvest::state::StopReason;
use sumi_harvest::CrawlReport;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for a crawl of `base_url`
fn create_test_config(base_url: &str) -> Config {
    let toml = format!(
        r#"
start-urls = ["{base}/"]

[crawler]
max-depth = 2
max-concurrency = 4
max-concurrent-per-host = 2
min-interval-per-host = 0
fetch-timeout = 2000
max-retries = 0
retry-base-delay = 1
retry-max-delay = 5

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"

[[field]]
key = "title"
selector = "h1"

[[field]]
key = "links"
selector = "a"
attribute = "href"
"#,
        base = base_url
    );
    parse_config(&toml).expect("test config should be valid")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body).into_bytes(),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn crawl(config: &Config) -> CrawlReport {
    let fetcher = HttpFetcher::new(&config.user_agent).expect("Failed to build fetcher");
    run_crawl(config, Arc::new(fetcher), CancellationToken::new())
        .await
        .expect("Crawl failed")
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<h1>Home</h1><a href="/page1">1</a><a href="/page2">2</a>"#,
    )
    .await;
    mount_page(&server, "/page1", r#"<h1>Page 1</h1><a href="/page3">3</a>"#).await;
    mount_page(&server, "/page2", r#"<h1>Page 2</h1><a href="/">home</a>"#).await;
    mount_page(&server, "/page3", "<h1>Page 3</h1>").await;

    let config = create_test_config(&server.uri());
    let report = crawl(&config).await;

    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(report.stats.attempted, 4);
    assert_eq!(report.stats.succeeded, 4);

    let mut titles = report.output.get("title").unwrap().to_vec();
    titles.sort();
    assert_eq!(titles, vec!["Home", "Page 1", "Page 2", "Page 3"]);

    // Raw attribute values, not resolved URLs
    let links = report.output.get("links").unwrap();
    assert!(links.contains(&"/page1".to_string()));
    assert!(links.contains(&"/page3".to_string()));
    assert_eq!(links.len(), 4);

    // Every page requested exactly once
    let requests = server.received_requests().await.unwrap();
    let root_hits = requests.iter().filter(|r| r.url.path() == "/").count();
    assert_eq!(root_hits, 1);
}

#[tokio::test]
async fn test_max_depth_zero_fetches_only_seeds() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/x">x</a><a href="/y">y</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html("x"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.crawler.max_depth = 0;
    let report = crawl(&config).await;

    assert_eq!(report.stats.attempted, 1);
    assert_eq!(report.output.get("links").unwrap(), ["/x", "/y"]);
    assert!(report.output.get("title").unwrap().is_empty());
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        r#"<h1>Home</h1><a href="/private/secret">s</a><a href="/public">p</a>"#,
    )
    .await;
    mount_page(&server, "/public", "<h1>Public</h1>").await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html("<h1>Secret</h1>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let report = crawl(&config).await;

    assert_eq!(report.stats.attempted, 3);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.failures_by_kind.get("robots"), Some(&1));

    let titles = report.output.get("title").unwrap();
    assert!(!titles.contains(&"Secret".to_string()));
}

#[tokio::test]
async fn test_server_errors_are_retried_with_bound() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/flaky">f</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.crawler.max_retries = 2;
    let report = crawl(&config).await;

    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.retried, 2);
    assert_eq!(report.stats.failures_by_kind.get("http_5xx"), Some(&1));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/missing">m</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.crawler.max_retries = 3;
    let report = crawl(&config).await;

    assert_eq!(report.stats.retried, 0);
    assert_eq!(report.stats.failures_by_kind.get("http_4xx"), Some(&1));
}

#[tokio::test]
async fn test_fetch_timeout_is_a_failure() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/slow">s</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("late").set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.crawler.fetch_timeout = 200;
    let report = crawl(&config).await;

    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.failures_by_kind.get("timeout"), Some(&1));
}

#[tokio::test]
async fn test_page_budget_stops_dispatch() {
    let server = MockServer::start().await;

    let links: String = (0..20)
        .map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i))
        .collect();
    mount_page(&server, "/", &links).await;
    for i in 0..20 {
        mount_page(&server, &format!("/p{}", i), "<h1>leaf</h1>").await;
    }

    let mut config = create_test_config(&server.uri());
    config.crawler.max_pages = Some(5);
    let report = crawl(&config).await;

    assert_eq!(report.stop_reason, StopReason::PageBudget);
    assert_eq!(report.stats.attempted, 5);

    let page_requests = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() != "/robots.txt")
        .count();
    assert_eq!(page_requests, 5);
}

#[tokio::test]
async fn test_crawl_delay_spaces_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1\n"))
        .mount(&server)
        .await;
    mount_page(&server, "/", r#"<a href="/next">n</a>"#).await;
    mount_page(&server, "/next", "<h1>Next</h1>").await;

    let config = create_test_config(&server.uri());
    let started = Instant::now();
    let report = crawl(&config).await;

    assert_eq!(report.stats.succeeded, 2);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_empty_page_yields_empty_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "text/html"))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let report = crawl(&config).await;

    assert_eq!(report.stats.succeeded, 1);
    let json = serde_json::to_value(&report.output).unwrap();
    assert_eq!(json, serde_json::json!({"title": [], "links": []}));
}

#[tokio::test]
async fn test_non_html_response_is_parse_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"{}".to_vec(), "application/json"))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let report = crawl(&config).await;

    assert_eq!(report.stats.failures_by_kind.get("parse"), Some(&1));
}

#[tokio::test]
async fn test_outputs_written_to_disk() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<h1>Home</h1>").await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri());
    config.output.json_path = dir.path().join("out.json").display().to_string();
    config.output.summary_path = Some(dir.path().join("summary.md").display().to_string());
    config.output.database_path = Some(dir.path().join("crawl.db").display().to_string());

    let report = crawl(&config).await;
    write_outputs(&config.output, &report, "test-hash").unwrap();

    let written = std::fs::read_to_string(&config.output.json_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json, serde_json::json!({"title": ["Home"], "links": []}));

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("# Sumi-Harvest Crawl Summary"));
    assert!(summary.contains("| title | 1 |"));
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "<h1>Home</h1>").await;

    let config = create_test_config(&server.uri());
    let fetcher = HttpFetcher::new(&config.user_agent).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_crawl(&config, Arc::new(fetcher), cancel).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.stats.attempted, 0);
}

#[tokio::test]
async fn test_redirect_to_blocked_domain_is_a_failure() {
    let server = MockServer::start().await;
    let port = server.address().port();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("http://localhost:{}/landing", port).as_str()),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/landing", r#"<h1>Landing</h1><a href="/after">a</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/after"))
        .respond_with(html("<h1>After</h1>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.scope.blocked_domains = vec!["localhost".to_string()];
    let report = crawl(&config).await;

    assert_eq!(report.stats.attempted, 1);
    assert_eq!(report.stats.failures_by_kind.get("redirect_out_of_scope"), Some(&1));
    assert!(report.output.get("title").unwrap().is_empty());
}
