//! HTML parsing for a fetched page
//!
//! This module turns a response body into extracted fields and outbound
//! links in one synchronous pass, so the parsed DOM never lives across an
//! await point.

use crate::selector::{Fields, SelectorSpec};
use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// Field values, one entry per configured key
    pub fields: Fields,

    /// All followable links found on the page (absolute URLs)
    pub links: Vec<Url>,
}

/// Parses HTML content, applies the selector spec and extracts links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to http(s)
///
/// `rel="nofollow"` links are followed.
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::parse_page;
/// use sumi_harvest::selector::{FieldSpec, SelectorSpec};
/// use url::Url;
///
/// let spec = SelectorSpec::new(vec![FieldSpec::text("title", "h1")]).unwrap();
/// let html = r#"<html><body><h1>Hello</h1><a href="/next">Next</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
///
/// let parsed = parse_page(html, &base_url, &spec);
/// assert_eq!(parsed.fields.get("title"), Some(&["Hello".to_string()][..]));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/next");
/// ```
pub fn parse_page(html: &str, base_url: &Url, spec: &SelectorSpec) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        fields: spec.apply(&document),
        links: extract_links(&document, base_url),
    }
}

/// Checks that a Content-Type header describes a parseable document
///
/// A missing header is accepted; servers often omit it for HTML.
pub fn check_content_type(content_type: Option<&str>) -> Result<(), String> {
    let Some(value) = content_type else {
        return Ok(());
    };

    let mime = value
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if mime.is_empty()
        || mime == "text/html"
        || mime == "application/xhtml+xml"
        || mime.starts_with("text/")
        || mime.ends_with("+xml")
        || mime == "application/xml"
    {
        Ok(())
    } else {
        Err(format!("unsupported content type '{}'", mime))
    }
}

/// Extracts all valid links from the HTML document, in document order
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
