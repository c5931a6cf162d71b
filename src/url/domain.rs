use url::Url;

/// Extracts the lowercase domain (host without port) from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the key used for per-host politeness
///
/// The key is the lowercase host plus the port when one is given explicitly,
/// so two servers on the same machine are rate limited independently.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_harvest::url::extract_host_key;
///
/// let url = Url::parse("http://127.0.0.1:8080/a").unwrap();
/// assert_eq!(extract_host_key(&url), Some("127.0.0.1:8080".to_string()));
///
/// let url = Url::parse("https://Example.com/").unwrap();
/// assert_eq!(extract_host_key(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host_key(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns the origin URL (scheme, host and port) with a root path
pub fn origin_url(url: &Url) -> Option<Url> {
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return None;
    }
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Some(origin)
}
