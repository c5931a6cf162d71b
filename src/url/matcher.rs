/// Checks if a domain matches a scope pattern
///
/// Two pattern forms are supported:
/// 1. Exact: `"example.com"` matches only `"example.com"`
/// 2. Wildcard: `"*.example.com"` matches the bare domain and any subdomain
///    (`"example.com"`, `"blog.example.com"`, `"api.v2.example.com"`)
///
/// Comparison ignores ASCII case.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "Example.com"));
/// assert!(matches_wildcard("*.example.com", "docs.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let candidate = candidate.to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
