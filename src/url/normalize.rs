use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a leading scheme plus host
static HOST_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^/?#]+").expect("host prefix pattern is valid"));

/// Canonicalizes a URL into the host-less key used for deduplication
///
/// # Canonicalization Steps
///
/// 1. Remove a leading `http(s)://host` prefix (case-insensitive)
/// 2. Remove the fragment (everything after `#`)
/// 3. Remove leading and trailing slashes
/// 4. Drop a lone trailing `?`
/// 5. Empty result becomes `/`
///
/// The steps repeat until the value stops changing, so the function is
/// idempotent: `canonicalize(&canonicalize(x)) == canonicalize(x)`.
///
/// # Examples
///
/// ```
/// use crawl_harness::url::canonicalize;
///
/// assert_eq!(canonicalize("https://example.com/about/"), "about");
/// assert_eq!(canonicalize("/blog/post#comments"), "blog/post");
/// assert_eq!(canonicalize("/search?"), "search");
/// assert_eq!(canonicalize(""), "/");
/// ```
pub fn canonicalize(raw: &str) -> String {
    let mut current = canonical_pass(raw);
    loop {
        let next = canonical_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn canonical_pass(url: &str) -> String {
    let without_host = HOST_PREFIX.replace(url, "");
    let without_fragment = without_host.split('#').next().unwrap_or("");

    let trimmed = without_fragment.trim_matches('/');
    let trimmed = trimmed.strip_suffix('?').unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');

    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Checks if a URL points at a file rather than a page
///
/// A URL is a file when the last segment of its canonical path has an
/// extension that does not contain `html`. Query strings are ignored.
///
/// # Examples
///
/// ```
/// use crawl_harness::url::is_file;
///
/// assert!(!is_file("page.html"));
/// assert!(is_file("image.png"));
/// assert!(!is_file("/about"));
/// ```
pub fn is_file(url: &str) -> bool {
    let canonical = canonicalize(url);
    let path = canonical.split('?').next().unwrap_or("");
    let last_segment = path.rsplit('/').next().unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((_, extension)) => !extension.contains("html"),
        None => false,
    }
}

/// Checks if `href` is an in-page anchor for `current_url`
pub fn is_anchor(href: &str, current_url: &str) -> bool {
    href.contains('#') && canonicalize(href) == canonicalize(current_url)
}

/// Checks if a URL uses a scheme that can never be fetched as a page
pub fn is_special_scheme(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
