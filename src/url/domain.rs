use crate::url::normalize::canonicalize;
use url::Url;

/// Extracts the host from an absolute URL
///
/// Relative URLs have no host and yield an empty string. The host is
/// lower-cased and any port is dropped.
///
/// # Examples
///
/// ```
/// use crawl_harness::url::domain_of;
///
/// assert_eq!(domain_of("https://Example.com:8080/path"), "example.com");
/// assert_eq!(domain_of("/relative/path"), "");
/// ```
pub fn domain_of(raw: &str) -> String {
    if !raw.contains("://") {
        return String::new();
    }

    if let Some(host) = Url::parse(raw).ok().and_then(|u| u.host_str().map(str::to_string)) {
        return host.to_lowercase();
    }

    // Not a parseable URL; fall back to the text between "://" and the path
    raw.split("://")
        .nth(1)
        .and_then(|rest| rest.split(['/', '?', '#']).next())
        .and_then(|authority| authority.split(':').next())
        .map(|host| host.to_lowercase())
        .unwrap_or_default()
}

/// Checks if a raw href leaves the site under test
///
/// Relative paths, bare fragments, strings already in canonical form and
/// absolute URLs on `current_host` are all internal.
///
/// # Examples
///
/// ```
/// use crawl_harness::url::is_external;
///
/// assert!(!is_external("/relative/path", "example.com"));
/// assert!(is_external("http://other.example.com/x", "example.com"));
/// assert!(!is_external("https://example.com/x", "example.com"));
/// ```
pub fn is_external(raw: &str, current_host: &str) -> bool {
    !(raw.is_empty()
        || raw.starts_with('/')
        || raw.starts_with('#')
        || !raw.contains("://")
        || raw == canonicalize(raw)
        || domain_of(raw) == current_host.to_lowercase())
}
