//! URL handling module for crawl-harness
//!
//! This module provides canonicalization, host extraction, URL classification
//! (internal/external, file, anchor), ignore-pattern matching, and the single
//! admission predicate that guards the crawl queue.

mod domain;
mod matcher;
mod normalize;

use crate::config::SessionConfig;
use crate::ConfigError;
use regex::Regex;

// Re-export main functions
pub use domain::{domain_of, is_external};
pub use matcher::{compile_ignore_patterns, matches_ignore};
pub use normalize::{canonicalize, is_anchor, is_file, is_special_scheme};

/// Compiled, immutable URL admission rules for one crawl session
#[derive(Debug, Clone)]
pub struct UrlRules {
    host: String,
    ignore_patterns: Vec<Regex>,
}

impl UrlRules {
    /// Builds the rules for a site host and its ignore-path patterns
    ///
    /// # Returns
    ///
    /// * `Ok(UrlRules)` - All patterns compiled
    /// * `Err(ConfigError::InvalidPattern)` - A pattern is not a valid regex
    pub fn new(host: impl Into<String>, ignore_paths: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            host: host.into().to_lowercase(),
            ignore_patterns: compile_ignore_patterns(ignore_paths)?,
        })
    }

    /// Builds the rules from a session configuration
    pub fn from_session(session: &SessionConfig) -> Result<Self, ConfigError> {
        Self::new(session.site.as_str(), &session.ignore_paths)
    }

    /// The host of the site under test
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ignore_patterns(&self) -> &[Regex] {
        &self.ignore_patterns
    }
}

/// Decides whether a URL may enter the crawl queue
///
/// A URL is rejected when:
/// - it is empty
/// - it (raw or canonical) is already tracked in any crawl state
/// - it points at a file
/// - it (raw or canonical) matches an ignore pattern
/// - it is external to the site
/// - it uses a non-page scheme (`javascript:`, `mailto:`, `tel:`, `data:`)
///
/// # Arguments
///
/// * `url` - The raw URL or href
/// * `rules` - The session's admission rules
/// * `is_tracked` - Reports whether a canonical URL already has a crawl state
///
/// # Examples
///
/// ```
/// use crawl_harness::url::{eligible_for_crawl, UrlRules};
///
/// let rules = UrlRules::new("example.com", &["^admin".to_string()]).unwrap();
/// let never_seen = |_: &str| false;
///
/// assert!(eligible_for_crawl("/about", &rules, never_seen));
/// assert!(!eligible_for_crawl("/admin/users", &rules, never_seen));
/// assert!(!eligible_for_crawl("/logo.png", &rules, never_seen));
/// assert!(!eligible_for_crawl("https://other.org/", &rules, never_seen));
/// ```
pub fn eligible_for_crawl(url: &str, rules: &UrlRules, is_tracked: impl Fn(&str) -> bool) -> bool {
    if url.is_empty() {
        return false;
    }

    let canonical = canonicalize(url);

    if is_tracked(url) || is_tracked(&canonical) {
        tracing::trace!("{} already tracked", canonical);
        return false;
    }

    if is_file(&canonical) {
        tracing::trace!("{} is a file", canonical);
        return false;
    }

    if matches_ignore(url, rules.ignore_patterns())
        || matches_ignore(&canonical, rules.ignore_patterns())
    {
        tracing::trace!("{} matches an ignore pattern", url);
        return false;
    }

    if is_special_scheme(url) || is_external(url, rules.host()) {
        tracing::trace!("{} is external", url);
        return false;
    }

    true
}
