use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// Compiles ignore-path patterns as case-insensitive regular expressions
///
/// # Arguments
///
/// * `patterns` - Pattern sources from the session configuration
///
/// # Returns
///
/// * `Ok(Vec<Regex>)` - Compiled patterns in configuration order
/// * `Err(ConfigError::InvalidPattern)` - The first pattern that failed to compile
pub fn compile_ignore_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

/// Checks if any ignore pattern matches the URL
///
/// # Examples
///
/// ```
/// use crawl_harness::url::{compile_ignore_patterns, matches_ignore};
///
/// let patterns = compile_ignore_patterns(&["^admin".to_string()]).unwrap();
/// assert!(matches_ignore("ADMIN/users", &patterns));
/// assert!(!matches_ignore("blog/admin-tips", &patterns));
/// ```
pub fn matches_ignore(url: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(url))
}
