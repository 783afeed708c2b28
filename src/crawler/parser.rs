//! HTML helpers for fetched page bodies
//!
//! This module handles:
//! - Deciding whether a body is an HTML page
//! - Stripping `src` attributes so parsing never references embedded resources
//! - Collecting anchor `href` values in document order

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// A quoted `src` attribute, preceded by the whitespace that separates it
static SRC_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(\s)src\s*=\s*("[^"]*"|'[^']*')"#).expect("Invalid src attribute regex")
});

/// Returns true if the body looks like an HTML page
///
/// A body counts as HTML when it contains both a `<head` and a `<body` tag.
pub fn is_html(body: &str) -> bool {
    body.contains("<head") && body.contains("<body")
}

/// Removes `src=...` attribute values from markup
pub fn strip_src_attributes(body: &str) -> String {
    SRC_ATTRIBUTE.replace_all(body, "$1").into_owned()
}

/// Parses a page body into a document, with `src` attributes stripped
pub fn parse_document(body: &str) -> Html {
    Html::parse_document(&strip_src_attributes(body))
}

/// Extracts the `href` of every anchor in document order
///
/// Anchors without an `href` attribute are skipped.
pub fn anchor_hrefs(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::to_string)
        .collect()
}
