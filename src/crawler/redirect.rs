use crate::state::CrawlQueue;
use std::collections::BTreeMap;

/// Tracks pages the proxy served under a different URL than requested
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectResolver {
    redirects: BTreeMap<String, String>,
}

impl RedirectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares the requested URL with the one actually served
    ///
    /// Both URLs must already be canonical. On a mismatch the redirect is
    /// recorded (replacing any earlier record for `target`) and `actual` is
    /// offered to the queue, which silently ignores it when ineligible.
    ///
    /// # Returns
    ///
    /// * `true` - The page was served under the requested URL
    /// * `false` - A redirect was recorded
    pub fn check_fetched_url(&mut self, target: &str, actual: &str, queue: &mut CrawlQueue) -> bool {
        if target == actual {
            return true;
        }

        tracing::debug!("Redirect {} -> {}", target, actual);
        self.redirects.insert(target.to_string(), actual.to_string());
        queue.enqueue(actual);
        false
    }

    pub fn get(&self, requested: &str) -> Option<&str> {
        self.redirects.get(requested).map(String::as_str)
    }

    pub fn records(&self) -> &BTreeMap<String, String> {
        &self.redirects
    }

    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }
}
