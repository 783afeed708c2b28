use crate::state::CrawlState;
use crate::url::{canonicalize, eligible_for_crawl, UrlRules};
use crate::HarnessError;
use std::collections::HashMap;

/// Counts of URLs per crawl state at one moment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub queued: usize,
    pub in_flight: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Crawl queue and per-URL state tracker
///
/// Every canonical URL known to the crawl has exactly one `CrawlState`, and
/// the queue holds each URL at most once. Admission goes through
/// [`eligible_for_crawl`] only.
///
/// URLs are popped in LIFO (stack) order, so the crawl goes depth-first
/// through the most recently discovered links.
#[derive(Debug)]
pub struct CrawlQueue {
    rules: UrlRules,
    states: HashMap<String, CrawlState>,
    queue: Vec<String>,
    in_flight: usize,
    completed: Vec<String>,
    failed: Vec<String>,
}

impl CrawlQueue {
    pub fn new(rules: UrlRules) -> Self {
        Self {
            rules,
            states: HashMap::new(),
            queue: Vec::new(),
            in_flight: 0,
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn rules(&self) -> &UrlRules {
        &self.rules
    }

    /// Adds a URL to the queue if it is eligible for crawling
    ///
    /// # Returns
    ///
    /// * `true` - The canonical URL was queued
    /// * `false` - The URL was ineligible or already known; nothing changed
    pub fn enqueue(&mut self, url: &str) -> bool {
        let states = &self.states;
        if !eligible_for_crawl(url, &self.rules, |candidate| states.contains_key(candidate)) {
            return false;
        }

        let canonical = canonicalize(url);
        tracing::debug!("Queued {}", canonical);
        self.states.insert(canonical.clone(), CrawlState::Queued);
        self.queue.push(canonical);
        true
    }

    /// Pops the next URL and moves it to `InFlight`
    pub fn dequeue(&mut self) -> Option<String> {
        let url = self.queue.pop()?;
        self.states.insert(url.clone(), CrawlState::InFlight);
        self.in_flight += 1;
        Some(url)
    }

    /// Moves an in-flight URL to `Completed`
    pub fn mark_completed(&mut self, url: &str) -> Result<(), HarnessError> {
        self.finish(url, CrawlState::Completed)
    }

    /// Moves an in-flight URL to `Failed`
    pub fn mark_failed(&mut self, url: &str) -> Result<(), HarnessError> {
        self.finish(url, CrawlState::Failed)
    }

    fn finish(&mut self, url: &str, to: CrawlState) -> Result<(), HarnessError> {
        match self.states.get(url).copied() {
            Some(CrawlState::InFlight) if to.is_terminal() => {}
            from => {
                return Err(HarnessError::InvalidTransition {
                    url: url.to_string(),
                    from,
                    to,
                })
            }
        }

        self.states.insert(url.to_string(), to);
        self.in_flight -= 1;
        match to {
            CrawlState::Completed => self.completed.push(url.to_string()),
            CrawlState::Failed => self.failed.push(url.to_string()),
            CrawlState::Queued | CrawlState::InFlight => {}
        }
        Ok(())
    }

    /// Returns true when nothing is queued and nothing is in flight
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }

    pub fn state_of(&self, url: &str) -> Option<CrawlState> {
        self.states.get(url).copied()
    }

    pub fn is_tracked(&self, url: &str) -> bool {
        self.states.contains_key(url)
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight
    }

    /// Completed URLs in completion order
    pub fn completed(&self) -> &[String] {
        &self.completed
    }

    /// Failed URLs in failure order
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            queued: self.queue.len(),
            in_flight: self.in_flight,
            completed: self.completed.len(),
            failed: self.failed.len(),
        }
    }
}
