//! Fetch scheduler for the crawl loop
//!
//! This module handles:
//! - Capping the number of fetches in flight
//! - Spawning fetches onto a `JoinSet`
//! - Enforcing the per-fetch deadline
//! - Handing finished fetches back to the coordinator
//!
//! The scheduler never touches crawl state. Every outcome travels back
//! through [`FetchScheduler::next_completed`] so all mutation stays on the
//! coordinating task.

use crate::config::{CrawlerConfig, UserAgent};
use crate::crawler::{FetchError, FetchedPage, Fetcher};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinSet};

/// Result of one finished fetch
#[derive(Debug)]
pub struct FetchOutcome {
    /// Canonical URL that was requested
    pub url: String,
    pub result: Result<FetchedPage, FetchError>,
}

/// Dispatches fetches and tracks the ones in flight
pub struct FetchScheduler {
    fetcher: Arc<dyn Fetcher>,
    user_agent: UserAgent,
    max_in_flight: usize,
    timeout: Duration,
    in_flight: JoinSet<FetchOutcome>,
    /// URL of every task still in `in_flight`
    urls: HashMap<Id, String>,
}

impl FetchScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Loads pages
    /// * `user_agent` - Profile forwarded with every fetch
    /// * `max_in_flight` - Cap on concurrent fetches (at least 1)
    /// * `timeout` - Deadline for a single fetch
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        user_agent: UserAgent,
        max_in_flight: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            user_agent,
            max_in_flight: max_in_flight.max(1),
            timeout,
            in_flight: JoinSet::new(),
            urls: HashMap::new(),
        }
    }

    /// Creates a scheduler from the crawler settings
    pub fn from_config(fetcher: Arc<dyn Fetcher>, user_agent: UserAgent, config: &CrawlerConfig) -> Self {
        Self::new(
            fetcher,
            user_agent,
            config.max_concurrent_fetches as usize,
            config.fetch_timeout(),
        )
    }

    /// Returns true if another fetch may start
    pub fn has_capacity(&self) -> bool {
        self.in_flight.len() < self.max_in_flight
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Starts fetching `url` in the background
    ///
    /// Callers check [`FetchScheduler::has_capacity`] first; the cap is not
    /// re-checked here.
    pub fn dispatch(&mut self, url: String) {
        let fetcher = Arc::clone(&self.fetcher);
        let user_agent = self.user_agent;
        let timeout = self.timeout;

        tracing::debug!("Dispatching fetch for {}", url);
        let requested = url.clone();
        let handle = self.in_flight.spawn(async move {
            let target = url.clone();
            let mut fetch = tokio::spawn(async move { fetcher.fetch(&target, user_agent).await });

            let result = match tokio::time::timeout(timeout, &mut fetch).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(FetchError::Task(join_error.to_string())),
                Err(_) => {
                    fetch.abort();
                    Err(FetchError::Timeout(timeout))
                }
            };

            FetchOutcome { url, result }
        });
        self.urls.insert(handle.id(), requested);
    }

    /// Waits for the next fetch to finish
    ///
    /// Returns `None` when nothing is in flight. A fetch task that was lost
    /// (aborted or panicked outside the fetcher) comes back as a
    /// [`FetchError::Task`] outcome for its URL. Cancel safe.
    pub async fn next_completed(&mut self) -> Option<FetchOutcome> {
        loop {
            match self.in_flight.join_next_with_id().await? {
                Ok((id, outcome)) => {
                    self.urls.remove(&id);
                    return Some(outcome);
                }
                Err(e) => {
                    let Some(url) = self.urls.remove(&e.id()) else {
                        tracing::error!("Unknown fetch task was lost: {}", e);
                        continue;
                    };
                    tracing::error!("Fetch task for {} was lost: {}", url, e);
                    return Some(FetchOutcome {
                        url,
                        result: Err(FetchError::Task(e.to_string())),
                    });
                }
            }
        }
    }
}
