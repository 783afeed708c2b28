//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties everything together:
//! - Seeding the queue with the session's start paths
//! - Driving the fetch scheduler from a timer and from fetch completions
//! - Resolving redirects and harvesting links from HTML pages
//! - Running the registered page tests
//! - Publishing every step on the event bus
//!
//! The coordinator is the only owner of crawl state. Fetches run on other
//! tasks but report back here, and a page's document is parsed, harvested
//! and tested synchronously before the loop awaits again.

use crate::config::{validate, Config, CrawlerConfig, SessionConfig};
use crate::crawler::link_graph::LinkGraph;
use crate::crawler::parser::{anchor_hrefs, is_html, parse_document};
use crate::crawler::redirect::RedirectResolver;
use crate::crawler::scheduler::{FetchOutcome, FetchScheduler};
use crate::crawler::{FetchedPage, Fetcher};
use crate::events::{CrawlEvent, EventBus, EventKind, SessionSummary};
use crate::page_tests::{run_all, PageContext, PageTest, TestRegistry, TestResults};
use crate::state::CrawlQueue;
use crate::url::{canonicalize, is_anchor, UrlRules};
use crate::{HarnessError, RegistrationError};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// Everything a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub crawl_id: String,

    /// Completed URLs in completion order
    pub completed: Vec<String>,

    /// Failed URLs in failure order
    pub failed: Vec<String>,

    /// Requested URL to served URL
    pub redirects: BTreeMap<String, String>,

    pub links: LinkGraph,

    /// HTML pages the tests ran against
    pub pages_tested: usize,

    pub tests_passed: usize,
    pub tests_failed: usize,

    /// Values the tests recorded, keyed by test name and column
    pub results: TestResults,

    pub elapsed: Duration,
}

enum Step {
    Tick,
    Fetched(FetchOutcome),
}

/// Crawls one site and tests every HTML page it reaches
///
/// # Example
///
/// ```no_run
/// use crawl_harness::config::load_config;
/// use crawl_harness::page_tests::{PageContext, TestRecorder};
/// use crawl_harness::{Crawler, ProxyFetcher};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harness.toml"))?;
/// let fetcher = ProxyFetcher::new(&config.proxy)?;
///
/// let mut crawler = Crawler::new(config, fetcher)?;
/// crawler.add_test(
///     "title",
///     "Page title",
///     ["Title", "Words"],
///     |page: &PageContext<'_>, out: &mut TestRecorder<'_>| -> anyhow::Result<()> {
///         let selector = scraper::Selector::parse("title").unwrap();
///         let title = page.document.select(&selector).next();
///         anyhow::ensure!(title.is_some(), "missing <title>");
///         out.record("Title", title.map(|t| t.text().collect::<String>()))?;
///         out.record("Words", page.word_count())
///     },
/// )?;
///
/// let report = crawler.run().await?;
/// println!("{} pages completed", report.completed.len());
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    session: SessionConfig,
    settings: CrawlerConfig,
    queue: CrawlQueue,
    scheduler: FetchScheduler,
    links: LinkGraph,
    redirects: RedirectResolver,
    tests: TestRegistry,
    bus: EventBus,
    pages_tested: usize,
    tests_passed: usize,
    tests_failed: usize,
    results: TestResults,
}

impl Crawler {
    /// Creates a crawler for the given session
    ///
    /// # Arguments
    ///
    /// * `config` - The validated-on-entry crawl configuration
    /// * `fetcher` - Loads pages; usually a [`crate::ProxyFetcher`]
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to register tests and run
    /// * `Err(HarnessError)` - The configuration is invalid
    pub fn new<F: Fetcher>(config: Config, fetcher: F) -> Result<Self, HarnessError> {
        Self::with_shared_fetcher(config, Arc::new(fetcher))
    }

    /// Creates a crawler around a fetcher that is shared with the caller
    pub fn with_shared_fetcher(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, HarnessError> {
        validate(&config)?;

        let Config {
            session, crawler, ..
        } = config;
        let rules = UrlRules::from_session(&session)?;
        let scheduler = FetchScheduler::from_config(fetcher, session.user_agent, &crawler);

        Ok(Self {
            queue: CrawlQueue::new(rules),
            scheduler,
            session,
            settings: crawler,
            links: LinkGraph::new(),
            redirects: RedirectResolver::new(),
            tests: TestRegistry::new(),
            bus: EventBus::new(),
            pages_tested: 0,
            tests_passed: 0,
            tests_failed: 0,
            results: TestResults::new(),
        })
    }

    /// Registers a test, or a scaffold slot when `callback` is `None`
    pub fn register_test<I, S>(
        &mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        columns: I,
        callback: Option<Box<dyn PageTest>>,
    ) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tests.register(name, title, columns, callback)
    }

    /// Registers a test with a callback
    pub fn add_test<I, S, T>(
        &mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        columns: I,
        test: T,
    ) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: PageTest + 'static,
    {
        self.tests.add(name, title, columns, test)
    }

    pub fn tests(&self) -> &TestRegistry {
        &self.tests
    }

    /// Subscribes an observer to crawl events
    pub fn on<H>(&mut self, kind: EventKind, handler: H)
    where
        H: FnMut(&CrawlEvent<'_>) + Send + 'static,
    {
        self.bus.on(kind, handler);
    }

    /// Runs the crawl until every reachable page was fetched
    ///
    /// The scheduler runs on a timer (`loop-interval-ms`): each tick emits
    /// `CrawlerLoop` and starts at most one fetch. Each finished fetch is
    /// handled and immediately followed by another dispatch attempt.
    /// `AllCrawlsFinished` is emitted once, when nothing is queued or in
    /// flight, and ends the run.
    pub async fn run(mut self) -> Result<CrawlReport, HarnessError> {
        let started = Instant::now();
        let summary = self.session_summary();

        tracing::info!(
            "Starting crawl '{}' of {} ({} tests)",
            summary.crawl_id,
            summary.site,
            summary.tests.len()
        );

        self.bus.trigger(&CrawlEvent::BeforeInit(&summary));
        for path in &self.session.start_paths {
            if !self.queue.enqueue(path) {
                tracing::warn!("Start path {} is not eligible for crawling", path);
            }
        }
        self.bus.trigger(&CrawlEvent::AfterInit(&summary));

        let mut ticker = tokio::time::interval(self.settings.loop_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let busy = !self.scheduler.is_idle();
            let step = tokio::select! {
                _ = ticker.tick() => Step::Tick,
                Some(outcome) = self.scheduler.next_completed(), if busy => Step::Fetched(outcome),
            };

            match step {
                Step::Tick => {
                    self.bus.trigger(&CrawlEvent::CrawlerLoop(self.queue.snapshot()));
                    self.dispatch_next();
                }
                Step::Fetched(outcome) => {
                    self.handle_outcome(outcome)?;
                    self.dispatch_next();
                }
            }

            if self.queue.is_drained() {
                self.bus.trigger(&CrawlEvent::AllCrawlsFinished);
                break;
            }
        }

        let report = CrawlReport {
            crawl_id: self.session.crawl_id.clone(),
            completed: self.queue.completed().to_vec(),
            failed: self.queue.failed().to_vec(),
            redirects: self.redirects.records().clone(),
            links: self.links,
            pages_tested: self.pages_tested,
            tests_passed: self.tests_passed,
            tests_failed: self.tests_failed,
            results: self.results,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Crawl '{}' finished: {} completed, {} failed, {} redirects in {:?}",
            report.crawl_id,
            report.completed.len(),
            report.failed.len(),
            report.redirects.len(),
            report.elapsed
        );

        Ok(report)
    }

    fn session_summary(&self) -> SessionSummary {
        SessionSummary {
            crawl_id: self.session.crawl_id.clone(),
            site: self.session.site.clone(),
            start_paths: self.session.start_paths.clone(),
            user_agent: self.session.user_agent,
            tests: self
                .tests
                .runnable()
                .map(|(test, _)| test.name().to_string())
                .collect(),
        }
    }

    /// Starts one fetch if a URL is waiting and the cap allows it
    fn dispatch_next(&mut self) {
        if !self.scheduler.has_capacity() {
            return;
        }
        if let Some(url) = self.queue.dequeue() {
            self.scheduler.dispatch(url);
        }
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome) -> Result<(), HarnessError> {
        let FetchOutcome { url, result } = outcome;

        match result {
            Ok(page) => self.handle_page(&url, &page)?,
            Err(e) => self.fail(&url, &e.to_string())?,
        }

        self.bus.trigger(&CrawlEvent::CrawlFinished { url: &url });
        Ok(())
    }

    fn handle_page(&mut self, url: &str, page: &FetchedPage) -> Result<(), HarnessError> {
        let (Some(headers), Some(body)) = (page.headers.as_ref(), page.usable_body()) else {
            return self.fail(url, "response is missing headers or body");
        };

        let served = if page.url_fetched.trim().is_empty() {
            url.to_string()
        } else {
            canonicalize(&page.url_fetched)
        };

        if !self
            .redirects
            .check_fetched_url(url, &served, &mut self.queue)
        {
            self.bus.trigger(&CrawlEvent::FoundRedirect {
                requested: url,
                actual: &served,
            });
            return self.queue.mark_completed(url);
        }

        if !is_html(body) {
            tracing::debug!("Skipping tests for {}: not an HTML page", url);
            return self.queue.mark_completed(url);
        }

        let document = parse_document(body);
        self.harvest_links(url, &anchor_hrefs(&document));

        let context = PageContext {
            url,
            document: &document,
            headers,
            field_data: &page.field_data,
            phrases: &page.phrases,
        };
        let outcome = run_all(&self.tests, &context, &mut self.bus, &mut self.results);

        self.pages_tested += 1;
        self.tests_passed += outcome.passed;
        self.tests_failed += outcome.failed;

        tracing::debug!(
            "Tested {}: {} passed, {} failed",
            url,
            outcome.passed,
            outcome.failed
        );
        self.queue.mark_completed(url)
    }

    /// Queues the links found on `url` and records where they were found
    fn harvest_links(&mut self, url: &str, hrefs: &[String]) {
        for href in hrefs {
            let target = canonicalize(href);
            if !is_anchor(href, url) {
                self.queue.enqueue(href);
            }
            self.links.record(&target, url);
        }
    }

    fn fail(&mut self, url: &str, reason: &str) -> Result<(), HarnessError> {
        tracing::warn!("Failed to load {}: {}", url, reason);
        self.queue.mark_failed(url)?;
        self.bus.trigger(&CrawlEvent::LoadFailed { url, reason });
        Ok(())
    }
}
