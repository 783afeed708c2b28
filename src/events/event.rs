use crate::config::UserAgent;
use crate::page_tests::PageContext;
use crate::state::QueueSnapshot;

/// Session details published when the crawl starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub crawl_id: String,
    pub site: String,
    pub start_paths: Vec<String>,
    pub user_agent: UserAgent,
    /// Names of the registered tests that will run, in order
    pub tests: Vec<String>,
}

/// Subscription key for the event bus
///
/// Per-test events are keyed by the test name so an observer can follow a
/// single test.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeInit,
    AfterInit,
    FoundRedirect,
    BeforeTests,
    AfterTests,
    BeforeTest(String),
    AfterTest(String),
    TestFailed,
    CrawlFinished,
    AllCrawlsFinished,
    LoadFailed,
    CrawlerLoop,
}

/// An event raised by the crawler, borrowing its payload from the caller
#[derive(Debug, Clone, Copy)]
pub enum CrawlEvent<'a> {
    BeforeInit(&'a SessionSummary),
    AfterInit(&'a SessionSummary),

    /// The proxy served a different page than the one requested
    FoundRedirect { requested: &'a str, actual: &'a str },

    BeforeTests { url: &'a str },
    AfterTests { url: &'a str },
    BeforeTest { name: &'a str, page: &'a PageContext<'a> },
    AfterTest { name: &'a str, page: &'a PageContext<'a> },

    /// A test returned an error or panicked
    TestFailed {
        name: &'a str,
        url: &'a str,
        error: &'a str,
    },

    /// One fetch finished, whatever its outcome
    CrawlFinished { url: &'a str },

    /// The queue is drained and nothing is in flight; raised once per crawl
    AllCrawlsFinished,

    LoadFailed { url: &'a str, reason: &'a str },

    /// Raised on every timer tick of the scheduler
    CrawlerLoop(QueueSnapshot),
}

impl CrawlEvent<'_> {
    /// Returns the subscription key this event is delivered to
    pub fn kind(&self) -> EventKind {
        match self {
            Self::BeforeInit(_) => EventKind::BeforeInit,
            Self::AfterInit(_) => EventKind::AfterInit,
            Self::FoundRedirect { .. } => EventKind::FoundRedirect,
            Self::BeforeTests { .. } => EventKind::BeforeTests,
            Self::AfterTests { .. } => EventKind::AfterTests,
            Self::BeforeTest { name, .. } => EventKind::BeforeTest(name.to_string()),
            Self::AfterTest { name, .. } => EventKind::AfterTest(name.to_string()),
            Self::TestFailed { .. } => EventKind::TestFailed,
            Self::CrawlFinished { .. } => EventKind::CrawlFinished,
            Self::AllCrawlsFinished => EventKind::AllCrawlsFinished,
            Self::LoadFailed { .. } => EventKind::LoadFailed,
            Self::CrawlerLoop(_) => EventKind::CrawlerLoop,
        }
    }

    /// URL the event refers to, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::FoundRedirect { requested, .. } => Some(*requested),
            Self::BeforeTests { url }
            | Self::AfterTests { url }
            | Self::TestFailed { url, .. }
            | Self::CrawlFinished { url }
            | Self::LoadFailed { url, .. } => Some(*url),
            Self::BeforeTest { page, .. } | Self::AfterTest { page, .. } => Some(page.url),
            Self::BeforeInit(_)
            | Self::AfterInit(_)
            | Self::AllCrawlsFinished
            | Self::CrawlerLoop(_) => None,
        }
    }
}
