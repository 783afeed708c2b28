//! crawl-harness: a site crawling test harness
//!
//! This crate discovers the pages of a site by following hyperlinks, fetches each
//! page through a proxy endpoint, and runs registered page tests against the
//! markup, headers and metadata of every HTML page it reaches.

pub mod config;
pub mod crawler;
pub mod events;
pub mod output;
pub mod page_tests;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl-harness operations
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Test registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Invalid state transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: Option<state::CrawlState>,
        to: state::CrawlState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("crawl-id must be specified")]
    MissingCrawlId,

    #[error("Invalid ignore pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Errors raised while registering page tests
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Invalid name specified for your test")]
    EmptyName,

    #[error("A test named '{0}' is already registered")]
    DuplicateName(String),

    #[error("Title not specified for test '{0}'")]
    EmptyTitle(String),

    #[error("Result columns for test '{0}' are empty")]
    NoColumns(String),
}

/// Result type alias for crawl-harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Crawler, Fetcher, ProxyFetcher};
pub use events::{CrawlEvent, EventBus, EventKind};
pub use page_tests::{PageContext, PageTest, TestRecorder, TestRegistry, TestResults};
pub use state::{CrawlQueue, CrawlState};
pub use crate::url::{canonicalize, eligible_for_crawl, UrlRules};
