//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CrawlReport;
use crate::state::CrawlState;
use crate::storage::{RunRecord, RunStatus, TestResultRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored test result is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
    ///
    /// # Arguments
    ///
    /// * `crawl_id` - Identifier of the crawl session
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, crawl_id: &str, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Results =====

    /// Persists everything a finished crawl produced
    ///
    /// Writes page states, links, redirects, test totals and recorded test
    /// values in one transaction.
    fn save_report(&mut self, run_id: i64, report: &CrawlReport) -> StorageResult<()>;

    /// URLs of a run in the given state, in the order they finished
    fn get_pages_by_state(&self, run_id: i64, state: CrawlState) -> StorageResult<Vec<String>>;

    // ===== Statistics =====

    /// Counts pages of a run in a specific state
    fn count_pages_by_state(&self, run_id: i64, state: CrawlState) -> StorageResult<u64>;

    /// Counts link graph edges of a run
    fn count_links(&self, run_id: i64) -> StorageResult<u64>;

    /// Pages linking to `target`, in discovery order
    fn get_link_sources(&self, run_id: i64, target: &str) -> StorageResult<Vec<String>>;

    /// Targets with the most distinct sources, most linked first
    fn get_most_linked(&self, run_id: i64, limit: usize) -> StorageResult<Vec<(String, u64)>>;

    /// Redirect records of a run, sorted by requested URL
    fn get_redirects(&self, run_id: i64) -> StorageResult<Vec<(String, String)>>;

    /// Values recorded by one test, by column then recording order
    fn get_test_results(&self, run_id: i64, test: &str) -> StorageResult<Vec<TestResultRecord>>;

    /// Number of recorded values per test, sorted by test name
    fn count_test_results(&self, run_id: i64) -> StorageResult<Vec<(String, u64)>>;
}
