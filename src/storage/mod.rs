//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the harness, including:
//! - SQLite database initialization and schema management
//! - Run tracking, keyed by crawl id and configuration hash
//! - Final page states, the link graph, redirect records and test results of each run

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

/// One value a page test recorded during a run
#[derive(Debug, Clone, PartialEq)]
pub struct TestResultRecord {
    pub test: String,
    pub column: String,
    pub url: String,
    pub value: serde_json::Value,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub crawl_id: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_tested: u64,
    pub tests_passed: u64,
    pub tests_failed: u64,
    pub elapsed_ms: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
