//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::CrawlReport;
use crate::state::CrawlState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, TestResultRecord};
use crate::HarnessError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, crawl_id, started_at, finished_at, config_hash, status,
     pages_tested, tests_passed, tests_failed, elapsed_ms";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarnessError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarnessError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarnessError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        crawl_id: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?).unwrap_or(RunStatus::Failed),
        pages_tested: row.get::<_, i64>(6)? as u64,
        tests_passed: row.get::<_, i64>(7)? as u64,
        tests_failed: row.get::<_, i64>(8)? as u64,
        elapsed_ms: row.get::<_, i64>(9)? as u64,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, crawl_id: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (crawl_id, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![crawl_id, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Results =====

    fn save_report(&mut self, run_id: i64, report: &CrawlReport) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let updated = tx.execute(
            "UPDATE runs SET pages_tested = ?1, tests_passed = ?2, tests_failed = ?3, elapsed_ms = ?4
             WHERE id = ?5",
            params![
                report.pages_tested as i64,
                report.tests_passed as i64,
                report.tests_failed as i64,
                report.elapsed.as_millis() as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }

        {
            let mut insert_page = tx.prepare(
                "INSERT OR REPLACE INTO pages (run_id, url, state, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let finished = report
                .completed
                .iter()
                .map(|url| (url, CrawlState::Completed))
                .chain(report.failed.iter().map(|url| (url, CrawlState::Failed)));
            for (position, (url, state)) in finished.enumerate() {
                insert_page.execute(params![run_id, url, state.to_db_string(), position as i64])?;
            }

            let mut insert_link = tx.prepare(
                "INSERT OR IGNORE INTO links (run_id, target, source, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (target, sources) in report.links.iter() {
                for (position, source) in sources.iter().enumerate() {
                    insert_link.execute(params![run_id, target, source, position as i64])?;
                }
            }

            let mut insert_redirect = tx.prepare(
                "INSERT OR REPLACE INTO redirects (run_id, requested, served) VALUES (?1, ?2, ?3)",
            )?;
            for (requested, served) in &report.redirects {
                insert_redirect.execute(params![run_id, requested, served])?;
            }

            let mut insert_result = tx.prepare(
                "INSERT INTO test_results (run_id, test, result_column, url, value, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, (test, column, entry)) in report.results.iter().enumerate() {
                let value = serde_json::to_string(&entry.value)?;
                insert_result.execute(params![run_id, test, column, entry.url, value, position as i64])?;
            }
        }

        tx.commit()?;
        tracing::debug!(
            "Saved run {}: {} pages, {} link edges, {} redirects, {} test results",
            run_id,
            report.completed.len() + report.failed.len(),
            report.links.edge_count(),
            report.redirects.len(),
            report.results.len()
        );
        Ok(())
    }

    fn get_pages_by_state(&self, run_id: i64, state: CrawlState) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT url FROM pages WHERE run_id = ?1 AND state = ?2 ORDER BY position",
        )?;

        let urls = stmt
            .query_map(params![run_id, state.to_db_string()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    // ===== Statistics =====

    fn count_pages_by_state(&self, run_id: i64, state: CrawlState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE run_id = ?1 AND state = ?2",
            params![run_id, state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_links(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM links WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_link_sources(&self, run_id: i64, target: &str) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT source FROM links WHERE run_id = ?1 AND target = ?2 ORDER BY position",
        )?;

        let sources = stmt
            .query_map(params![run_id, target], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(sources)
    }

    fn get_most_linked(&self, run_id: i64, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let query = "
            SELECT target, COUNT(*) as count
            FROM links
            WHERE run_id = ?1
            GROUP BY target
            ORDER BY count DESC, target
            LIMIT ?2
        ";

        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt.query_map(params![run_id, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut targets = Vec::new();
        for row in rows {
            targets.push(row?);
        }

        Ok(targets)
    }

    fn get_redirects(&self, run_id: i64) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT requested, served FROM redirects WHERE run_id = ?1 ORDER BY requested",
        )?;

        let redirects = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;

        Ok(redirects)
    }

    fn get_test_results(&self, run_id: i64, test: &str) -> StorageResult<Vec<TestResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT test, result_column, url, value FROM test_results
             WHERE run_id = ?1 AND test = ?2 ORDER BY position",
        )?;

        let rows = stmt
            .query_map(params![run_id, test], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (test, column, url, value) in rows {
            records.push(TestResultRecord {
                test,
                column,
                url,
                value: serde_json::from_str(&value)?,
            });
        }

        Ok(records)
    }

    fn count_test_results(&self, run_id: i64) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT test, COUNT(*) FROM test_results WHERE run_id = ?1 GROUP BY test ORDER BY test",
        )?;

        let counts = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}
