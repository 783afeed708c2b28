//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::CrawlState;
use crate::storage::{RunRecord, Storage};
use crate::HarnessError;
use std::fmt::Write;

/// Number of most linked pages listed in the statistics
const MOST_LINKED_LIMIT: usize = 10;

/// Crawl statistics summary for one run
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub run: RunRecord,

    /// Pages fetched and handled
    pub completed: u64,

    /// Pages whose fetch failed
    pub failed: u64,

    /// Distinct link graph edges
    pub total_links: u64,

    /// Pages with the most distinct sources linking to them
    pub most_linked: Vec<(String, u64)>,

    /// Requested URL to served URL
    pub redirects: Vec<(String, String)>,

    /// Recorded values per test name
    pub test_results: Vec<(String, u64)>,
}

impl CrawlStatistics {
    pub fn total_pages(&self) -> u64 {
        self.completed + self.failed
    }

    /// Share of fetched pages that completed, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_pages() == 0 {
            0.0
        } else {
            self.completed as f64 / self.total_pages() as f64 * 100.0
        }
    }
}

/// Loads statistics for the most recent run
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(Some(CrawlStatistics))` - Statistics of the latest run
/// * `Ok(None)` - The database holds no runs yet
/// * `Err(HarnessError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<Option<CrawlStatistics>, HarnessError> {
    let Some(run) = storage.get_latest_run()? else {
        return Ok(None);
    };
    load_run_statistics(storage, run.id).map(Some)
}

/// Loads statistics for a specific run
pub fn load_run_statistics(
    storage: &dyn Storage,
    run_id: i64,
) -> Result<CrawlStatistics, HarnessError> {
    let run = storage.get_run(run_id)?;

    Ok(CrawlStatistics {
        completed: storage.count_pages_by_state(run_id, CrawlState::Completed)?,
        failed: storage.count_pages_by_state(run_id, CrawlState::Failed)?,
        total_links: storage.count_links(run_id)?,
        most_linked: storage.get_most_linked(run_id, MOST_LINKED_LIMIT)?,
        redirects: storage.get_redirects(run_id)?,
        test_results: storage.count_test_results(run_id)?,
        run,
    })
}

/// Formats statistics as a human readable report
pub fn render_statistics(stats: &CrawlStatistics) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    let run = &stats.run;

    writeln!(out, "=== Crawl Statistics ===\n")?;

    writeln!(out, "Run {} ({})", run.id, run.crawl_id)?;
    writeln!(out, "  Status: {}", run.status.to_db_string())?;
    writeln!(out, "  Started: {}", run.started_at)?;
    if let Some(finished) = &run.finished_at {
        writeln!(out, "  Finished: {}", finished)?;
    }
    writeln!(out, "  Elapsed: {:.1}s", run.elapsed_ms as f64 / 1000.0)?;
    writeln!(out)?;

    writeln!(out, "Pages:")?;
    writeln!(out, "  Completed: {}", stats.completed)?;
    writeln!(out, "  Failed: {}", stats.failed)?;
    writeln!(out, "  Tested: {}", run.pages_tested)?;
    writeln!(out)?;

    writeln!(out, "Tests:")?;
    writeln!(out, "  Passed: {}", run.tests_passed)?;
    writeln!(out, "  Failed: {}", run.tests_failed)?;
    for (test, count) in &stats.test_results {
        writeln!(out, "  {}: {} values recorded", test, count)?;
    }
    writeln!(out)?;

    writeln!(out, "Links: {}", stats.total_links)?;
    for (target, count) in &stats.most_linked {
        writeln!(out, "  {} <- {} pages", target, count)?;
    }
    writeln!(out)?;

    if !stats.redirects.is_empty() {
        writeln!(out, "Redirects ({}):", stats.redirects.len())?;
        for (requested, served) in &stats.redirects {
            writeln!(out, "  {} -> {}", requested, served)?;
        }
        writeln!(out)?;
    }

    write!(
        out,
        "Success Rate: {:.1}% ({} / {} pages completed)",
        stats.success_rate(),
        stats.completed,
        stats.total_pages()
    )?;

    Ok(out)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    match render_statistics(stats) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::error!("Failed to format statistics: {}", e),
    }
}
