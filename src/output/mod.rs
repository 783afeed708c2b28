//! Output module for reporting crawl results
//!
//! Results are persisted by the storage layer; this module reads them back
//! and formats run statistics for the command line.

pub mod stats;

pub use stats::{load_run_statistics, load_statistics, print_statistics, render_statistics, CrawlStatistics};
