//! Crawler module for fetching and testing pages
//!
//! This module contains the core crawling logic, including:
//! - Fetching page data through the proxy
//! - HTML detection and link extraction
//! - Fetch scheduling with a concurrency cap
//! - Redirect tracking and the link graph
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod link_graph;
mod parser;
mod redirect;
mod scheduler;

pub use coordinator::{CrawlReport, Crawler};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, FieldData, Headers, ProxyFetcher};
pub use link_graph::LinkGraph;
pub use parser::{anchor_hrefs, is_html, parse_document, strip_src_attributes};
pub use redirect::RedirectResolver;
pub use scheduler::{FetchOutcome, FetchScheduler};

use crate::config::Config;
use crate::storage::{RunStatus, SqliteStorage, Storage};
use crate::{HarnessError, RegistrationError};
use std::path::Path;

/// Runs a complete crawl through the proxy and stores the results
///
/// This is the entry point used by the command line. It will:
/// 1. Open the database
/// 2. Build the proxy fetcher and the crawler
/// 3. Hand the crawler to `setup`, which registers tests and event handlers
/// 4. Record a new run and crawl the site
/// 5. Save the report and mark the run completed
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `setup` - Prepares the crawler before the run starts
///
/// # Returns
///
/// * `Ok((run_id, CrawlReport))` - Crawl completed and was saved
/// * `Err(HarnessError)` - Crawl or persistence failed
pub async fn crawl<S>(
    config: Config,
    config_hash: &str,
    setup: S,
) -> Result<(i64, CrawlReport), HarnessError>
where
    S: FnOnce(&mut Crawler) -> Result<(), RegistrationError>,
{
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let crawl_id = config.session.crawl_id.clone();

    let fetcher = ProxyFetcher::new(&config.proxy)?;
    let mut crawler = Crawler::new(config, fetcher)?;
    setup(&mut crawler)?;
    let run_id = storage.create_run(&crawl_id, config_hash)?;

    let report = match crawler.run().await {
        Ok(report) => report,
        Err(e) => {
            storage.update_run_status(run_id, RunStatus::Failed)?;
            return Err(e);
        }
    };

    storage.save_report(run_id, &report)?;
    storage.complete_run(run_id)?;

    Ok((run_id, report))
}
