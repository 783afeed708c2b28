//! crawl-harness main entry point
//!
//! This is the command-line interface for the crawl-harness site tester.

use anyhow::Context;
use clap::Parser;
use crawl_harness::config::{load_config_with_hash, Config};
use crawl_harness::crawler::crawl;
use crawl_harness::output::{load_statistics, print_statistics};
use crawl_harness::storage::SqliteStorage;
use crawl_harness::{CrawlEvent, EventKind};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// crawl-harness: crawl a site through a proxy and test every page
///
/// The harness discovers pages by following links from the configured start
/// paths, fetches them through the page-data proxy, and stores the crawl
/// results (page states, link graph, redirects) in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "crawl-harness")]
#[command(version)]
#[command(about = "Crawl a site and run page tests against it", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the session without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics of the latest run from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_harness=info,warn"),
            1 => EnvFilter::new("crawl_harness=debug,info"),
            2 => EnvFilter::new("crawl_harness=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the session that would be crawled
fn handle_dry_run(config: &Config) {
    let session = &config.session;

    println!("=== crawl-harness Dry Run ===\n");

    println!("Session:");
    println!("  Crawl id: {}", session.crawl_id);
    println!("  Site: {}", session.site);
    println!("  User agent: {}", session.user_agent);

    println!("\nStart paths ({}):", session.start_paths.len());
    for path in &session.start_paths {
        println!("  - {}", path);
    }

    println!("\nIgnore patterns ({}):", session.ignore_paths.len());
    for pattern in &session.ignore_paths {
        println!("  - {}", pattern);
    }

    println!("\nCrawler:");
    println!("  Max concurrent fetches: {}", config.crawler.max_concurrent_fetches);
    println!("  Loop interval: {}ms", config.crawler.loop_interval_ms);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);

    println!("\nProxy: {}", config.proxy.endpoint);
    println!("Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;

    match load_statistics(&storage)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No crawl runs found in database"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} from {} start paths ({} ignore patterns)",
        config.session.site,
        config.session.start_paths.len(),
        config.session.ignore_paths.len()
    );

    let (run_id, report) = crawl(config, config_hash, |crawler| {
        crawler.on(EventKind::CrawlerLoop, |event| {
            if let CrawlEvent::CrawlerLoop(queue) = event {
                tracing::debug!(
                    "Queue: {} queued, {} in flight, {} completed, {} failed",
                    queue.queued,
                    queue.in_flight,
                    queue.completed,
                    queue.failed
                );
            }
        });
        Ok(())
    })
    .await
    .context("Crawl failed")?;

    tracing::info!(
        "Run {} saved: {} completed, {} failed, {} link targets, {} redirects, {} test results",
        run_id,
        report.completed.len(),
        report.failed.len(),
        report.links.len(),
        report.redirects.len(),
        report.results.len()
    );

    Ok(())
}
