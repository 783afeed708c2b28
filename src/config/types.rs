use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for a crawl session
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Session identity and URL admission rules
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Identifier of this crawl; required
    #[serde(rename = "crawl-id", default)]
    pub crawl_id: String,

    /// Host of the site under test; links to any other host are external
    pub site: String,

    /// Paths queued when the crawl starts
    #[serde(rename = "start-paths", default = "default_start_paths")]
    pub start_paths: Vec<String>,

    /// Regular expressions (case-insensitive) for URLs that must never be crawled
    #[serde(rename = "ignore-paths", default)]
    pub ignore_paths: Vec<String>,

    /// Device profile the proxy should emulate
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgent,
}

fn default_start_paths() -> Vec<String> {
    vec!["/".to_string()]
}

/// User agent profile forwarded to the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAgent {
    #[default]
    Desktop,
    Mobile,
}

impl UserAgent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Period of the scheduler timer (milliseconds)
    #[serde(rename = "loop-interval-ms", default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,

    /// Time allowed for a single proxy fetch (seconds)
    #[serde(rename = "fetch-timeout-secs", default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_max_concurrent_fetches() -> u32 {
    3
}

fn default_loop_interval_ms() -> u64 {
    1000
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

impl CrawlerConfig {
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            loop_interval_ms: default_loop_interval_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Page-data proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Endpoint returning page data as JSON, e.g. `https://example.com/seotest/getPageData`
    pub endpoint: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    "./crawl.db".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}
