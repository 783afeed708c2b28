//! Configuration module for crawl-harness
//!
//! This module handles loading, parsing, and validating the TOML session file.
//! A crawl session is fixed once loaded: the crawler takes it by value and
//! offers no way to change it mid-crawl.
//!
//! # Example
//!
//! ```no_run
//! use crawl_harness::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harness.toml")).unwrap();
//! println!("Crawl id: {}", config.session.crawl_id);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, ProxyConfig, SessionConfig, UserAgent};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
