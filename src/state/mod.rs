//! State module for tracking crawl progress
//!
//! This module owns the per-URL crawl states and the queue of URLs waiting to
//! be fetched.
//!
//! # Components
//!
//! - `CrawlState`: The state of a single canonical URL (queued, in flight, completed, failed)
//! - `CrawlQueue`: The queue plus state tracker that enforces the no-duplicate invariants

mod crawl_state;
mod queue;

// Re-export main types
pub use crawl_state::CrawlState;
pub use queue::{CrawlQueue, QueueSnapshot};
