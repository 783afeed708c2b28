//! Event bus for observing a crawl
//!
//! Observers subscribe to an [`EventKind`] and receive the matching
//! [`CrawlEvent`] synchronously, in subscription order, while the crawl runs.

mod bus;
mod event;

pub use bus::{EventBus, Handler};
pub use event::{CrawlEvent, EventKind, SessionSummary};
