/// Crawl state definitions for tracking URL progress
use std::fmt;

/// Represents the current state of a canonical URL in the crawl
///
/// A URL moves `Queued -> InFlight -> Completed | Failed`. The last two are
/// terminal: a URL that reached them is never fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Waiting in the queue
    Queued,

    /// Fetch dispatched, awaiting the response
    InFlight,

    /// Fetched and handled (tested, skipped as non-HTML, or redirected)
    Completed,

    /// Fetch failed or returned an unusable payload
    Failed,
}

impl CrawlState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Converts the state to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!CrawlState::Queued.is_terminal());
        assert!(!CrawlState::InFlight.is_terminal());
        assert!(CrawlState::Completed.is_terminal());
        assert!(CrawlState::Failed.is_terminal());
    }

    #[test]
    fn test_to_db_string() {
        assert_eq!(CrawlState::Queued.to_db_string(), "queued");
        assert_eq!(CrawlState::Failed.to_db_string(), "failed");
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlState::InFlight), "in_flight");
        assert_eq!(format!("{}", CrawlState::Completed), "completed");
    }
}
