/// URL state definitions for tracking crawl progress
///
/// A URL moves strictly forward through `Pending -> InFlight -> Completed`.
use std::fmt;

/// Which frontier set a URL currently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    /// Discovered and admitted, waiting for a permit
    Pending,

    /// Being fetched and processed
    InFlight,

    /// Terminal; the outcome is recorded alongside
    Completed,
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
            Self::Completed => "completed",
        };
        write!(f, "{}", s)
    }
}

/// How a completed URL ended
///
/// `Skipped` (non-200 or non-HTML response) is a handled no-op and counts
/// as success; only `Failed` (transport error) counts as failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Fetched as HTML and run through the extraction rules
    Processed,

    /// Fetched, but the response was not a 200 HTML page
    Skipped,

    /// The fetch itself failed
    Failed,
}

impl PageOutcome {
    /// The success flag recorded for the URL
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processed => "processed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
