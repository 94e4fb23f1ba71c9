//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: which frontier set a URL is in (pending, in flight, completed)
//! - `PageOutcome`: how a completed URL ended
//! - `Frontier`: the shared, mutex-guarded crawl state and its admission logic

mod frontier;
mod url_state;

// Re-export main types
pub use frontier::{Admission, Frontier, FrontierCounts, WorkItem};
pub use url_state::{PageOutcome, UrlState};
