//! Output module
//!
//! This module handles:
//! - Persisting extracted records through the batching sink
//! - Summarising a finished crawl for the operator

mod sink;
pub mod stats;

pub use sink::{PersistenceSink, SinkStats};
pub use stats::{print_summary, CrawlSummary};
