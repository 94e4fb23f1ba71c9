//! End-of-run crawl summary
//!
//! Completed and successful counts are reported separately so an operator
//! can see the failure rate; per-URL detail lives only in the logs.

use crate::output::SinkStats;
use crate::state::FrontierCounts;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Frontier set sizes when the crawl stopped
    pub frontier: FrontierCounts,

    /// What the persistence sink wrote
    pub records: SinkStats,

    /// Records dropped for missing required fields
    pub records_incomplete: u64,

    /// True if the crawl stopped on a cancellation signal rather than quiescence
    pub interrupted: bool,

    /// Wall-clock duration of the crawl
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Share of completed URLs that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        if self.frontier.completed == 0 {
            0.0
        } else {
            (self.frontier.succeeded as f64 / self.frontier.completed as f64) * 100.0
        }
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    let frontier = &summary.frontier;

    println!("=== Crawl Summary ===\n");

    if summary.interrupted {
        println!("Crawl was interrupted before the frontier drained.\n");
    }

    println!("Frontier:");
    println!("  pending: {}", frontier.pending);
    println!("  in flight: {}", frontier.in_flight);
    println!(
        "  completed: {} ; ok: {}",
        frontier.completed, frontier.succeeded
    );
    println!();

    println!("Outcomes:");
    println!("  processed: {}", frontier.processed);
    println!("  skipped (non-200 or non-HTML): {}", frontier.skipped);
    println!("  failed: {}", frontier.failed);
    println!();

    println!("Records:");
    println!("  saved: {}", summary.records.saved);
    println!("  rejected by storage: {}", summary.records.failed);
    println!("  missing required fields: {}", summary.records_incomplete);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} completed) in {:.1}s",
        summary.success_rate(),
        frontier.succeeded,
        frontier.completed,
        summary.elapsed.as_secs_f64()
    );
}
