//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and response classification
//! - Bounding concurrent processing units
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod limiter;

pub use coordinator::{run_crawl, Coordinator, CrawlState};
pub use fetcher::{build_http_client, fetch_url, is_html, FetchError, FetchedPage};
pub use limiter::{Limiter, Permit};

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the record database
/// 2. Build the HTTP client
/// 3. Seed the frontier with the root URL
/// 4. Fetch, extract and follow links until nothing is left
/// 5. Flush the remaining records and return the summary
///
/// # Arguments
///
/// * `config` - A validated crawler configuration
pub async fn crawl(config: Config) -> Result<CrawlSummary, HarvestError> {
    run_crawl(config).await
}
