//! Crawler module for fetching paginated collections
//!
//! This module contains the core crawling logic, including:
//! - Input validation and target construction
//! - HTTP page requests with rate-limit and pagination headers
//! - The per-target fetch worker and its pagination state machine
//! - Bounded fan-out of a round to concurrent workers
//! - Round-based retry coordination and the failure ledger

mod coordinator;
mod fetcher;
mod scheduler;
mod target;
mod worker;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{
    build_http_client, has_last_relation, page_url, request_page, FetchError, FetchSettings,
    PageResponse,
};
pub use scheduler::dispatch_round;
pub use target::{artifact_path, CrawlInput, CredentialPool, Target, ValidatedInput};
pub use worker::{AccumulatedResult, FetchStatus, FetchWorker, Outcome};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and filesystem artifact store
/// 2. Validate the configured targets and credentials
/// 3. Run retry rounds until every target succeeds or the limit is reached
/// 4. Write the failure ledger
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran to completion
/// * `Err(HarvestError)` - Invalid input or unrecoverable I/O failure
pub async fn crawl(config: &Config) -> Result<CrawlReport, HarvestError> {
    run_crawl(config).await
}
