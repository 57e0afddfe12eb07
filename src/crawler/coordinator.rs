//! Crawl coordinator - round-based retry orchestration
//!
//! This module contains the main crawl loop:
//! - Validating caller input before any side effect
//! - Building targets and preparing the output directory
//! - Dispatching rounds over a shrinking working set of failed targets
//! - Writing the failure ledger from the last round

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchSettings};
use crate::crawler::scheduler::dispatch_round;
use crate::crawler::target::CrawlInput;
use crate::crawler::worker::{FetchWorker, Outcome};
use crate::crawler::Target;
use crate::output::{FailureLedger, RoundStats};
use crate::storage::{ArtifactStore, FsArtifactStore};
use crate::{CrawlError, HarvestError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Summary of a finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Rounds actually dispatched
    pub rounds: u32,

    /// Targets in the caller's input
    pub total_targets: usize,

    /// Targets still failing after their last round
    pub ledger: FailureLedger,
}

impl CrawlReport {
    /// Targets whose artifact exists at the end of the run
    pub fn succeeded(&self) -> usize {
        self.total_targets - self.ledger.len()
    }

    pub fn is_complete(&self) -> bool {
        self.ledger.is_empty()
    }
}

/// Main crawl coordinator structure
pub struct Coordinator {
    worker: FetchWorker,
    max_retries: u32,
    concurrency: usize,
    output_dir: PathBuf,
    log_path: PathBuf,
}

impl Coordinator {
    /// Creates a coordinator writing artifacts to the filesystem
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.crawler)?;
        let store = Arc::new(FsArtifactStore::new(config.output.pretty_json));
        let worker = FetchWorker::new(client, FetchSettings::from(&config.api), store);

        Ok(Self {
            worker,
            max_retries: config.crawler.max_retries,
            concurrency: config.crawler.concurrency as usize,
            output_dir: PathBuf::from(&config.output.directory),
            log_path: PathBuf::from(&config.output.log_path),
        })
    }

    /// Replaces the artifact store used by every worker
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.worker = self.worker.with_store(store);
        self
    }

    /// Runs the crawl over `input`
    ///
    /// # Flow
    ///
    /// 1. Validate the input (no side effects on failure)
    /// 2. Return an empty report for empty lists without touching the disk
    /// 3. Create the output directory and build targets
    /// 4. Run up to `max_retries` rounds, each over the previous round's failures
    /// 5. Write the ledger from the last round's outcomes
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl ran; unresolved targets are in the ledger
    /// * `Err(CrawlError)` - Invalid input, or the directory/ledger could not be written
    pub async fn crawl(&self, input: &CrawlInput) -> Result<CrawlReport, CrawlError> {
        let validated = input.validate()?;
        if validated.is_empty() {
            tracing::info!("No targets supplied, nothing to crawl");
            return Ok(CrawlReport::default());
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let targets = validated.into_targets(&self.output_dir);
        let total_targets = targets.len();
        let start_time = Instant::now();

        let (rounds, last_outcomes) = self.run_rounds(targets).await;

        let ledger = FailureLedger::from_outcomes(&last_outcomes);
        ledger.write(&self.log_path).await?;

        if ledger.is_empty() {
            tracing::info!(
                "Crawl completed: {} targets in {} rounds ({:?})",
                total_targets,
                rounds,
                start_time.elapsed()
            );
        } else {
            tracing::warn!(
                "Crawl finished with {} of {} targets unresolved after {} rounds; see {}",
                ledger.len(),
                total_targets,
                rounds,
                self.log_path.display()
            );
        }

        Ok(CrawlReport {
            rounds,
            total_targets,
            ledger,
        })
    }

    /// Retry loop over a shrinking working set
    ///
    /// Returns the number of rounds dispatched and the outcomes of the last one.
    async fn run_rounds(&self, targets: Vec<Target>) -> (u32, Vec<Outcome>) {
        let max_rounds = self.max_retries.max(1);
        let mut working_set = targets;
        let mut last_outcomes = Vec::new();
        let mut rounds = 0;

        while rounds < max_rounds && !working_set.is_empty() {
            rounds += 1;
            tracing::info!(
                "Round {}/{}: crawling {} targets",
                rounds,
                max_rounds,
                working_set.len()
            );

            let outcomes = dispatch_round(&self.worker, &working_set, self.concurrency).await;
            tracing::info!("{}", RoundStats::from_outcomes(rounds, &outcomes));

            // Failed targets are retried verbatim in the next round
            working_set = working_set
                .into_iter()
                .zip(&outcomes)
                .filter(|(_, outcome)| !outcome.is_success())
                .map(|(target, _)| target)
                .collect();
            last_outcomes = outcomes;
        }

        (rounds, last_outcomes)
    }
}

/// Runs a complete crawl described by `config`
///
/// Targets and credentials are taken from the configuration itself.
pub async fn run_crawl(config: &Config) -> Result<CrawlReport, HarvestError> {
    let coordinator = Coordinator::new(config)?;
    let input = CrawlInput::from_config(config);
    Ok(coordinator.crawl(&input).await?)
}
