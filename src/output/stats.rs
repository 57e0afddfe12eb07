//! Per-round statistics and the end-of-run summary

use crate::crawler::{CrawlReport, FetchStatus, Outcome};
use std::fmt;

/// Tallies for one dispatch-and-collect round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStats {
    /// 1-based round number
    pub round: u32,

    /// Targets dispatched in this round
    pub attempted: usize,

    /// Targets that completed
    pub succeeded: usize,

    /// Targets carried into the next round (or the ledger)
    pub failed: usize,
}

impl RoundStats {
    /// Computes the tallies for a round from its outcomes
    pub fn from_outcomes(round: u32, outcomes: &[Outcome]) -> Self {
        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == FetchStatus::Success)
            .count();
        Self {
            round,
            attempted: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }
}

impl fmt::Display for RoundStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round {}: {} attempted, {} succeeded, {} failed",
            self.round, self.attempted, self.succeeded, self.failed
        )
    }
}

/// Prints the crawl summary in a human-readable format
pub fn print_report(report: &CrawlReport) {
    println!("\n=== Harvest Summary ===\n");
    println!("Targets:   {}", report.total_targets);
    println!("Rounds:    {}", report.rounds);
    println!("Completed: {}", report.succeeded());
    println!("Failed:    {}", report.ledger.len());

    if !report.ledger.is_empty() {
        println!("\nUnresolved targets:");
        for entry in report.ledger.entries() {
            println!("  - {} ({})", entry.url(), entry.reason());
        }
    }
}
