//! Output module for crawl results
//!
//! This module handles:
//! - The failure ledger written at the end of every crawl
//! - Per-round statistics and the printed summary

mod ledger;
pub mod stats;

pub use ledger::{FailureLedger, LedgerEntry, LedgerError};
pub use stats::{print_report, RoundStats};
