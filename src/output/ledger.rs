//! Failure ledger persisted at the end of a crawl
//!
//! The ledger is a JSON array of `[url, failure_description]` pairs, one per
//! target that was still failing after its last attempted round.

use crate::crawler::{FetchStatus, Outcome};
use crate::storage::encode_spaced;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing or reading a ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed ledger: {0}")]
    Format(#[from] serde_json::Error),
}

/// One unresolved target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry(pub String, pub String);

impl LedgerEntry {
    pub fn url(&self) -> &str {
        &self.0
    }

    pub fn reason(&self) -> &str {
        &self.1
    }
}

/// Ordered record of targets left unresolved by the final round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureLedger {
    entries: Vec<LedgerEntry>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the ledger from one round's outcomes, keeping failures only
    ///
    /// Callers pass the last round's outcomes; earlier rounds never
    /// contribute entries.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let entries = outcomes
            .into_iter()
            .filter_map(|outcome| match &outcome.status {
                FetchStatus::Success => None,
                FetchStatus::Failed(reason) => {
                    Some(LedgerEntry(outcome.url.clone(), reason.clone()))
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the ledger to `path` on one line, replacing any previous ledger
    pub async fn write(&self, path: &Path) -> Result<(), LedgerError> {
        let json = encode_spaced(&self.entries)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Reads a ledger written by an earlier run
    pub fn read(path: &Path) -> Result<Self, LedgerError> {
        let content = std::fs::read_to_string(path)?;
        let entries: Vec<LedgerEntry> = serde_json::from_str(&content)?;
        Ok(Self { entries })
    }
}
