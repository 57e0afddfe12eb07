//! Paged-Harvest: a rate-limit aware collection fetcher
//!
//! This crate fetches paginated collections from a rate-limited HTTP API and
//! stores each collection as one JSON document, retrying failed targets in
//! rounds until they succeed or the retry ceiling is reached.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Paged-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] output::LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised by the crawl orchestrator to its caller
///
/// Per-target failures never show up here; they are recorded in the
/// failure ledger instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("no credentials supplied: at least one token is required")]
    NoCredentials,

    #[error("len(destinations)={destinations} len(urls)={urls} -> destinations and urls must have same length")]
    LengthMismatch { destinations: usize, urls: usize },

    #[error("{list} must contain only strings")]
    NotString { list: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write ledger: {0}")]
    Ledger(#[from] output::LedgerError),
}

/// Result type alias for Paged-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlInput, CrawlReport, FetchStatus, Outcome, Target};
pub use output::{FailureLedger, LedgerEntry};
pub use state::FetchState;
pub use storage::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
