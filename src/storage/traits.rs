//! Storage traits and error types
//!
//! This module defines the trait interface for artifact backends and
//! associated error types.

use serde_json::Value;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact path has no file name: {0}")]
    InvalidPath(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for artifact backend implementations
///
/// The worker consults `exists` before touching the network and calls
/// `persist` exactly once per successful target. Implementations are shared
/// across concurrent workers, each of which writes a distinct path.
pub trait ArtifactStore: Send + Sync {
    /// Returns true if an artifact is already stored at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Stores the complete accumulated collection at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Destination of the artifact
    /// * `items` - Every element gathered across all pages, in page order
    fn persist(&self, path: &Path, items: &[Value]) -> StorageResult<()>;
}
