use crate::storage::traits::{ArtifactStore, StorageError, StorageResult};
use crate::storage::encode_artifact;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Artifact store writing one JSON file per target
#[derive(Debug, Clone, Default)]
pub struct FsArtifactStore {
    pretty: bool,
}

impl FsArtifactStore {
    /// Creates a store; `pretty` selects indented output
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Sibling path used while the artifact is being written
    fn staging_path(path: &Path) -> StorageResult<PathBuf> {
        let file_name = path
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
        let mut staged = file_name.to_os_string();
        staged.push(".part");
        Ok(path.with_file_name(staged))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn persist(&self, path: &Path, items: &[Value]) -> StorageResult<()> {
        let bytes = encode_artifact(items, self.pretty)?;

        // Readers never observe a half-written artifact
        let staged = Self::staging_path(path)?;
        std::fs::write(&staged, bytes)?;
        if let Err(e) = std::fs::rename(&staged, path) {
            let _ = std::fs::remove_file(&staged);
            return Err(e.into());
        }
        Ok(())
    }
}
