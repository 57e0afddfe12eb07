use crate::storage::traits::{ArtifactStore, StorageResult};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory artifact store
///
/// Used to exercise the worker and orchestrator without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<HashMap<PathBuf, Vec<Value>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `path` as already present, as if left by an earlier run
    pub fn insert_existing(&self, path: impl Into<PathBuf>, items: Vec<Value>) {
        self.lock().insert(path.into(), items);
    }

    /// Returns a copy of the artifact stored at `path`
    pub fn get(&self, path: &Path) -> Option<Vec<Value>> {
        self.lock().get(path).cloned()
    }

    /// Number of stored artifacts
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<Value>>> {
        // A poisoned map still holds complete artifacts
        self.artifacts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn persist(&self, path: &Path, items: &[Value]) -> StorageResult<()> {
        self.lock().insert(path.to_path_buf(), items.to_vec());
        Ok(())
    }
}
