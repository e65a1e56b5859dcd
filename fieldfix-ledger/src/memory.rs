use crate::store::{Blob, BlobStore, PutOutcome, StoreError, VersionToken};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory store for embedding and tests. Versions are a per-store counter.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    blobs: BTreeMap<String, Blob>,
    counter: u64,
}

impl MemoryState {
    fn next_version(&mut self) -> VersionToken {
        self.counter += 1;
        VersionToken::new(format!("v{}", self.counter))
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Unconditional write, bypassing version checks.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) -> VersionToken {
        let mut state = self.lock();
        let version = state.next_version();
        state.blobs.insert(
            path.to_string(),
            Blob {
                content: content.into(),
                version: version.clone(),
            },
        );
        version
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(path).map(|b| b.content.clone())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn check_access(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        Ok(self.lock().blobs.get(path).cloned())
    }

    fn put_blob(&self, path: &str, content: &[u8], version: Option<&VersionToken>) -> PutOutcome {
        let mut state = self.lock();
        let current = state.blobs.get(path).map(|b| &b.version);
        if current != version {
            return PutOutcome::Conflict;
        }
        let version = state.next_version();
        state.blobs.insert(
            path.to_string(),
            Blob {
                content: content.to_vec(),
                version: version.clone(),
            },
        );
        PutOutcome::Success {
            version: Some(version),
        }
    }

    fn list_blobs(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().blobs.keys().cloned().collect())
    }
}
