use crate::store::{Blob, BlobStore, PutOutcome, StoreError, VersionToken};
use anyhow::Context;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use fs_err as fs;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Blobs as files under a root directory; the version token is the sha256 of the content.
#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: Utf8PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<Utf8PathBuf, StoreError> {
        let rel = Utf8Path::new(path);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
        if escapes {
            return Err(StoreError::Configuration(format!(
                "blob path '{}' must be relative to the store root",
                path
            )));
        }
        Ok(self.root.join(rel))
    }

    fn write_atomic(&self, abs: &Utf8Path, content: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create parent dir for {}", abs))?;
        }
        let tmp = Utf8PathBuf::from(format!("{}.tmp", abs));
        fs::write(&tmp, content).with_context(|| format!("write {}", tmp))?;
        fs::rename(&tmp, abs).with_context(|| format!("rename {} -> {}", tmp, abs))?;
        Ok(())
    }
}

pub(crate) fn content_version(content: &[u8]) -> VersionToken {
    VersionToken::new(hex::encode(Sha256::digest(content)))
}

impl BlobStore for DirBlobStore {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn check_access(&self) -> Result<(), StoreError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Configuration(format!(
                "store directory {} does not exist",
                self.root
            )))
        }
    }

    fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let abs = self.resolve(path)?;
        if !abs.is_file() {
            debug!(path = %abs, "blob not found");
            return Ok(None);
        }
        let content = fs::read(&abs).map_err(|e| StoreError::Transient {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let version = content_version(&content);
        Ok(Some(Blob { content, version }))
    }

    fn put_blob(&self, path: &str, content: &[u8], version: Option<&VersionToken>) -> PutOutcome {
        let abs = match self.resolve(path) {
            Ok(abs) => abs,
            Err(e) => {
                return PutOutcome::Failure {
                    reason: e.to_string(),
                };
            }
        };
        let current = if abs.is_file() {
            match fs::read(&abs) {
                Ok(bytes) => Some(content_version(&bytes)),
                Err(e) => {
                    return PutOutcome::Failure {
                        reason: e.to_string(),
                    };
                }
            }
        } else {
            None
        };
        if current.as_ref() != version {
            debug!(path = %abs, expected = ?version, actual = ?current, "version mismatch");
            return PutOutcome::Conflict;
        }
        match self.write_atomic(&abs, content) {
            Ok(()) => PutOutcome::Success {
                version: Some(content_version(content)),
            },
            Err(e) => PutOutcome::Failure {
                reason: format!("{:#}", e),
            },
        }
    }

    fn list_blobs(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::Transient {
            path: self.root.to_string(),
            message: e.to_string(),
        })?;
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file
                && let Some(name) = entry.file_name().to_str()
                && !name.ends_with(".tmp")
            {
                out.push(name.to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}
