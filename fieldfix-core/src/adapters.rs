//! Default port implementations.

use crate::ports::{BlobStore, WritePort};
use crate::settings::StoreSettings;
use anyhow::Context;
use camino::Utf8Path;
use fieldfix_ledger::{DirBlobStore, GithubBlobStore, StoreError};
use fs_err as fs;
use tracing::debug;

/// Build the configured blob store.
pub fn open_store(settings: &StoreSettings) -> Result<Box<dyn BlobStore>, StoreError> {
    match settings {
        StoreSettings::Github(config) => {
            debug!(
                owner = config.owner.as_str(),
                repo = config.repo.as_str(),
                branch = config.branch.as_str(),
                "using github store"
            );
            Ok(Box::new(GithubBlobStore::new(config.clone())?))
        }
        StoreSettings::Directory { root } => {
            debug!(root = %root, "using directory store");
            Ok(Box::new(DirBlobStore::new(root.clone())))
        }
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}
