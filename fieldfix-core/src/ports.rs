//! Port traits abstracting all I/O away from the pipeline.
//!
//! Table storage goes through [`BlobStore`] and timestamps through [`Clock`]; both are re-exported
//! here so embedders only depend on this crate.

use camino::Utf8Path;

pub use fieldfix_domain::Clock;
pub use fieldfix_ledger::BlobStore;

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
