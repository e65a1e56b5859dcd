//! Clap-free settings for the session, admin and export pipelines.

use camino::Utf8PathBuf;
use fieldfix_ledger::GithubConfig;
use fieldfix_types::tables;
use std::time::Duration;

/// Which backend holds the tables.
#[derive(Debug, Clone)]
pub enum StoreSettings {
    Github(GithubConfig),
    Directory { root: Utf8PathBuf },
}

impl StoreSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreSettings::Github(_) => "github",
            StoreSettings::Directory { .. } => "directory",
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings::Directory {
            root: Utf8PathBuf::from("."),
        }
    }
}

/// Blob paths of the two source tables and the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    pub constraints: String,
    pub logic: String,
    pub corrections: String,
}

impl Default for TablePaths {
    fn default() -> Self {
        Self {
            constraints: tables::CONSTRAINTS.to_string(),
            logic: tables::LOGIC.to_string(),
            corrections: tables::CORRECTIONS.to_string(),
        }
    }
}

/// Settings for one enumerator's correction session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub enumerator: String,
    pub tables: TablePaths,

    /// How long fetched source tables are reused before refetching.
    pub cache_ttl: Duration,

    /// Extra append attempts after a version conflict.
    pub save_retries: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            enumerator: String::new(),
            tables: TablePaths::default(),
            cache_ttl: Duration::from_secs(3600),
            save_retries: 1,
        }
    }
}

/// Settings for the admin summary.
#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub corrections: String,
    pub preview_rows: usize,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            corrections: tables::CORRECTIONS.to_string(),
            preview_rows: 10,
        }
    }
}

/// Settings for the full-ledger export.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub corrections: String,
    pub out_dir: Utf8PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            corrections: tables::CORRECTIONS.to_string(),
            out_dir: Utf8PathBuf::from("."),
        }
    }
}
