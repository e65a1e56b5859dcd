//! Core session, admin and export pipelines, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: table storage goes through a [`BlobStore`], timestamps
//! through a [`Clock`], and local files through a [`WritePort`].

use crate::cache::SnapshotCache;
use crate::ports::{BlobStore, Clock, WritePort};
use crate::settings::{AdminSettings, ExportSettings, SessionSettings, TablePaths};
use anyhow::Context;
use camino::Utf8PathBuf;
use chrono::NaiveDate;
use fieldfix_domain::{
    Completeness, EditError, FieldEdit, Incomplete, LedgerSummary, Outstanding, SessionState,
    commit, export_file_name, list_enumerators, outstanding_errors, summarize,
};
use fieldfix_ledger::{
    AppendOutcome, LedgerClient, ReadError, StoreError, Table, decode_constraint_errors,
    decode_corrections, decode_logic_errors,
};
use fieldfix_types::{ConstraintErrorRecord, ErrorKey, LogicErrorRecord};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Error type for pipeline results. Exit code 2 = incomplete corrections, 1 = everything else.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("access token rejected by {backend}; please contact the administrator")]
    AuthExpired { backend: &'static str },

    #[error("could not load {table}: {message}")]
    SourceLoad { table: String, message: String },

    #[error("{} of {} corrections still need an explanation", .0.remaining(), .0.total)]
    Incomplete(Completeness),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("save failed, your edits are kept and can be saved again: {reason}")]
    SaveFailed { reason: String },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::Incomplete(_) => 2,
            _ => 1,
        }
    }
}

impl From<StoreError> for ToolError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Configuration(msg) => ToolError::Configuration(msg),
            StoreError::AuthExpired { backend } => ToolError::AuthExpired { backend },
            StoreError::Transient { path, message } => ToolError::SourceLoad {
                table: path,
                message,
            },
        }
    }
}

impl From<Incomplete> for ToolError {
    fn from(e: Incomplete) -> Self {
        ToolError::Incomplete(e.0)
    }
}

fn read_error(table: &str, e: ReadError) -> ToolError {
    match e {
        ReadError::Store(e) => e.into(),
        other => ToolError::SourceLoad {
            table: table.to_string(),
            message: other.to_string(),
        },
    }
}

/// Decoded source tables.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub constraints: Vec<ConstraintErrorRecord>,
    pub logic: Vec<LogicErrorRecord>,
}

fn missing_table(store: &dyn BlobStore, path: &str) -> ToolError {
    let available = match store.list_blobs() {
        Ok(names) if names.is_empty() => "the store is empty".to_string(),
        Ok(names) => format!("available: {}", names.join(", ")),
        Err(e) => format!("listing failed: {}", e),
    };
    ToolError::SourceLoad {
        table: path.to_string(),
        message: format!("not found in {} store ({})", store.name(), available),
    }
}

fn require_table(store: &dyn BlobStore, path: &str) -> Result<Table, ToolError> {
    LedgerClient::new(store)
        .read_table(path)
        .map_err(|e| read_error(path, e))?
        .ok_or_else(|| missing_table(store, path))
}

/// Fetch and decode both source tables. Either both load or the call fails.
pub fn load_snapshot(store: &dyn BlobStore, tables: &TablePaths) -> Result<Snapshot, ToolError> {
    let constraints = require_table(store, &tables.constraints)?;
    let logic = require_table(store, &tables.logic)?;

    let constraints =
        decode_constraint_errors(&constraints, &tables.constraints).map_err(|e| {
            ToolError::SourceLoad {
                table: tables.constraints.clone(),
                message: e.to_string(),
            }
        })?;
    let logic = decode_logic_errors(&logic, &tables.logic).map_err(|e| ToolError::SourceLoad {
        table: tables.logic.clone(),
        message: e.to_string(),
    })?;

    info!(
        backend = store.name(),
        constraints = constraints.len(),
        logic = logic.len(),
        "source tables loaded"
    );
    Ok(Snapshot { constraints, logic })
}

/// Usernames that own at least one flagged row.
pub fn run_enumerators(
    store: &dyn BlobStore,
    tables: &TablePaths,
) -> Result<Vec<String>, ToolError> {
    store.check_access()?;
    let snapshot = load_snapshot(store, tables)?;
    Ok(list_enumerators(&snapshot.constraints, &snapshot.logic))
}

/// Outcome of a save action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing outstanding; no write was attempted.
    NothingToSave,
    Saved { records: usize, rows_total: usize },
}

/// One enumerator's correction session: cached source tables plus the edit state.
///
/// Keys are marked resolved only after the ledger confirms the write.
pub struct CorrectionSession<'a> {
    store: &'a dyn BlobStore,
    clock: &'a dyn Clock,
    settings: SessionSettings,
    cache: SnapshotCache<Snapshot>,
    state: SessionState,
}

impl std::fmt::Debug for CorrectionSession<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionSession")
            .field("backend", &self.store.name())
            .field("enumerator", &self.settings.enumerator)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a> CorrectionSession<'a> {
    /// Check access and load both source tables.
    pub fn start(
        store: &'a dyn BlobStore,
        clock: &'a dyn Clock,
        settings: SessionSettings,
    ) -> Result<Self, ToolError> {
        if settings.enumerator.trim().is_empty() {
            return Err(ToolError::Configuration(
                "an enumerator must be selected".to_string(),
            ));
        }
        store.check_access()?;

        let mut cache = SnapshotCache::new(settings.cache_ttl);
        cache.get_or_try_load(Instant::now(), || load_snapshot(store, &settings.tables))?;
        info!(enumerator = settings.enumerator.as_str(), "session started");

        Ok(Self {
            store,
            clock,
            settings,
            cache,
            state: SessionState::new(),
        })
    }

    pub fn enumerator(&self) -> &str {
        &self.settings.enumerator
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current worklist. Source tables are refetched once the cache window has passed.
    ///
    /// When a refetch fails for a reason other than access, the previous tables keep serving.
    pub fn outstanding(&mut self) -> Result<Outstanding, ToolError> {
        let store = self.store;
        let tables = &self.settings.tables;
        let snapshot = self.cache.get_or_try_load_or_stale(
            Instant::now(),
            || load_snapshot(store, tables),
            |e| {
                let stale = matches!(e, ToolError::SourceLoad { .. });
                if stale {
                    warn!(error = %e, "source tables could not be refreshed; keeping previous copy");
                }
                stale
            },
        )?;
        Ok(outstanding_errors(
            &snapshot.constraints,
            &snapshot.logic,
            &self.settings.enumerator,
            self.state.resolved(),
        ))
    }

    pub fn record_edit(&mut self, key: &ErrorKey, edit: FieldEdit) -> Result<(), ToolError> {
        let outstanding = self.outstanding()?;
        self.state.record_edit(&outstanding, key, edit)?;
        Ok(())
    }

    pub fn progress(&mut self) -> Result<Completeness, ToolError> {
        let outstanding = self.outstanding()?;
        Ok(self.state.validate(&outstanding))
    }

    /// Validate, append to the ledger, and on confirmation mark everything resolved.
    ///
    /// A version conflict is retried up to `save_retries` times; each attempt re-reads the ledger.
    /// On any failure the session state is left exactly as it was.
    pub fn save(&mut self) -> Result<SaveOutcome, ToolError> {
        let outstanding = self.outstanding()?;
        let batch = commit(
            &self.state,
            &outstanding,
            &self.settings.enumerator,
            self.clock,
        )?;
        if batch.is_empty() {
            debug!("nothing outstanding; skipping write");
            return Ok(SaveOutcome::NothingToSave);
        }

        let client = LedgerClient::new(self.store);
        let path = self.settings.tables.corrections.as_str();
        let attempts = self.settings.save_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match client.append(path, &batch.records) {
                AppendOutcome::Written { rows_total } => {
                    self.state.mark_committed(&batch.keys);
                    info!(
                        enumerator = self.settings.enumerator.as_str(),
                        records = batch.records.len(),
                        rows_total,
                        "corrections saved"
                    );
                    return Ok(SaveOutcome::Saved {
                        records: batch.records.len(),
                        rows_total,
                    });
                }
                AppendOutcome::Conflict => {
                    warn!(attempt, attempts, path, "ledger changed during save");
                }
                AppendOutcome::Failed { reason } => {
                    return Err(ToolError::SaveFailed { reason });
                }
                AppendOutcome::AuthExpired { backend } => {
                    return Err(ToolError::AuthExpired { backend });
                }
            }
        }
        Err(ToolError::SaveFailed {
            reason: format!(
                "{} kept changing underneath the save after {} attempts",
                path, attempts
            ),
        })
    }
}

/// Outcome of `run_admin`. `summary` is `None` when no ledger exists yet.
#[derive(Debug, Clone)]
pub struct AdminOutcome {
    pub summary: Option<LedgerSummary>,
}

fn read_ledger(
    store: &dyn BlobStore,
    path: &str,
) -> Result<Option<Vec<fieldfix_types::CorrectionRecord>>, ToolError> {
    let Some(table) = LedgerClient::new(store)
        .read_table(path)
        .map_err(|e| read_error(path, e))?
    else {
        return Ok(None);
    };
    let rows = decode_corrections(&table, path).map_err(|e| ToolError::SourceLoad {
        table: path.to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(rows))
}

/// Summarize the whole ledger.
pub fn run_admin(
    store: &dyn BlobStore,
    settings: &AdminSettings,
) -> Result<AdminOutcome, ToolError> {
    store.check_access()?;
    let summary = read_ledger(store, &settings.corrections)?
        .map(|rows| summarize(&rows, settings.preview_rows));
    if summary.is_none() {
        info!(path = settings.corrections.as_str(), "no ledger yet");
    }
    Ok(AdminOutcome { summary })
}

/// Outcome of `run_export`. `None` when no ledger exists yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: Utf8PathBuf,
    pub rows: usize,
}

/// Write the full ledger to `all_corrections_{date}.csv` under `out_dir`.
pub fn run_export(
    store: &dyn BlobStore,
    settings: &ExportSettings,
    writer: &dyn WritePort,
    today: NaiveDate,
) -> Result<Option<ExportOutcome>, ToolError> {
    store.check_access()?;
    let Some(table) = LedgerClient::new(store)
        .read_table(&settings.corrections)
        .map_err(|e| read_error(&settings.corrections, e))?
    else {
        return Ok(None);
    };

    writer.create_dir_all(&settings.out_dir)?;
    let path = settings.out_dir.join(export_file_name(today));
    writer
        .write_file(&path, table.to_csv().as_bytes())
        .with_context(|| format!("export ledger to {}", path))?;
    info!(path = %path, rows = table.len(), "ledger exported");

    Ok(Some(ExportOutcome {
        path,
        rows: table.len(),
    }))
}
