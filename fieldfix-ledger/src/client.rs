use crate::decode::encode_corrections;
use crate::store::{BlobStore, PutOutcome, StoreError};
use crate::table::{Table, TableError, parse_table};
use fieldfix_types::{CorrectionRecord, LEDGER_COLUMNS};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{path} is not valid UTF-8 text")]
    Encoding { path: String },

    #[error("{path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: TableError,
    },
}

/// Outcome of a ledger append. Errors are folded into `Failed` or `AuthExpired`; nothing
/// escapes as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Written { rows_total: usize },
    /// Another writer changed the ledger between our read and our write.
    Conflict,
    Failed { reason: String },
    /// The backend rejected the credentials; the session cannot continue.
    AuthExpired { backend: &'static str },
}

impl AppendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AppendOutcome::Written { .. })
    }
}

/// Table-level access to a blob store.
pub struct LedgerClient<'a> {
    store: &'a dyn BlobStore,
}

impl<'a> LedgerClient<'a> {
    pub fn new(store: &'a dyn BlobStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a dyn BlobStore {
        self.store
    }

    /// `Ok(None)` when the table does not exist yet.
    pub fn read_table(&self, path: &str) -> Result<Option<Table>, ReadError> {
        let Some(blob) = self.store.get_blob(path)? else {
            return Ok(None);
        };
        let text = String::from_utf8(blob.content).map_err(|_| ReadError::Encoding {
            path: path.to_string(),
        })?;
        let table = parse_table(&text).map_err(|source| ReadError::Parse {
            path: path.to_string(),
            source,
        })?;
        debug!(path, rows = table.len(), version = %blob.version, "read table");
        Ok(Some(table))
    }

    /// Append correction rows to the ledger at `path`, creating it when absent.
    ///
    /// Rows already in the ledger are written back untouched under their own header. Ledger
    /// columns the header lacks are added at the end, and new rows are placed by column name.
    /// The write carries the version token from the read, so a concurrent writer surfaces as
    /// `Conflict`.
    pub fn append(&self, path: &str, records: &[CorrectionRecord]) -> AppendOutcome {
        let existing = match self.store.get_blob(path) {
            Ok(existing) => existing,
            Err(StoreError::AuthExpired { backend }) => {
                return AppendOutcome::AuthExpired { backend };
            }
            Err(e) => {
                return AppendOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let (mut table, version) = match existing {
            Some(blob) => {
                let parsed = String::from_utf8(blob.content)
                    .map_err(|_| format!("{} is not valid UTF-8 text", path))
                    .and_then(|text| parse_table(&text).map_err(|e| format!("{}: {}", path, e)));
                match parsed {
                    Ok(t) => (t, Some(blob.version)),
                    Err(reason) => return AppendOutcome::Failed { reason },
                }
            }
            None => (Table::new(LEDGER_COLUMNS), None),
        };
        widen_to_ledger(&mut table);

        let before = table.len();
        let columns: Vec<&str> = table.header.iter().map(String::as_str).collect();
        let appended = encode_corrections(records).project(&columns);
        table.rows.extend(appended);
        let rows_total = table.len();
        let csv = table.to_csv();

        match self.store.put_blob(path, csv.as_bytes(), version.as_ref()) {
            PutOutcome::Success { .. } => {
                info!(
                    path,
                    backend = self.store.name(),
                    appended = rows_total - before,
                    rows_total,
                    "ledger append confirmed"
                );
                AppendOutcome::Written { rows_total }
            }
            PutOutcome::Conflict => {
                warn!(path, backend = self.store.name(), "ledger changed underneath append");
                AppendOutcome::Conflict
            }
            PutOutcome::Failure { reason } => {
                warn!(path, backend = self.store.name(), %reason, "ledger append failed");
                AppendOutcome::Failed { reason }
            }
            PutOutcome::AuthExpired { backend } => {
                warn!(path, backend, "ledger append rejected: access token expired");
                AppendOutcome::AuthExpired { backend }
            }
        }
    }
}

/// Add every ledger column missing from `table`, padding existing rows with empty cells.
fn widen_to_ledger(table: &mut Table) {
    let missing: Vec<&str> = LEDGER_COLUMNS
        .iter()
        .copied()
        .filter(|c| table.column(c).is_none())
        .collect();
    if missing.is_empty() {
        return;
    }
    debug!(?missing, "adding ledger columns to existing header");
    table.header.extend(missing.iter().map(|c| c.to_string()));
    let width = table.header.len();
    for row in &mut table.rows {
        row.resize(width, String::new());
    }
}
