//! Shared DTOs for the fieldfix workspace.
//!
//! # Design constraints
//! - Source records are decoded once, at table-read time, into the typed variants here.
//! - `CorrectionRecord` is persisted; its column order is part of the ledger format.
//! - Prefer adding optional fields over changing semantics.

pub mod correction;
pub mod key;
pub mod record;

pub use correction::{CorrectionRecord, LEDGER_COLUMNS};
pub use key::{ErrorKey, ErrorKind};
pub use record::{ConstraintErrorRecord, ErrorContext, LogicErrorRecord, SourceRecord};

/// Default blob paths inside the remote store.
pub mod tables {
    pub const CONSTRAINTS: &str = "constraints.csv";
    pub const LOGIC: &str = "logic.csv";
    pub const CORRECTIONS: &str = "corrections.csv";
}
