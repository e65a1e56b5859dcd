//! Domain logic: turn two flagged-value tables into an enumerator's worklist and a validated batch
//! of correction rows.
//!
//! This crate owns *what* is outstanding and *whether* a save may proceed. It does not own storage;
//! that's the `fieldfix-ledger` crate. Every function here is pure over its inputs, apart from
//! [`SessionState`], which is an explicit value the caller owns.

mod bounds;
mod commit;
mod extract;
mod ports;
mod session;
mod summary;

pub use bounds::{
    Bounds, DEFAULT_MAX, DEFAULT_MIN, advisory_bounds, display_value, infer_bounds,
    infer_bounds_legacy, logic_bounds,
};
pub use commit::{CommitBatch, Incomplete, commit};
pub use extract::{FarmerErrors, Outstanding, list_enumerators, outstanding_errors};
pub use ports::{Clock, FixedClock, SystemClock};
pub use session::{
    Completeness, EditError, FieldEdit, PendingCorrection, SessionState, validate_complete,
};
pub use summary::{LedgerSummary, export_file_name, summarize};
