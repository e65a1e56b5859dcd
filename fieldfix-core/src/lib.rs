//! Embeddable core library for fieldfix.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking into the CLI, a web
//! front end, or any other host process.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`BlobStore`](ports::BlobStore): read and version-checked write of table blobs
//! - [`Clock`](ports::Clock): correction timestamps
//! - [`WritePort`](ports::WritePort): write exported files
//!
//! The [`adapters`] module builds the configured store and a filesystem write port.
//!
//! # Entry points
//!
//! - [`CorrectionSession`](pipeline::CorrectionSession): one enumerator's edit-and-save session
//! - [`run_enumerators`](pipeline::run_enumerators): usernames with flagged rows
//! - [`run_admin`](pipeline::run_admin): ledger summary
//! - [`run_export`](pipeline::run_export): full ledger download

pub mod adapters;
pub mod cache;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use pipeline::{
    AdminOutcome, CorrectionSession, ExportOutcome, SaveOutcome, Snapshot, ToolError,
    load_snapshot, run_admin, run_enumerators, run_export,
};

// Re-export the domain vocabulary so hosts don't need fieldfix-domain directly.
pub use fieldfix_domain::{
    Completeness, EditError, FieldEdit, FixedClock, LedgerSummary, Outstanding, SessionState,
    SystemClock,
};
