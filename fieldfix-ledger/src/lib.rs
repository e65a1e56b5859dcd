//! Storage plumbing for fieldfix.
//!
//! Source tables and the corrections ledger are flat comma-separated blobs in a versioned store.
//! This crate owns the codec ([`table`]), the typed decoding of rows ([`decode`]), the
//! [`BlobStore`] port with its backends, and the [`LedgerClient`] that reads tables and appends
//! correction rows with a version-checked write.
//!
//! Decoding is tolerant: unknown columns are ignored and contact columns may be absent. Only the
//! identity and value columns are required.

pub mod decode;
pub mod table;

mod client;
mod dir;
mod github;
mod memory;
mod store;

pub use client::{AppendOutcome, LedgerClient, ReadError};
pub use decode::{
    DecodeError, decode_constraint_errors, decode_corrections, decode_logic_errors,
    encode_corrections,
};
pub use dir::DirBlobStore;
pub use github::{GithubBlobStore, GithubConfig};
pub use memory::MemoryBlobStore;
pub use store::{Blob, BlobStore, PutOutcome, StoreError, VersionToken};
pub use table::{Table, TableError, parse_table};
