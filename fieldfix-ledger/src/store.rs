use std::fmt;
use thiserror::Error;

/// Opaque version of a stored blob, used for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content: Vec<u8>,
    pub version: VersionToken,
}

/// Result of a conditional write. Never an `Err`: callers pick retry vs. abort per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Success { version: Option<VersionToken> },
    /// The expected version no longer matches what the backend holds.
    Conflict,
    Failure { reason: String },
    /// The backend rejected the credentials.
    AuthExpired { backend: &'static str },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("access token rejected by {backend}; ask an administrator for a new token")]
    AuthExpired { backend: &'static str },

    #[error("fetch {path} failed: {message}")]
    Transient { path: String, message: String },
}

impl StoreError {
    /// Configuration and auth failures need an operator; retrying will not help.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Configuration(_) | StoreError::AuthExpired { .. }
        )
    }
}

/// Versioned key-value blob store holding the source tables and the ledger.
pub trait BlobStore {
    /// Short backend name for logs and messages.
    fn name(&self) -> &'static str;

    /// Capability check run once at session start.
    fn check_access(&self) -> Result<(), StoreError>;

    /// `Ok(None)` when the blob does not exist.
    fn get_blob(&self, path: &str) -> Result<Option<Blob>, StoreError>;

    /// Write `content`. With `version = None` the blob must not exist yet.
    fn put_blob(&self, path: &str, content: &[u8], version: Option<&VersionToken>) -> PutOutcome;

    /// Blob paths at the top level of the store, sorted.
    fn list_blobs(&self) -> Result<Vec<String>, StoreError>;
}
