//! Structured error types for symstore
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Both enums are `Clone`: a failed symbol fetch is fanned out to every
//! caller waiting on the same in-flight request, so external error sources
//! are carried as rendered strings rather than non-clonable source values.

use thiserror::Error;

/// Errors from the persistent symbol store layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Operation attempted on a handle after `close()`. Fatal to that
    /// operation only; other open handles are unaffected.
    #[error("persistent symbol store is closed")]
    Closed,

    #[error("storage engine error: {0}")]
    Database(String),

    /// A durable entry failed to decode or re-validate.
    #[error("corrupt cache entry: {0}")]
    Corrupt(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Errors surfaced by the symbol store orchestrator.
///
/// Absence from the cache is not an error: `PersistentSymbolStore::get`
/// returns `Ok(None)` and the orchestrator falls through to the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolStoreError {
    /// The external symbol provider rejected. Never cached; the next call
    /// for the same library retries from scratch.
    #[error("symbol fetch failed for {lib}: {reason}")]
    ProviderFetchFailed { lib: String, reason: String },

    /// Provider data violated the sorted/parallel symbol table invariant.
    /// Treated exactly like a fetch failure and never written to storage.
    #[error("malformed symbol table: {0}")]
    MalformedSymbolTable(String),

    /// Caller passed an index that does not exist in the address table.
    #[error("address index {index} out of range for table with {len} entries")]
    FuncIndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}
