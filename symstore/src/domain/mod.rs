//! Domain model for symstore
//!
//! Core data types and structured errors shared by the lookup, persistence,
//! and orchestration layers.

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{LibraryIdentity, RawSymbolTable, SymbolTable};

pub use errors::{StoreError, SymbolStoreError};
