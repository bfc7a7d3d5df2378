//! Symbol provider capability
//!
//! Symbol tables come from outside this crate: a host tool, a symbol server,
//! a local binary parser. All of that plumbing sits behind this one async
//! trait; the cache only requires the two parallel sequences after decoding.

use async_trait::async_trait;

use crate::domain::{LibraryIdentity, RawSymbolTable};

/// Fetches the raw symbol table for one library.
///
/// The wire encoding and transport are the provider's concern. A rejected
/// future surfaces to all callers waiting on that library as
/// [`ProviderFetchFailed`](crate::SymbolStoreError::ProviderFetchFailed);
/// failures are never cached, so the next call retries.
#[async_trait]
pub trait SymbolProvider: Send + Sync {
    /// # Errors
    /// Returns whatever error the underlying transport produced; the
    /// orchestrator records its rendered message.
    async fn request_symbol_table(&self, lib: &LibraryIdentity)
        -> anyhow::Result<RawSymbolTable>;
}
