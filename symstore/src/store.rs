//! Symbol store orchestrator
//!
//! Per-process facade over the whole cache hierarchy. Residency for a
//! library's symbol table is obtained, in order, from:
//!
//! 1. the in-memory resident map (hit: free),
//! 2. an in-flight fetch already registered for that library (join it),
//! 3. the persistent store on disk (hit: adopt into the resident map),
//! 4. the external symbol provider (register the fetch so concurrent callers
//!    share it, persist the result best-effort, adopt).
//!
//! A table resident once stays resident for the process lifetime. At most one
//! provider fetch per library is ever outstanding (single-flight): the fetch
//! future is stored as a `Shared` handle in the pending map, and the
//! check-then-insert happens under a single lock acquisition. Both maps are
//! only ever locked for synchronous edits, never across an await.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, warn};

use crate::domain::{LibraryIdentity, SymbolStoreError, SymbolTable};
use crate::persist::PersistentSymbolStore;
use crate::provider::SymbolProvider;

/// Configuration for a [`SymbolStore`] and its persistent backing store.
#[derive(Debug, Clone)]
pub struct SymbolStoreConfig {
    /// Directory holding persistent store databases.
    pub store_dir: PathBuf,
    /// Scopes the durable state; reopening with the same name observes the
    /// same entries.
    pub store_name: String,
    /// Capacity bound on durable entries (FIFO eviction past it).
    pub max_entry_count: usize,
    /// Age bound on durable entries; `None` = no limit, zero = nothing
    /// survives a restart.
    pub max_entry_age: Option<Duration>,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<SymbolTable>, SymbolStoreError>>>;

struct Inner {
    provider: Arc<dyn SymbolProvider>,
    persistent: PersistentSymbolStore,
    /// Tables loaded during this process lifetime. Never invalidated.
    resident: Mutex<HashMap<LibraryIdentity, Arc<SymbolTable>>>,
    /// One shared in-flight fetch per library, removed on completion.
    pending: Mutex<HashMap<LibraryIdentity, SharedFetch>>,
}

/// Process-wide symbol resolution cache.
///
/// Cheap to clone by wrapping in `Arc`; internally everything is behind one
/// shared state block, so callers pass `&SymbolStore` around.
pub struct SymbolStore {
    inner: Arc<Inner>,
}

impl SymbolStore {
    /// Open the persistent store described by `config` and build the
    /// orchestrator on top of it.
    ///
    /// # Errors
    /// Fails if the persistent store cannot be opened.
    pub fn new(
        config: &SymbolStoreConfig,
        provider: Arc<dyn SymbolProvider>,
    ) -> Result<Self, SymbolStoreError> {
        let persistent = PersistentSymbolStore::open(
            &config.store_dir,
            &config.store_name,
            config.max_entry_count,
            config.max_entry_age,
        )?;
        Ok(Self::with_persistent_store(persistent, provider))
    }

    /// Build the orchestrator over a pre-opened persistent store, for callers
    /// that manage the store lifecycle themselves.
    #[must_use]
    pub fn with_persistent_store(
        persistent: PersistentSymbolStore,
        provider: Arc<dyn SymbolProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                persistent,
                resident: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The ascending function entry addresses for `lib`.
    ///
    /// # Errors
    /// Fails if the symbol table has to be fetched and the provider rejects
    /// or returns malformed data.
    pub async fn func_address_table_for_lib(
        &self,
        lib: &LibraryIdentity,
    ) -> Result<Vec<u64>, SymbolStoreError> {
        let table = self.resident_table(lib).await?;
        Ok(table.addresses().to_vec())
    }

    /// Names for positions in `lib`'s address table, in request order.
    ///
    /// Indices are positions into the array returned by
    /// [`func_address_table_for_lib`](Self::func_address_table_for_lib) —
    /// index-for-index, not raw addresses.
    ///
    /// # Errors
    /// Fails on fetch errors, or with
    /// [`FuncIndexOutOfRange`](SymbolStoreError::FuncIndexOutOfRange) if an
    /// index does not exist in the table.
    pub async fn symbols_for_addresses_in_lib(
        &self,
        indices: &[usize],
        lib: &LibraryIdentity,
    ) -> Result<Vec<String>, SymbolStoreError> {
        let table = self.resident_table(lib).await?;
        indices
            .iter()
            .map(|&index| {
                table
                    .name_at(index)
                    .map(str::to_owned)
                    .ok_or(SymbolStoreError::FuncIndexOutOfRange { index, len: table.len() })
            })
            .collect()
    }

    /// Flush and release the persistent backing store.
    ///
    /// Resident tables stay usable; only durability operations stop working.
    ///
    /// # Errors
    /// Fails if the store is already closed or the final flush fails.
    pub fn close(&self) -> Result<(), SymbolStoreError> {
        self.inner.persistent.close()?;
        Ok(())
    }

    /// Get or establish residency for `lib`'s symbol table.
    async fn resident_table(
        &self,
        lib: &LibraryIdentity,
    ) -> Result<Arc<SymbolTable>, SymbolStoreError> {
        if let Some(table) = self.inner.resident.lock().unwrap().get(lib) {
            return Ok(Arc::clone(table));
        }

        let fetch = {
            let mut pending = self.inner.pending.lock().unwrap();
            if let Some(inflight) = pending.get(lib) {
                debug!("joining in-flight symbol fetch for {lib}");
                inflight.clone()
            } else {
                // Disk check happens before a fetch is registered, so a
                // persistent hit never spawns a provider request. Read
                // failures degrade to a refetch rather than failing the call.
                match self.inner.persistent.get(lib) {
                    Ok(Some(table)) => {
                        debug!("persistent store hit for {lib}");
                        let table = Arc::new(table);
                        self.inner
                            .resident
                            .lock()
                            .unwrap()
                            .insert(lib.clone(), Arc::clone(&table));
                        return Ok(table);
                    }
                    Ok(None) => {}
                    Err(err) => warn!("persistent store read failed for {lib}: {err}"),
                }
                let fetch = Self::fetch_and_adopt(Arc::clone(&self.inner), lib.clone())
                    .boxed()
                    .shared();
                pending.insert(lib.clone(), fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Body of the shared fetch future. Runs exactly once per registered
    /// pending entry; every waiter receives a clone of its result.
    async fn fetch_and_adopt(
        inner: Arc<Inner>,
        lib: LibraryIdentity,
    ) -> Result<Arc<SymbolTable>, SymbolStoreError> {
        let result = Self::fetch_table(&inner, &lib).await;

        // Clear the pending slot before waiters resume, then publish on
        // success. Failures leave no trace, so the next call retries.
        inner.pending.lock().unwrap().remove(&lib);
        match &result {
            Ok(table) => {
                inner.resident.lock().unwrap().insert(lib.clone(), Arc::clone(table));
            }
            Err(err) => debug!("symbol fetch for {lib} failed: {err}"),
        }
        result
    }

    async fn fetch_table(
        inner: &Inner,
        lib: &LibraryIdentity,
    ) -> Result<Arc<SymbolTable>, SymbolStoreError> {
        debug!("requesting symbol table for {lib}");
        let raw = inner.provider.request_symbol_table(lib).await.map_err(|err| {
            SymbolStoreError::ProviderFetchFailed { lib: lib.to_string(), reason: err.to_string() }
        })?;
        let table = SymbolTable::try_from(raw)?;

        // Durability is best effort: a write failure costs a refetch after
        // restart, not this call.
        if let Err(err) = inner.persistent.store(lib, &table) {
            warn!("failed to persist symbol table for {lib}: {err}");
        }
        Ok(Arc::new(table))
    }
}
