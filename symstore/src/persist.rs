//! Persistent symbol store
//!
//! Durable, capacity- and age-bounded cache of symbol tables keyed by
//! [`LibraryIdentity`], layered over sled (an embedded ordered key-value
//! store). Policy lives here; the storage engine is sled's.
//!
//! Layout: two trees in one database.
//! - `by-key`: serialized `LibraryIdentity` -> big-endian insertion sequence
//! - `by-seq`: big-endian insertion sequence -> JSON [`CacheEntry`]
//!
//! Sequence numbers come from `sled::Db::generate_id`, which is monotonic
//! across restarts, so iterating `by-seq` from the front always visits
//! entries oldest-insertion-first. Eviction is insertion-order FIFO, not LRU:
//! reads never rewrite ordering metadata, and an overwrite re-inserts the key
//! at the tail. Symbol tables are fetched in bulk per debugging session, so
//! reuse is bursty and FIFO loses little over LRU.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::domain::{LibraryIdentity, StoreError, SymbolTable};

/// One durable cache record: the value side of the `by-seq` tree.
///
/// Carries its own key so eviction can remove the matching `by-key` slot
/// without a reverse index.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: LibraryIdentity,
    stored_at_ms: u64,
    table: SymbolTable,
}

struct Trees {
    db: sled::Db,
    by_key: sled::Tree,
    by_seq: sled::Tree,
}

/// Durable, bounded cache of symbol tables.
///
/// `close()` flushes and releases the underlying database so the same path
/// can be reopened; operations on a closed handle fail with
/// [`StoreError::Closed`].
pub struct PersistentSymbolStore {
    trees: Mutex<Option<Trees>>,
    max_entry_count: usize,
    max_entry_age: Option<Duration>,
}

impl PersistentSymbolStore {
    /// Open (creating if absent) the store named `name` under `dir`.
    ///
    /// `max_entry_count` bounds live entries (enforced on every store);
    /// `max_entry_age` bounds entry lifetime (`None` = no age limit). An age
    /// limit of zero means nothing may survive a restart: every existing
    /// entry is swept immediately at open, not just lazily on read.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the zero-age
    /// sweep fails.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        max_entry_count: usize,
        max_entry_age: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let db = sled::open(dir.as_ref().join(name))?;
        let by_key = db.open_tree("by-key")?;
        let by_seq = db.open_tree("by-seq")?;

        if max_entry_age == Some(Duration::ZERO) {
            let swept = by_key.len();
            by_key.clear()?;
            by_seq.clear()?;
            if swept > 0 {
                info!("symbol store {name}: zero age limit, swept {swept} entries at open");
            }
        }

        Ok(Self {
            trees: Mutex::new(Some(Trees { db, by_key, by_seq })),
            max_entry_count,
            max_entry_age,
        })
    }

    /// Upsert `table` under `key` with `stored_at = now`, then evict
    /// oldest-inserted entries while the live count exceeds the capacity.
    ///
    /// Overwriting an existing key re-inserts it at the tail of the FIFO
    /// order (it counts as a fresh insertion).
    ///
    /// # Errors
    /// Fails with [`StoreError::Closed`] on a closed handle, or with a
    /// database/encoding error.
    pub fn store(&self, key: &LibraryIdentity, table: &SymbolTable) -> Result<(), StoreError> {
        self.with_trees(|trees| {
            let key_bytes = serde_json::to_vec(key)?;

            // Drop the key's previous sequence slot so the overwrite counts
            // as a fresh insertion for FIFO ordering.
            if let Some(old_seq) = trees.by_key.get(&key_bytes)? {
                trees.by_seq.remove(old_seq)?;
            }

            let seq = trees.db.generate_id()?;
            let entry = CacheEntry {
                key: key.clone(),
                stored_at_ms: now_ms(),
                table: table.clone(),
            };
            let seq_bytes = seq.to_be_bytes();
            trees.by_seq.insert(&seq_bytes[..], serde_json::to_vec(&entry)?)?;
            trees.by_key.insert(key_bytes, seq_bytes.to_vec())?;

            while trees.by_key.len() > self.max_entry_count {
                let Some((seq_bytes, entry_bytes)) = trees.by_seq.first()? else {
                    break;
                };
                let evicted: CacheEntry = serde_json::from_slice(&entry_bytes)?;
                trees.by_seq.remove(seq_bytes)?;
                trees.by_key.remove(serde_json::to_vec(&evicted.key)?)?;
                debug!(
                    "symbol store evicted {} (capacity {})",
                    evicted.key, self.max_entry_count
                );
            }
            Ok(())
        })
    }

    /// Look up the symbol table stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent. If an age limit is
    /// configured and the entry has reached it, the entry is removed and
    /// reported absent (lazy age eviction on read).
    ///
    /// # Errors
    /// Fails with [`StoreError::Closed`] on a closed handle, or with a
    /// database/decoding error.
    pub fn get(&self, key: &LibraryIdentity) -> Result<Option<SymbolTable>, StoreError> {
        self.with_trees(|trees| {
            let key_bytes = serde_json::to_vec(key)?;
            let Some(seq_bytes) = trees.by_key.get(&key_bytes)? else {
                return Ok(None);
            };
            let Some(entry_bytes) = trees.by_seq.get(&seq_bytes)? else {
                // Dangling index slot, drop it.
                trees.by_key.remove(&key_bytes)?;
                return Ok(None);
            };
            let entry: CacheEntry = serde_json::from_slice(&entry_bytes)?;

            if let Some(max_age) = self.max_entry_age {
                let age_ms = now_ms().saturating_sub(entry.stored_at_ms);
                if u128::from(age_ms) >= max_age.as_millis() {
                    trees.by_seq.remove(&seq_bytes)?;
                    trees.by_key.remove(&key_bytes)?;
                    debug!("symbol store expired {} (age {age_ms}ms)", entry.key);
                    return Ok(None);
                }
            }
            Ok(Some(entry.table))
        })
    }

    /// Number of live entries.
    ///
    /// # Errors
    /// Fails with [`StoreError::Closed`] on a closed handle.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.with_trees(|trees| Ok(trees.by_key.len()))
    }

    /// # Errors
    /// Fails with [`StoreError::Closed`] on a closed handle.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Flush and release the underlying database.
    ///
    /// Acts as a flush boundary: reopening the same name afterwards observes
    /// everything stored before the close. Every later operation on this
    /// handle fails with [`StoreError::Closed`].
    ///
    /// # Errors
    /// Fails with [`StoreError::Closed`] if already closed, or if the final
    /// flush fails.
    pub fn close(&self) -> Result<(), StoreError> {
        let mut guard = self.trees.lock().unwrap();
        match guard.take() {
            Some(trees) => {
                trees.db.flush()?;
                Ok(())
            }
            None => Err(StoreError::Closed),
        }
    }

    fn with_trees<T>(
        &self,
        op: impl FnOnce(&Trees) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.trees.lock().unwrap();
        match guard.as_ref() {
            Some(trees) => op(trees),
            None => Err(StoreError::Closed),
        }
    }
}

fn now_ms() -> u64 {
    // System clock before 1970 is not a supported configuration.
    u64::try_from(
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_millis(),
    )
    .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawSymbolTable;

    fn table(names: &[&str]) -> SymbolTable {
        let addresses = (0..names.len() as u64).map(|i| i * 0x100).collect();
        SymbolTable::try_from(RawSymbolTable {
            addresses,
            names: names.iter().map(|s| (*s).to_string()).collect(),
        })
        .expect("test table is well formed")
    }

    fn lib(name: &str) -> LibraryIdentity {
        LibraryIdentity::new(name, format!("{name}-breakpad-id"))
    }

    #[test]
    fn test_store_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentSymbolStore::open(dir.path(), "syms", 10, None).unwrap();

        let t = table(&["alpha", "beta"]);
        store.store(&lib("liba.so"), &t).unwrap();

        assert_eq!(store.get(&lib("liba.so")).unwrap(), Some(t));
        assert_eq!(store.get(&lib("libb.so")).unwrap(), None);
    }

    #[test]
    fn test_overwrite_moves_key_to_fifo_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentSymbolStore::open(dir.path(), "syms", 2, None).unwrap();

        store.store(&lib("a"), &table(&["a1"])).unwrap();
        store.store(&lib("b"), &table(&["b1"])).unwrap();
        // Re-storing "a" makes it the newest; inserting "c" must now evict "b".
        store.store(&lib("a"), &table(&["a2"])).unwrap();
        store.store(&lib("c"), &table(&["c1"])).unwrap();

        assert_eq!(store.get(&lib("b")).unwrap(), None);
        assert_eq!(store.get(&lib("a")).unwrap(), Some(table(&["a2"])));
        assert_eq!(store.get(&lib("c")).unwrap(), Some(table(&["c1"])));
    }

    #[test]
    fn test_age_expiry_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            PersistentSymbolStore::open(dir.path(), "syms", 10, Some(Duration::from_millis(20)))
                .unwrap();

        store.store(&lib("a"), &table(&["a1"])).unwrap();
        assert!(store.get(&lib("a")).unwrap().is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(store.get(&lib("a")).unwrap(), None);
        // Expiry removed the entry, not just hid it.
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn test_closed_handle_rejects_operations() {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentSymbolStore::open(dir.path(), "syms", 10, None).unwrap();
        store.close().unwrap();

        assert_eq!(store.get(&lib("a")), Err(StoreError::Closed));
        assert_eq!(store.store(&lib("a"), &table(&["a1"])), Err(StoreError::Closed));
        assert_eq!(store.len(), Err(StoreError::Closed));
        assert_eq!(store.close(), Err(StoreError::Closed));
    }
}
