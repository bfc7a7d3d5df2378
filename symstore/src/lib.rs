//! # symstore - Symbol Resolution Cache
//!
//! Resolves native code addresses inside a library to human-readable function
//! symbols, amortizing costly symbol-table downloads across calls and across
//! process restarts. Where the tables come from (a host tool, a symbol
//! server, a local binary parser) is abstracted behind the
//! [`SymbolProvider`] capability; this crate owns the caching.
//!
//! ## Architecture Overview
//!
//! ```text
//! caller
//!   │
//!   ▼
//! ┌──────────────────┐  miss   ┌──────────────────────┐  miss  ┌────────────┐
//! │   SymbolStore     │───────▶│ PersistentSymbolStore │───────▶│  Symbol    │
//! │  (resident cache, │        │  (sled, FIFO + age    │        │  Provider  │
//! │   single-flight)  │◀───────│   bounded, durable)   │◀───────│  (async)   │
//! └──────────────────┘   hit   └──────────────────────┘  write └────────────┘
//!   │
//!   ▼
//! Address Table Lookup (floor binary search) → function name
//! ```
//!
//! ## Module Structure
//!
//! - [`domain`]: core types ([`LibraryIdentity`], [`SymbolTable`]) and
//!   structured errors
//! - [`lookup`]: pure floor binary search over sorted address tables
//! - [`persist`]: the durable, capacity- and age-bounded store
//! - [`provider`]: the async fetch capability consumed from outside
//! - [`store`]: the orchestrator tying the layers together
//!
//! ## Key Guarantees
//!
//! - **Single-flight**: at most one outstanding provider fetch per library;
//!   concurrent callers share the pending result.
//! - **Failures are never cached**: a rejected or malformed fetch fails every
//!   current waiter and nothing else; the next call retries from scratch.
//! - **Best-effort durability**: a persistent-store failure costs a refetch
//!   after restart, never the caller's result.
//! - **FIFO eviction**: the durable store evicts oldest-inserted-first, and
//!   lazily expires aged entries on read (a zero age limit sweeps everything
//!   at open).
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! let config = SymbolStoreConfig {
//!     store_dir: data_dir,
//!     store_name: "symbol-tables".into(),
//!     max_entry_count: 200,
//!     max_entry_age: Some(Duration::from_secs(7 * 24 * 3600)),
//! };
//! let store = SymbolStore::new(&config, provider)?;
//!
//! let addresses = store.func_address_table_for_lib(&lib).await?;
//! let names = store.symbols_for_addresses_in_lib(&[0, 3], &lib).await?;
//! ```

pub mod domain;
pub mod lookup;
pub mod persist;
pub mod provider;
pub mod store;

pub use domain::{LibraryIdentity, RawSymbolTable, StoreError, SymbolStoreError, SymbolTable};
pub use persist::PersistentSymbolStore;
pub use provider::SymbolProvider;
pub use store::{SymbolStore, SymbolStoreConfig};
