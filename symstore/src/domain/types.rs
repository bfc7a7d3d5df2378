//! Core domain types for symbol resolution

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::SymbolStoreError;
use crate::lookup;

/// Identity of one specific build of one native binary.
///
/// Both fields participate in the cache key: the same library name with a
/// different breakpad ID is a different build with different symbol addresses.
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryIdentity {
    pub debug_name: String,
    pub breakpad_id: String,
}

impl LibraryIdentity {
    #[must_use]
    pub fn new(debug_name: impl Into<String>, breakpad_id: impl Into<String>) -> Self {
        Self { debug_name: debug_name.into(), breakpad_id: breakpad_id.into() }
    }
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.debug_name, self.breakpad_id)
    }
}

/// Symbol data as decoded from the provider's wire format, not yet validated.
///
/// `addresses` are function entry points relative to the library base;
/// `names` is the parallel name array. The provider owns the wire encoding,
/// this crate only requires the two sequences after decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSymbolTable {
    pub addresses: Vec<u64>,
    pub names: Vec<String>,
}

/// One library's resolved symbols: a sorted address table and its parallel
/// name table.
///
/// Invariants, enforced at construction (and on deserialization, so a corrupt
/// cache entry can never produce an unsorted table):
/// - `addresses.len() == names.len()`
/// - `addresses` strictly ascending, no duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSymbolTable", into = "RawSymbolTable")]
pub struct SymbolTable {
    addresses: Vec<u64>,
    names: Vec<String>,
}

impl SymbolTable {
    /// The ascending function entry addresses.
    #[must_use]
    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }

    /// The name table, index-aligned with [`addresses`](Self::addresses).
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of symbols in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Name at a given position in the address table, or `None` if the index
    /// is out of range.
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Resolve a raw address to the owning symbol's name (floor semantics,
    /// see [`lookup::lookup_address`]).
    #[must_use]
    pub fn lookup(&self, query: u64) -> Option<&str> {
        lookup::lookup_address(&self.addresses, &self.names, query)
    }
}

impl TryFrom<RawSymbolTable> for SymbolTable {
    type Error = SymbolStoreError;

    fn try_from(raw: RawSymbolTable) -> Result<Self, Self::Error> {
        if raw.addresses.len() != raw.names.len() {
            return Err(SymbolStoreError::MalformedSymbolTable(format!(
                "{} addresses but {} names",
                raw.addresses.len(),
                raw.names.len()
            )));
        }
        if let Some(pair) = raw.addresses.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(SymbolStoreError::MalformedSymbolTable(format!(
                "addresses not strictly ascending: 0x{:x} followed by 0x{:x}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { addresses: raw.addresses, names: raw.names })
    }
}

impl From<SymbolTable> for RawSymbolTable {
    fn from(table: SymbolTable) -> Self {
        Self { addresses: table.addresses, names: table.names }
    }
}
