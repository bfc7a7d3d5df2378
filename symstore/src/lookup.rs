//! Address table lookup
//!
//! Pure binary-search resolution of raw addresses against a sorted address
//! table. An address that falls between two function entry points belongs to
//! the function that starts below it, so the search finds the greatest entry
//! `<=` the query (floor semantics). There is no upper bound: an address past
//! the last entry still resolves to the last function, since the library's
//! end is unknown.

/// Resolve a raw address to the owning symbol's name.
///
/// `addresses` must be strictly ascending and index-aligned with `names`
/// (guaranteed by [`SymbolTable`](crate::SymbolTable)). Returns `None` when
/// the table is empty or the query precedes the first known function.
#[must_use]
pub fn lookup_address<'a>(addresses: &[u64], names: &'a [String], query: u64) -> Option<&'a str> {
    debug_assert_eq!(addresses.len(), names.len());

    // partition_point returns the count of entries <= query, so the floor
    // entry sits one below it.
    let below_or_equal = addresses.partition_point(|&addr| addr <= query);
    if below_or_equal == 0 {
        return None;
    }
    names.get(below_or_equal - 1).map(String::as_str)
}

/// Batch variant of [`lookup_address`]: one result per query, in query order.
#[must_use]
pub fn lookup_addresses<'a>(
    addresses: &[u64],
    names: &'a [String],
    queries: &[u64],
) -> Vec<Option<&'a str>> {
    queries.iter().map(|&query| lookup_address(addresses, names, query)).collect()
}
