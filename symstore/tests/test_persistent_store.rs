//! Persistent symbol store behavior: capacity eviction, durability across
//! reopen, and age limits.

use std::time::Duration;

use symstore::{LibraryIdentity, PersistentSymbolStore, RawSymbolTable, StoreError, SymbolTable};

fn open(
    dir: &std::path::Path,
    name: &str,
    max_entry_count: usize,
    max_entry_age: Option<Duration>,
) -> PersistentSymbolStore {
    // RUST_LOG=debug surfaces the eviction/expiry log lines when debugging.
    let _ = env_logger::builder().is_test(true).try_init();
    PersistentSymbolStore::open(dir, name, max_entry_count, max_entry_age).unwrap()
}

fn lib(i: usize) -> LibraryIdentity {
    LibraryIdentity::new(format!("lib{i}.so"), format!("BREAKPAD{i:04X}"))
}

fn table(i: usize) -> SymbolTable {
    SymbolTable::try_from(RawSymbolTable {
        addresses: vec![0x0, 0x1000 + i as u64],
        names: vec![format!("lib{i}_start"), format!("lib{i}_func")],
    })
    .expect("test table is well formed")
}

#[test]
fn test_capacity_eviction_is_oldest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path(), "syms", 5, None);

    for i in 0..10 {
        store.store(&lib(i), &table(i)).unwrap();
    }
    assert_eq!(store.len().unwrap(), 5);

    // The first five inserted keys were evicted, the last five survive
    // unmodified.
    for i in 0..5 {
        assert_eq!(store.get(&lib(i)).unwrap(), None, "lib{i} should have been evicted");
    }
    for i in 5..10 {
        assert_eq!(store.get(&lib(i)).unwrap(), Some(table(i)), "lib{i} should survive");
    }
}

#[test]
fn test_durability_across_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let store = open(dir.path(), "syms", 5, None);
    for i in 0..10 {
        store.store(&lib(i), &table(i)).unwrap();
    }
    store.close().unwrap();

    let reopened = open(dir.path(), "syms", 5, None);
    for i in 0..5 {
        assert_eq!(reopened.get(&lib(i)).unwrap(), None);
    }
    for i in 5..10 {
        assert_eq!(reopened.get(&lib(i)).unwrap(), Some(table(i)));
    }
}

#[test]
fn test_fifo_order_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let store = open(dir.path(), "syms", 3, None);
    store.store(&lib(0), &table(0)).unwrap();
    store.store(&lib(1), &table(1)).unwrap();
    store.close().unwrap();

    // Entries stored after a reopen are newer than everything before it, so
    // the pre-reopen entries are the ones evicted at capacity.
    let reopened = open(dir.path(), "syms", 3, None);
    reopened.store(&lib(2), &table(2)).unwrap();
    reopened.store(&lib(3), &table(3)).unwrap();

    assert_eq!(reopened.get(&lib(0)).unwrap(), None);
    assert_eq!(reopened.get(&lib(1)).unwrap(), Some(table(1)));
    assert_eq!(reopened.get(&lib(3)).unwrap(), Some(table(3)));
}

#[test]
fn test_zero_age_limit_sweeps_at_open() {
    let dir = tempfile::tempdir().unwrap();

    let store = open(dir.path(), "syms", 10, None);
    for i in 0..4 {
        store.store(&lib(i), &table(i)).unwrap();
    }
    store.close().unwrap();

    let swept = open(dir.path(), "syms", 10, Some(Duration::ZERO));
    assert_eq!(swept.len().unwrap(), 0);
    for i in 0..4 {
        assert_eq!(swept.get(&lib(i)).unwrap(), None);
    }
}

#[test]
fn test_aged_entries_expire_on_read_after_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let store = open(dir.path(), "syms", 10, None);
    store.store(&lib(0), &table(0)).unwrap();
    store.close().unwrap();

    std::thread::sleep(Duration::from_millis(30));

    let reopened = open(dir.path(), "syms", 10, Some(Duration::from_millis(10)));
    assert_eq!(reopened.get(&lib(0)).unwrap(), None);
}

#[test]
fn test_close_is_a_flush_boundary() {
    let dir = tempfile::tempdir().unwrap();

    let store = open(dir.path(), "syms", 10, None);
    store.store(&lib(0), &table(0)).unwrap();
    store.close().unwrap();
    assert_eq!(store.get(&lib(0)), Err(StoreError::Closed));

    let reopened = open(dir.path(), "syms", 10, None);
    assert_eq!(reopened.get(&lib(0)).unwrap(), Some(table(0)));
}

#[test]
fn test_distinct_store_names_are_independent() {
    let dir = tempfile::tempdir().unwrap();

    let a = open(dir.path(), "syms-a", 10, None);
    let b = open(dir.path(), "syms-b", 10, None);

    a.store(&lib(0), &table(0)).unwrap();
    assert_eq!(a.get(&lib(0)).unwrap(), Some(table(0)));
    assert_eq!(b.get(&lib(0)).unwrap(), None);
}
