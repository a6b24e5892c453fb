use crate::common::utility;
use crate::common::Error;
use crate::database::Database;
use crate::storage::page::{HeapPageId, Page};
use crate::transaction::{Permission, TransactionId};
use crate::types::Schema;
use std::sync::Arc;
use tempfile::TempDir;

/// Registers a table whose file already holds `pages` clean pages.
fn table_with_pages(db: &Database, pages: usize) -> (TempDir, usize) {
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (dir, table_id) = utility::create_table(db, "t", desc);
    let file = db.catalog().db_file(table_id).unwrap();
    for page_no in 0..pages {
        file.read_page(&HeapPageId::new(table_id, page_no)).unwrap();
    }
    (dir, table_id)
}

#[test]
fn test_cached_page_is_shared() {
    utility::init_logging();
    let db = Database::with_pool_size(4);
    let (_dir, table_id) = table_with_pages(&db, 1);

    let tid = TransactionId::new();
    let pid = HeapPageId::new(table_id, 0);
    let first = db.buffer_pool().get_page(tid, &pid, Permission::ReadOnly).unwrap();
    let second = db.buffer_pool().get_page(tid, &pid, Permission::ReadOnly).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(db.buffer_pool().is_cached(&pid));
}

#[test]
fn test_idle_and_cached_frames_partition_pool() {
    utility::init_logging();
    let db = Database::with_pool_size(4);
    let (_dir, table_id) = table_with_pages(&db, 3);

    assert_eq!(db.buffer_pool().idle_frames(), 4);
    let tid = TransactionId::new();
    for page_no in 0..3 {
        db.buffer_pool()
            .get_page(tid, &HeapPageId::new(table_id, page_no), Permission::ReadOnly)
            .unwrap();
    }
    assert_eq!(db.buffer_pool().idle_frames(), 1);
    db.buffer_pool().commit_transaction(tid).unwrap();
}

/// Reading three clean pages through a two-frame pool evicts the
/// least-recently-used page.
#[test]
fn test_lru_eviction_order() {
    utility::init_logging();
    let db = Database::with_pool_size(2);
    let (_dir, table_id) = table_with_pages(&db, 3);

    let tid = TransactionId::new();
    for page_no in 0..3 {
        db.buffer_pool()
            .get_page(tid, &HeapPageId::new(table_id, page_no), Permission::ReadOnly)
            .unwrap();
    }

    assert!(!db.buffer_pool().is_cached(&HeapPageId::new(table_id, 0)));
    assert!(db.buffer_pool().is_cached(&HeapPageId::new(table_id, 1)));
    assert!(db.buffer_pool().is_cached(&HeapPageId::new(table_id, 2)));
}

/// Re-touching a page refreshes its timestamp, redirecting eviction.
#[test]
fn test_lru_refresh_on_access() {
    utility::init_logging();
    let db = Database::with_pool_size(2);
    let (_dir, table_id) = table_with_pages(&db, 3);

    let tid = TransactionId::new();
    let pid = |no| HeapPageId::new(table_id, no);
    db.buffer_pool().get_page(tid, &pid(0), Permission::ReadOnly).unwrap();
    db.buffer_pool().get_page(tid, &pid(1), Permission::ReadOnly).unwrap();
    // Touch page 0 again so page 1 becomes the LRU victim.
    db.buffer_pool().get_page(tid, &pid(0), Permission::ReadOnly).unwrap();
    db.buffer_pool().get_page(tid, &pid(2), Permission::ReadOnly).unwrap();

    assert!(db.buffer_pool().is_cached(&pid(0)));
    assert!(!db.buffer_pool().is_cached(&pid(1)));
    assert!(db.buffer_pool().is_cached(&pid(2)));
}

/// NO-STEAL: when every frame holds an uncommitted dirty page, a request
/// for another page aborts instead of stealing one.
#[test]
fn test_dirty_pages_are_never_evicted() {
    utility::init_logging();
    let db = Database::with_pool_size(2);
    let (_dir, table_id) = table_with_pages(&db, 3);

    let tid = TransactionId::new();
    for page_no in 0..2 {
        let handle = db
            .buffer_pool()
            .get_page(tid, &HeapPageId::new(table_id, page_no), Permission::ReadWrite)
            .unwrap();
        handle.write().unwrap().mark_dirty(tid);
    }

    assert_eq!(
        db.buffer_pool()
            .get_page(tid, &HeapPageId::new(table_id, 2), Permission::ReadOnly)
            .err(),
        Some(Error::TransactionAborted)
    );
}

#[test]
fn test_commit_flushes_to_disk() {
    utility::init_logging();
    let db = Database::with_pool_size(4);
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, table_id) = utility::create_table(&db, "t", Arc::clone(&desc));

    let tid = TransactionId::new();
    db.buffer_pool()
        .insert_tuple(tid, table_id, &utility::int_tuple(&desc, &[42, 1]))
        .unwrap();
    db.buffer_pool().commit_transaction(tid).unwrap();

    // The disk image now contains the row, bypassing the pool.
    let file = db.catalog().db_file(table_id).unwrap();
    let page = file.read_page(&HeapPageId::new(table_id, 0)).unwrap();
    assert_eq!(page.empty_slot_count(), page.num_slots() - 1);
    assert_eq!(page.dirtier(), None);

    // And the cached copy was marked clean by the flush.
    let tid2 = TransactionId::new();
    let handle = db
        .buffer_pool()
        .get_page(tid2, &HeapPageId::new(table_id, 0), Permission::ReadOnly)
        .unwrap();
    assert_eq!(handle.read().unwrap().dirtier(), None);
}

/// Deleting a row and aborting leaves the row visible to later
/// transactions: the dirty page is dropped and the disk pre-image rules.
#[test]
fn test_abort_discards_changes() {
    utility::init_logging();
    let db = Database::with_pool_size(4);
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, table_id) = utility::create_table(&db, "t", Arc::clone(&desc));

    let setup = TransactionId::new();
    db.buffer_pool()
        .insert_tuple(setup, table_id, &utility::int_tuple(&desc, &[42, 1]))
        .unwrap();
    db.buffer_pool().commit_transaction(setup).unwrap();

    let deleter = TransactionId::new();
    let file = db.catalog().db_file(table_id).unwrap();
    let stored = file
        .iter(db.buffer_pool(), deleter)
        .next()
        .unwrap()
        .unwrap();
    db.buffer_pool().delete_tuple(deleter, &stored).unwrap();
    db.buffer_pool().abort_transaction(deleter).unwrap();
    assert!(!db.buffer_pool().is_cached(&HeapPageId::new(table_id, 0)));

    let reader = TransactionId::new();
    let rows: Vec<_> = file
        .iter(db.buffer_pool(), reader)
        .map(|t| t.unwrap())
        .collect();
    assert_eq!(rows, vec![utility::int_tuple(&desc, &[42, 1])]);
    db.buffer_pool().commit_transaction(reader).unwrap();
}

#[test]
fn test_transaction_complete_releases_locks() {
    utility::init_logging();
    let db = Database::with_pool_size(4);
    let (_dir, table_id) = table_with_pages(&db, 1);
    let pid = HeapPageId::new(table_id, 0);

    let a = TransactionId::new();
    db.buffer_pool().get_page(a, &pid, Permission::ReadWrite).unwrap();
    db.buffer_pool().commit_transaction(a).unwrap();

    let b = TransactionId::new();
    db.buffer_pool().get_page(b, &pid, Permission::ReadWrite).unwrap();
    assert!(db.buffer_pool().lock_manager().holds_lock(b, &pid));
}

#[test]
fn test_release_page_unblocks_writer() {
    utility::init_logging();
    let db = Database::with_pool_size(4);
    let (_dir, table_id) = table_with_pages(&db, 1);
    let pid = HeapPageId::new(table_id, 0);

    let a = TransactionId::new();
    let b = TransactionId::new();
    db.buffer_pool().get_page(a, &pid, Permission::ReadOnly).unwrap();
    assert!(!db
        .buffer_pool()
        .lock_manager()
        .acquire_lock(b, &pid, Permission::ReadWrite)
        .unwrap());

    db.buffer_pool().release_page(a, &pid);
    db.buffer_pool().get_page(b, &pid, Permission::ReadWrite).unwrap();
    db.buffer_pool().commit_transaction(b).unwrap();
    db.buffer_pool().commit_transaction(a).unwrap();
}

/// Two transactions sharing a page and racing to upgrade deadlock; exactly
/// one is aborted, the other commits.
#[test]
fn test_upgrade_deadlock_aborts_one_transaction() {
    utility::init_logging();
    let db = Database::with_pool_size(4);
    let (_dir, table_id) = table_with_pages(&db, 1);
    let pid = HeapPageId::new(table_id, 0);

    let a = TransactionId::new();
    let b = TransactionId::new();
    db.buffer_pool().get_page(a, &pid, Permission::ReadOnly).unwrap();
    db.buffer_pool().get_page(b, &pid, Permission::ReadOnly).unwrap();

    let aborted: Vec<bool> = crossbeam::thread::scope(|scope| {
        [a, b]
            .map(|tid| {
                let pool = Arc::clone(db.buffer_pool());
                scope.spawn(move |_| match pool.get_page(tid, &pid, Permission::ReadWrite) {
                    Ok(_) => {
                        pool.commit_transaction(tid).unwrap();
                        false
                    }
                    Err(Error::TransactionAborted) => {
                        pool.abort_transaction(tid).unwrap();
                        true
                    }
                    Err(err) => panic!("unexpected error {err}"),
                })
            })
            .map(|handle| handle.join().unwrap())
            .to_vec()
    })
    .unwrap();

    assert_eq!(aborted.iter().filter(|&&aborted| aborted).count(), 1);
}
