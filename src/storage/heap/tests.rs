use crate::common::utility;
use crate::database::Database;
use crate::storage::heap::HeapFile;
use crate::storage::page::{HeapPage, HeapPageId, Page};
use crate::transaction::TransactionId;
use crate::types::Schema;
use itertools::Itertools;
use std::sync::Arc;

fn scan_ints(db: &Database, tid: TransactionId, table_id: usize) -> Vec<i32> {
    let file = db.catalog().db_file(table_id).unwrap();
    file.iter(db.buffer_pool(), tid)
        .map(|t| match t.unwrap().get_field(0).unwrap() {
            crate::types::Field::Integer(i) => *i,
            other => panic!("expected an integer, got {other}"),
        })
        .collect_vec()
}

#[test]
fn test_new_file_has_no_pages() {
    let desc = Arc::new(Schema::int_columns(&["a"]));
    let (_dir, file) = utility::temp_heap_file(desc);
    assert_eq!(file.num_pages().unwrap(), 0);
}

#[test]
fn test_read_page_grows_on_demand() {
    let desc = Arc::new(Schema::int_columns(&["a"]));
    let (_dir, file) = utility::temp_heap_file(desc);

    let page = file.read_page(&HeapPageId::new(file.id(), 0)).unwrap();
    assert_eq!(file.num_pages().unwrap(), 1);
    assert_eq!(page.empty_slot_count(), page.num_slots());

    // Growth is one page at a time; skipping ahead is refused.
    assert!(file.read_page(&HeapPageId::new(file.id(), 5)).is_err());
}

#[test]
fn test_write_page_round_trip() {
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, file) = utility::temp_heap_file(Arc::clone(&desc));

    let pid = HeapPageId::new(file.id(), 0);
    let mut page = file.read_page(&pid).unwrap();
    page.insert_tuple(&utility::int_tuple(&desc, &[7, 70])).unwrap();
    file.write_page(&page).unwrap();

    let restored = file.read_page(&pid).unwrap();
    assert_eq!(restored.empty_slot_count(), page.empty_slot_count());
    assert_eq!(
        restored
            .get_tuple(&crate::storage::page::RecordId::new(pid, 0))
            .unwrap(),
        utility::int_tuple(&desc, &[7, 70])
    );
}

#[test]
fn test_table_id_stable_across_reopen() {
    let desc = Arc::new(Schema::int_columns(&["a"]));
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("stable.db");

    let first = HeapFile::open(&path, Arc::clone(&desc)).unwrap();
    let second = HeapFile::open(&path, desc).unwrap();
    assert_eq!(first.id(), second.id());
}

#[test]
fn test_insert_then_scan_contains_tuple_once() {
    utility::init_logging();
    let db = Database::with_pool_size(8);
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, table_id) = utility::create_table(&db, "t", Arc::clone(&desc));

    let tid = TransactionId::new();
    db.buffer_pool()
        .insert_tuple(tid, table_id, &utility::int_tuple(&desc, &[1, 10]))
        .unwrap();

    assert_eq!(scan_ints(&db, tid, table_id), vec![1]);
    db.buffer_pool().commit_transaction(tid).unwrap();
}

#[test]
fn test_insert_five_hundred_rows_grows_file() {
    utility::init_logging();
    let db = Database::with_pool_size(8);
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, table_id) = utility::create_table(&db, "t", Arc::clone(&desc));
    let file = db.catalog().db_file(table_id).unwrap();
    assert_eq!(file.num_pages().unwrap(), 0);

    let tid = TransactionId::new();
    for i in 0..500 {
        db.buffer_pool()
            .insert_tuple(tid, table_id, &utility::int_tuple(&desc, &[i, i * 2]))
            .unwrap();
    }

    let capacity = HeapPage::slot_capacity(&desc);
    assert_eq!(file.num_pages().unwrap(), (500 + capacity - 1) / capacity);

    let mut scanned = scan_ints(&db, tid, table_id);
    scanned.sort_unstable();
    assert_eq!(scanned, (0..500).collect_vec());
    db.buffer_pool().commit_transaction(tid).unwrap();
}

#[test]
fn test_capacity_scan_releases_probe_locks() {
    utility::init_logging();
    let db = Database::with_pool_size(8);
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, table_id) = utility::create_table(&db, "t", Arc::clone(&desc));

    // Fill two pages, then insert one more row in a fresh transaction.
    let capacity = HeapPage::slot_capacity(&desc);
    let setup = TransactionId::new();
    for i in 0..(2 * capacity) {
        db.buffer_pool()
            .insert_tuple(setup, table_id, &utility::int_tuple(&desc, &[i as i32, 0]))
            .unwrap();
    }
    db.buffer_pool().commit_transaction(setup).unwrap();

    let tid = TransactionId::new();
    db.buffer_pool()
        .insert_tuple(tid, table_id, &utility::int_tuple(&desc, &[-1, -1]))
        .unwrap();

    // The full pages probed on the way were unlocked again; only the
    // receiving page stays locked.
    let lm = db.buffer_pool().lock_manager();
    assert!(!lm.holds_lock(tid, &HeapPageId::new(table_id, 0)));
    assert!(!lm.holds_lock(tid, &HeapPageId::new(table_id, 1)));
    assert!(lm.holds_lock(tid, &HeapPageId::new(table_id, 2)));
    db.buffer_pool().commit_transaction(tid).unwrap();
}

#[test]
fn test_delete_then_scan_is_empty() {
    utility::init_logging();
    let db = Database::with_pool_size(8);
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, table_id) = utility::create_table(&db, "t", Arc::clone(&desc));

    let tid = TransactionId::new();
    db.buffer_pool()
        .insert_tuple(tid, table_id, &utility::int_tuple(&desc, &[1, 10]))
        .unwrap();

    let file = db.catalog().db_file(table_id).unwrap();
    let stored = file
        .iter(db.buffer_pool(), tid)
        .next()
        .unwrap()
        .unwrap();
    db.buffer_pool().delete_tuple(tid, &stored).unwrap();

    assert!(scan_ints(&db, tid, table_id).is_empty());
    db.buffer_pool().commit_transaction(tid).unwrap();
}

#[test]
fn test_delete_requires_record_id() {
    let db = Database::with_pool_size(8);
    let desc = Arc::new(Schema::int_columns(&["a", "b"]));
    let (_dir, _table_id) = utility::create_table(&db, "t", Arc::clone(&desc));

    let tid = TransactionId::new();
    let unstored = utility::int_tuple(&desc, &[1, 10]);
    assert!(db.buffer_pool().delete_tuple(tid, &unstored).is_err());
}
