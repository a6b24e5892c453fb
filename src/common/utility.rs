//! Shared helpers for building throwaway tables and rows in tests.

use crate::common::Result;
use crate::database::Database;
use crate::storage::heap::HeapFile;
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;
use crate::types::{DataType, Field, Schema};
use once_cell::sync::Lazy;
use rand::{random, Rng};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::sync::Arc;
use tempfile::TempDir;

static LOGGING: Lazy<()> = Lazy::new(|| {
    let _ = env_logger::builder().is_test(true).try_init();
});

/// Initializes the test logger exactly once per process.
pub fn init_logging() {
    Lazy::force(&LOGGING);
}

/// Opens a heap file for `desc` inside a fresh scratch directory. The
/// returned directory guard must be kept alive for as long as the file is
/// used.
pub fn temp_heap_file(desc: Arc<Schema>) -> (TempDir, Arc<HeapFile>) {
    let dir = TempDir::new().expect("unable to create scratch directory");
    let path = dir.path().join("table.db");
    let file = HeapFile::open(&path, desc).expect("unable to open scratch heap file");
    (dir, Arc::new(file))
}

/// Creates and registers a table, returning its scratch directory guard and
/// table id.
pub fn create_table(db: &Database, name: &str, desc: Arc<Schema>) -> (TempDir, usize) {
    let (dir, file) = temp_heap_file(desc);
    let table_id = file.id();
    db.catalog().add_table(file, name);
    (dir, table_id)
}

/// Builds a tuple of integer fields for an all-int schema.
pub fn int_tuple(desc: &Arc<Schema>, values: &[i32]) -> Tuple {
    Tuple::new(
        Arc::clone(desc),
        values.iter().map(|&v| Field::Integer(v)).collect(),
    )
    .expect("values match the schema")
}

/// Inserts one row per entry of `rows` into the table.
pub fn insert_int_rows(
    db: &Database,
    tid: TransactionId,
    table_id: usize,
    rows: &[&[i32]],
) -> Result<()> {
    let desc = db.catalog().tuple_desc(table_id)?;
    for row in rows {
        db.buffer_pool()
            .insert_tuple(tid, table_id, &int_tuple(&desc, row))?;
    }
    Ok(())
}

/// Generates one field per column, deterministic when a seed is given.
pub fn create_random_fields(schema: &Schema, seed: Option<u64>) -> Vec<Field> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(random));

    (0..schema.col_count())
        .map(|i| match schema.field_type(i) {
            DataType::Int => Field::Integer(rng.gen_range(0..1000)),
            DataType::Text => {
                let max = schema.get_column(i).max_str_len();
                let len = rng.gen_range(0..=max.min(32));
                let s: String = (0..len)
                    .map(|_| rng.gen_range(33..123u8) as char)
                    .collect();
                Field::Text(s)
            }
        })
        .collect()
}

/// A random tuple for the given schema.
pub fn create_random_tuple(desc: &Arc<Schema>, seed: Option<u64>) -> Tuple {
    Tuple::new(Arc::clone(desc), create_random_fields(desc, seed))
        .expect("generated fields match the schema")
}
