use crate::common::{Error, Result};
use crate::storage::heap::HeapFile;
use crate::types::Schema;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const CATALOG_POISONED_MSG: &str = "catalog state lock poisoned";

/// Registry of the tables in the database, addressable by table id or by
/// name. The buffer pool relies on it to find the heap file behind a page.
pub struct Catalog {
    state: RwLock<CatalogState>,
}

#[derive(Default)]
struct CatalogState {
    files: HashMap<usize, Arc<HeapFile>>,
    names: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog {
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Registers a table under the given name. A table re-registered under
    /// an existing name replaces the previous entry.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str) {
        let mut state = self.state.write().expect(CATALOG_POISONED_MSG);
        state.names.insert(name.to_string(), file.id());
        state.files.insert(file.id(), file);
    }

    pub fn db_file(&self, table_id: usize) -> Result<Arc<HeapFile>> {
        let state = self.state.read().expect(CATALOG_POISONED_MSG);
        state
            .files
            .get(&table_id)
            .map(Arc::clone)
            .ok_or_else(|| Error::InvalidInput(format!("no table with id {table_id}")))
    }

    pub fn tuple_desc(&self, table_id: usize) -> Result<Arc<Schema>> {
        Ok(self.db_file(table_id)?.tuple_desc())
    }

    pub fn table_id(&self, name: &str) -> Option<usize> {
        let state = self.state.read().expect(CATALOG_POISONED_MSG);
        state.names.get(name).copied()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
