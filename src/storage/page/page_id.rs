use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one page of one table: the owning table's id plus the page's
/// ordinal position within the table's file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeapPageId {
    table_id: usize,
    page_no: usize,
}

impl HeapPageId {
    pub fn new(table_id: usize, page_no: usize) -> HeapPageId {
        HeapPageId { table_id, page_no }
    }

    pub fn table_id(&self) -> usize {
        self.table_id
    }

    pub fn page_no(&self) -> usize {
        self.page_no
    }
}

impl fmt::Display for HeapPageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table_id, self.page_no)
    }
}
