use crate::storage::page::page_id::HeapPageId;
use serde::{Deserialize, Serialize};

/// The physical address of one tuple: a page id plus a slot index.
#[derive(Clone, Copy, Debug, Hash, Serialize, Deserialize)]
pub struct RecordId {
    page_id: HeapPageId,
    slot_id: u16,
}

impl RecordId {
    pub fn new(page_id: HeapPageId, slot_id: u16) -> RecordId {
        RecordId { page_id, slot_id }
    }

    pub fn page_id(&self) -> HeapPageId {
        self.page_id
    }

    pub fn slot_id(&self) -> u16 {
        self.slot_id
    }

    pub fn to_string(&self) -> String {
        format!("{}:{}", self.page_id, self.slot_id)
    }
}

impl PartialEq<Self> for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id && self.slot_id == other.slot_id
    }
}

impl Eq for RecordId {}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.page_id
            .cmp(&other.page_id)
            .then(self.slot_id.cmp(&other.slot_id))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod record_id_tests {
    use super::*;

    fn setup() -> RecordId {
        RecordId::new(HeapPageId::new(1, 1), 1)
    }

    #[test]
    fn test_accessors() {
        let rid = setup();
        assert_eq!(HeapPageId::new(1, 1), rid.page_id());
        assert_eq!(1, rid.slot_id());
    }

    #[test]
    fn test_to_string() {
        let rid = setup();
        assert_eq!("1:1:1", rid.to_string());
    }

    #[test]
    fn test_equals() {
        let rid1 = RecordId::new(HeapPageId::new(1, 1), 1);
        let rid1_copy = RecordId::new(HeapPageId::new(1, 1), 1);
        let rid2 = RecordId::new(HeapPageId::new(1, 2), 2);

        assert_eq!(rid1, rid1_copy);
        assert_ne!(rid1, rid2);
    }

    #[test]
    fn test_comparison() {
        let rid1 = RecordId::new(HeapPageId::new(1, 1), 1);
        let rid2 = RecordId::new(HeapPageId::new(1, 1), 2);
        let rid3 = RecordId::new(HeapPageId::new(1, 2), 0);
        let rid4 = RecordId::new(HeapPageId::new(2, 0), 0);

        assert!(rid1 < rid2);
        assert!(rid2 < rid3);
        assert!(rid3 < rid4);
    }
}
