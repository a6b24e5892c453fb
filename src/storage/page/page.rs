use crate::common::Result;
use crate::storage::page::page_id::HeapPageId;
use crate::storage::page::record_id::RecordId;
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;

/// The page surface the buffer pool works against: identity, dirty
/// tracking, raw bytes for writeback, and in-place tuple mutation.
pub trait Page {
    /// Returns the identifier of the page.
    fn page_id(&self) -> &HeapPageId;

    /// The transaction that last dirtied the page, if it has uncommitted
    /// changes.
    fn dirtier(&self) -> Option<TransactionId>;

    /// Records `tid` as the transaction responsible for the page's
    /// in-memory changes.
    fn mark_dirty(&mut self, tid: TransactionId);

    /// Clears the dirty flag after a successful flush.
    fn mark_clean(&mut self);

    /// Stores the tuple in the first free slot, stamping its record id and
    /// setting the slot bit. Returns the slot index, or `None` when the
    /// page is full.
    fn insert_tuple(&mut self, tuple: &Tuple) -> Option<u16>;

    /// Clears the slot addressed by `rid`.
    fn delete_tuple(&mut self, rid: &RecordId) -> Result<()>;

    /// Number of free slots remaining on the page.
    fn empty_slot_count(&self) -> usize;

    /// Serializes the page into exactly one disk page worth of bytes.
    fn serialize(&self) -> Vec<u8>;
}
