use crate::common::{Error, Result};
use crate::config::config::HEAP_DB_PAGE_SIZE_BYTES;
use crate::errdata;
use crate::storage::page::page::Page;
use crate::storage::page::page_id::HeapPageId;
use crate::storage::page::record_id::RecordId;
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;
use crate::types::Schema;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

pub type HeapPageHandle = Arc<RwLock<HeapPage>>;

/// One 4096-byte unit of a table file: a slot-occupancy bitmap followed by
/// fixed-width tuple bodies.
///
/// Slot count is derived from the tuple width so that the bitmap and the
/// bodies together fit the page: each stored tuple costs its serialized
/// size in bits times eight, plus one bitmap bit.
#[derive(Clone, Debug)]
pub struct HeapPage {
    pid: HeapPageId,
    desc: Arc<Schema>,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    num_slots: usize,
    dirtier: Option<TransactionId>,
}

impl HeapPage {
    /// Parses a page from one disk page worth of bytes.
    pub fn new(pid: HeapPageId, data: &[u8], desc: Arc<Schema>) -> Result<HeapPage> {
        if data.len() != HEAP_DB_PAGE_SIZE_BYTES {
            return errdata!(
                "page buffer of {} bytes is not a {HEAP_DB_PAGE_SIZE_BYTES}-byte page",
                data.len()
            );
        }
        let num_slots = Self::slot_capacity(&desc);
        let header_size = Self::header_size(num_slots);
        let header = data[..header_size].to_vec();
        let tuple_size = desc.tuple_size_bytes();

        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if Self::slot_bit(&header, slot) {
                let start = header_size + slot * tuple_size;
                let mut tuple = Tuple::deserialize(&data[start..start + tuple_size], &desc)?;
                tuple.set_rid(Some(RecordId::new(pid, slot as u16)));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }

        Ok(HeapPage {
            pid,
            desc,
            header,
            tuples,
            num_slots,
            dirtier: None,
        })
    }

    /// An all-empty page, as written when a heap file grows.
    pub fn empty(pid: HeapPageId, desc: Arc<Schema>) -> HeapPage {
        let num_slots = Self::slot_capacity(&desc);
        HeapPage {
            pid,
            desc,
            header: vec![0; Self::header_size(num_slots)],
            tuples: vec![None; num_slots],
            num_slots,
            dirtier: None,
        }
    }

    /// Number of tuples of the given schema that fit on one page: each
    /// tuple needs its body plus one header bit.
    pub fn slot_capacity(desc: &Schema) -> usize {
        (HEAP_DB_PAGE_SIZE_BYTES * 8) / (desc.tuple_size_bytes() * 8 + 1)
    }

    fn header_size(num_slots: usize) -> usize {
        num_slots.div_ceil(8)
    }

    fn slot_bit(header: &[u8], slot: usize) -> bool {
        header[slot / 8] & (1 << (slot % 8)) != 0
    }

    fn set_slot_bit(&mut self, slot: usize, used: bool) {
        match used {
            true => self.header[slot / 8] |= 1 << (slot % 8),
            false => self.header[slot / 8] &= !(1 << (slot % 8)),
        }
    }

    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    pub fn tuple_desc(&self) -> &Arc<Schema> {
        &self.desc
    }

    /// Retrieves a copy of the tuple stored at `rid`.
    pub fn get_tuple(&self, rid: &RecordId) -> Result<Tuple> {
        let slot = rid.slot_id() as usize;
        if rid.page_id() != self.pid || slot >= self.num_slots {
            return Err(Error::InvalidInput(rid.to_string()));
        }
        self.tuples[slot]
            .clone()
            .ok_or_else(|| Error::InvalidInput(rid.to_string()))
    }

    /// Returns an iterator over the occupied slots of this page.
    pub fn iter(page: HeapPageHandle) -> HeapPageIterator {
        HeapPageIterator {
            page,
            index: AtomicU16::new(0),
        }
    }
}

impl Page for HeapPage {
    fn page_id(&self) -> &HeapPageId {
        &self.pid
    }

    fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    fn mark_dirty(&mut self, tid: TransactionId) {
        self.dirtier = Some(tid);
    }

    fn mark_clean(&mut self) {
        self.dirtier = None;
    }

    fn insert_tuple(&mut self, tuple: &Tuple) -> Option<u16> {
        let slot = (0..self.num_slots).find(|&slot| !Self::slot_bit(&self.header, slot))?;

        let mut stored = tuple.clone();
        stored.set_rid(Some(RecordId::new(self.pid, slot as u16)));
        self.tuples[slot] = Some(stored);
        self.set_slot_bit(slot, true);
        Some(slot as u16)
    }

    fn delete_tuple(&mut self, rid: &RecordId) -> Result<()> {
        let slot = rid.slot_id() as usize;
        if rid.page_id() != self.pid || slot >= self.num_slots {
            return Err(Error::InvalidInput(rid.to_string()));
        }
        if self.tuples[slot].is_none() {
            return Err(Error::InvalidInput(rid.to_string()));
        }
        self.tuples[slot] = None;
        self.set_slot_bit(slot, false);
        Ok(())
    }

    fn empty_slot_count(&self) -> usize {
        (0..self.num_slots)
            .filter(|&slot| !Self::slot_bit(&self.header, slot))
            .count()
    }

    fn serialize(&self) -> Vec<u8> {
        let tuple_size = self.desc.tuple_size_bytes();
        let mut data = self.header.clone();
        for tuple in &self.tuples {
            match tuple {
                Some(tuple) => data.extend(
                    tuple
                        .serialize()
                        .expect("a stored tuple serializes under its own schema"),
                ),
                None => data.extend(std::iter::repeat(0).take(tuple_size)),
            }
        }
        data.resize(HEAP_DB_PAGE_SIZE_BYTES, 0);
        data
    }
}

/// Iterates over the occupied slots of a shared page handle, skipping
/// empty slots. The read latch is taken per step, never held across calls.
pub struct HeapPageIterator {
    page: HeapPageHandle,
    index: AtomicU16,
}

impl HeapPageIterator {
    fn tuple_if_present(
        &self,
        slot: u16,
        page_guard: &RwLockReadGuard<HeapPage>,
    ) -> Option<Tuple> {
        page_guard.tuples[slot as usize].clone()
    }
}

impl Iterator for HeapPageIterator {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        let page_guard = self.page.read().unwrap();
        loop {
            let slot = self.index.fetch_add(1, Ordering::SeqCst);
            if slot as usize >= page_guard.num_slots() {
                return None;
            }
            if let Some(tuple) = self.tuple_if_present(slot, &page_guard) {
                return Some(tuple);
            }
        }
    }
}
