use crate::common::{Error, Result};
use crate::config::config::HEAP_DB_PAGE_SIZE_BYTES;
use crate::errdata;
use crate::storage::buffer::BufferPool;
use crate::storage::page::{HeapPage, HeapPageHandle, HeapPageId, HeapPageIterator, Page};
use crate::storage::tuple::Tuple;
use crate::transaction::{Permission, TransactionId};
use crate::types::Schema;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const FILE_POISONED_MSG: &str = "heap file mutex poisoned";

/// A table stored on disk as a headerless sequence of fixed-size pages.
///
/// The file never shrinks; it grows one page at a time when an insert finds
/// no free slot. All reads and writes of page data go through the buffer
/// pool; the heap file itself only moves raw pages and is serialized by its
/// own mutex.
pub struct HeapFile {
    file: Mutex<File>,
    path: PathBuf,
    desc: Arc<Schema>,
    id: usize,
}

impl HeapFile {
    /// Opens (creating if absent) the table file at `path`.
    pub fn open(path: impl AsRef<Path>, desc: Arc<Schema>) -> Result<HeapFile> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        let path = path.as_ref().canonicalize()?;

        Ok(HeapFile {
            file: Mutex::new(file),
            id: Self::table_id_for(&path),
            path,
            desc,
        })
    }

    /// The table id: a hash of the absolute path, so the same file maps to
    /// the same id across process restarts.
    fn table_id_for(path: &Path) -> usize {
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        hasher.finish() as usize
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tuple_desc(&self) -> Arc<Schema> {
        Arc::clone(&self.desc)
    }

    /// Number of whole pages currently in the file.
    pub fn num_pages(&self) -> Result<usize> {
        let file = self.file.lock().expect(FILE_POISONED_MSG);
        Ok(file.metadata()?.len() as usize / HEAP_DB_PAGE_SIZE_BYTES)
    }

    /// Reads the page at `pid`'s offset. Requesting the page one past the
    /// end silently appends an empty page first; that is how the file grows
    /// during insertion.
    pub fn read_page(&self, pid: &HeapPageId) -> Result<HeapPage> {
        if pid.table_id() != self.id {
            return errdata!("page {pid} does not belong to table {}", self.id);
        }
        let mut file = self.file.lock().expect(FILE_POISONED_MSG);
        let num_pages = file.metadata()?.len() as usize / HEAP_DB_PAGE_SIZE_BYTES;
        if pid.page_no() > num_pages {
            return Err(Error::InvalidInput(format!(
                "page {pid} is beyond the end of a {num_pages}-page file"
            )));
        }
        if pid.page_no() == num_pages {
            debug!("growing {} to page {}", self.path.display(), pid.page_no());
            let empty = HeapPage::empty(*pid, Arc::clone(&self.desc));
            Self::write_at(&mut file, pid.page_no(), &empty.serialize())?;
        }

        let mut data = vec![0; HEAP_DB_PAGE_SIZE_BYTES];
        file.seek(SeekFrom::Start(
            (pid.page_no() * HEAP_DB_PAGE_SIZE_BYTES) as u64,
        ))?;
        file.read_exact(&mut data)?;
        HeapPage::new(*pid, &data, Arc::clone(&self.desc))
    }

    /// Writes the page back to its offset in the file.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let mut file = self.file.lock().expect(FILE_POISONED_MSG);
        Self::write_at(&mut file, page.page_id().page_no(), &page.serialize())
    }

    fn write_at(file: &mut File, page_no: usize, data: &[u8]) -> Result<()> {
        file.seek(SeekFrom::Start((page_no * HEAP_DB_PAGE_SIZE_BYTES) as u64))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    /// Finds a page with a free slot and inserts the tuple, growing the
    /// file when every existing page is full. Returns the pages dirtied by
    /// the operation.
    ///
    /// Existing pages are probed under a read lock that is released again
    /// when the page has no room; only the receiving page is re-acquired
    /// for writing. Releasing mid-transaction breaks strict two-phase
    /// locking for these probe locks, which keeps a large insert from
    /// locking the entire table.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<HeapPageHandle>> {
        loop {
            for page_no in 0..self.num_pages()? {
                let pid = HeapPageId::new(self.id, page_no);
                let handle = pool.get_page(tid, &pid, Permission::ReadOnly)?;
                let has_room = handle.read().unwrap().empty_slot_count() > 0;

                if has_room {
                    let handle = pool.get_page(tid, &pid, Permission::ReadWrite)?;
                    let mut page = handle.write().unwrap();
                    if page.insert_tuple(tuple).is_some() {
                        // Marked under the page latch so eviction never
                        // observes the modification on a clean page.
                        page.mark_dirty(tid);
                        drop(page);
                        return Ok(vec![handle]);
                    }
                    // Filled up between the probe and the upgrade; keep
                    // scanning.
                } else {
                    pool.release_page(tid, &pid);
                }
            }

            // Every existing page is full: fetching the page at index
            // `num_pages` makes `read_page` allocate it.
            let pid = HeapPageId::new(self.id, self.num_pages()?);
            let handle = pool.get_page(tid, &pid, Permission::ReadWrite)?;
            let mut page = handle.write().unwrap();
            if page.insert_tuple(tuple).is_some() {
                page.mark_dirty(tid);
                drop(page);
                return Ok(vec![handle]);
            }
            // Another insert claimed the fresh page's last slot first; go
            // around again.
        }
    }

    /// Deletes the tuple at its recorded location. Returns the dirtied
    /// page.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<HeapPageHandle>> {
        let rid = *tuple
            .rid()
            .ok_or_else(|| Error::InvalidData("cannot delete a tuple with no record id".into()))?;
        if rid.page_id().table_id() != self.id {
            return errdata!("record {} does not belong to table {}", rid.to_string(), self.id);
        }

        let handle = pool.get_page(tid, &rid.page_id(), Permission::ReadWrite)?;
        let mut page = handle.write().unwrap();
        page.delete_tuple(&rid)?;
        page.mark_dirty(tid);
        drop(page);
        Ok(vec![handle])
    }

    /// Iterates over every tuple in every page in page order. Pages are
    /// fetched read-locked through the buffer pool.
    pub fn iter<'a>(&'a self, pool: &'a BufferPool, tid: TransactionId) -> HeapFileIterator<'a> {
        HeapFileIterator {
            file: self,
            pool,
            tid,
            next_page_no: 0,
            current: None,
        }
    }
}

/// Sequential scan over a heap file. Yields tuples (with record ids set)
/// page by page; lock acquisition failures surface as iterator errors.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    next_page_no: usize,
    current: Option<HeapPageIterator>,
}

impl Iterator for HeapFileIterator<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(page_iter) = self.current.as_mut() {
                if let Some(tuple) = page_iter.next() {
                    return Some(Ok(tuple));
                }
            }

            match self.file.num_pages() {
                Ok(num_pages) if self.next_page_no >= num_pages => return None,
                Err(err) => return Some(Err(err)),
                Ok(_) => {}
            }

            let pid = HeapPageId::new(self.file.id(), self.next_page_no);
            match self.pool.get_page(self.tid, &pid, Permission::ReadOnly) {
                Ok(handle) => {
                    self.current = Some(HeapPage::iter(handle));
                    self.next_page_no += 1;
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
