use crate::common::Result;
use crate::database::Database;
use crate::errinput;
use crate::execution::operator::OpIterator;
use crate::storage::buffer::BufferPool;
use crate::storage::heap::HeapFile;
use crate::storage::page::{HeapPage, HeapPageId, HeapPageIterator};
use crate::storage::tuple::Tuple;
use crate::transaction::{Permission, TransactionId};
use crate::types::Schema;
use std::sync::Arc;

/// Leaf operator: a sequential scan of one table, page by page in page
/// order. Every page is fetched read-locked through the buffer pool on
/// behalf of the scanning transaction.
pub struct SeqScan {
    pool: Arc<BufferPool>,
    file: Arc<HeapFile>,
    tid: TransactionId,
    desc: Arc<Schema>,
    opened: bool,
    next_page_no: usize,
    page_iter: Option<HeapPageIterator>,
}

impl SeqScan {
    pub fn new(db: &Database, tid: TransactionId, table_id: usize) -> Result<SeqScan> {
        let file = db.catalog().db_file(table_id)?;
        Ok(SeqScan {
            pool: Arc::clone(db.buffer_pool()),
            desc: file.tuple_desc(),
            file,
            tid,
            opened: false,
            next_page_no: 0,
            page_iter: None,
        })
    }

    pub fn table_id(&self) -> usize {
        self.file.id()
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.next_page_no = 0;
        self.page_iter = None;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.opened = false;
        self.page_iter = None;
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return errinput!("cannot rewind a closed scan");
        }
        self.next_page_no = 0;
        self.page_iter = None;
        Ok(())
    }

    fn tuple_desc(&self) -> Arc<Schema> {
        Arc::clone(&self.desc)
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.opened {
            return errinput!("cannot fetch from a closed scan");
        }
        loop {
            if let Some(page_iter) = self.page_iter.as_mut() {
                if let Some(tuple) = page_iter.next() {
                    return Ok(Some(tuple));
                }
            }

            if self.next_page_no >= self.file.num_pages()? {
                return Ok(None);
            }
            let pid = HeapPageId::new(self.file.id(), self.next_page_no);
            let handle = self.pool.get_page(self.tid, &pid, Permission::ReadOnly)?;
            self.page_iter = Some(HeapPage::iter(handle));
            self.next_page_no += 1;
        }
    }
}
