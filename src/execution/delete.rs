use crate::common::Result;
use crate::database::Database;
use crate::errinput;
use crate::execution::insert::count_desc;
use crate::execution::operator::OpIterator;
use crate::storage::buffer::BufferPool;
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;
use crate::types::{Field, Schema};
use std::sync::Arc;

/// Drains its child, deleting each tuple from its table through the buffer
/// pool, then emits one single-field tuple holding the number of rows
/// removed. The child must produce stored tuples, i.e. tuples carrying
/// record ids.
pub struct Delete {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    desc: Arc<Schema>,
    opened: bool,
    done: bool,
}

impl Delete {
    pub fn new(db: &Database, tid: TransactionId, child: Box<dyn OpIterator>) -> Delete {
        Delete {
            pool: Arc::clone(db.buffer_pool()),
            tid,
            child,
            desc: count_desc(),
            opened: false,
            done: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.opened = true;
        self.done = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()?;
        self.opened = false;
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return errinput!("cannot rewind a closed delete");
        }
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn tuple_desc(&self) -> Arc<Schema> {
        Arc::clone(&self.desc)
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.opened {
            return errinput!("cannot fetch from a closed delete");
        }
        if self.done {
            return Ok(None);
        }

        let mut count = 0i32;
        while let Some(tuple) = self.child.fetch_next()? {
            self.pool.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(
            Arc::clone(&self.desc),
            vec![Field::Integer(count)],
        )?))
    }
}
