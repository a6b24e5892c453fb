use crate::common::Result;
use crate::database::Database;
use crate::errinput;
use crate::execution::operator::OpIterator;
use crate::storage::buffer::BufferPool;
use crate::storage::tuple::Tuple;
use crate::transaction::TransactionId;
use crate::types::{Column, DataType, Field, Schema};
use std::sync::Arc;

/// Schema of the single count tuple emitted by insert and delete.
pub(crate) fn count_desc() -> Arc<Schema> {
    Arc::new(Schema::new(vec![Column::new(None, DataType::Int, None)]))
}

/// Drains its child into the target table through the buffer pool, then
/// emits one single-field tuple holding the number of rows written. Meant
/// to run once per transaction; every fetch after the first returns
/// end-of-stream.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: usize,
    child: Box<dyn OpIterator>,
    desc: Arc<Schema>,
    opened: bool,
    done: bool,
}

impl Insert {
    pub fn new(
        db: &Database,
        tid: TransactionId,
        table_id: usize,
        child: Box<dyn OpIterator>,
    ) -> Result<Insert> {
        let table_desc = db.catalog().tuple_desc(table_id)?;
        if *child.tuple_desc() != *table_desc {
            return errinput!("child schema does not match the target table");
        }
        Ok(Insert {
            pool: Arc::clone(db.buffer_pool()),
            tid,
            table_id,
            child,
            desc: count_desc(),
            opened: false,
            done: false,
        })
    }
}

impl OpIterator for Insert {
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
            return errinput!("cannot rewind a closed insert");
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
            return errinput!("cannot fetch from a closed insert");
        }
        if self.done {
            return Ok(None);
        }

        let mut count = 0i32;
        while let Some(tuple) = self.child.fetch_next()? {
            self.pool.insert_tuple(self.tid, self.table_id, &tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(
            Arc::clone(&self.desc),
            vec![Field::Integer(count)],
        )?))
    }
}
