use crate::common::Result;
use crate::errinput;
use crate::execution::operator::OpIterator;
use crate::storage::tuple::Tuple;
use crate::types::Schema;
use std::sync::Arc;

/// Leaf operator over an in-memory list of tuples, the seam through which
/// literal rows enter a plan (and tests feed operators without a table).
pub struct TupleList {
    desc: Arc<Schema>,
    tuples: Vec<Tuple>,
    opened: bool,
    cursor: usize,
}

impl TupleList {
    pub fn new(desc: Arc<Schema>, tuples: Vec<Tuple>) -> Result<TupleList> {
        if let Some(tuple) = tuples.iter().find(|tuple| **tuple.desc() != *desc) {
            return errinput!("tuple {tuple} does not match the list schema");
        }
        Ok(TupleList {
            desc,
            tuples,
            opened: false,
            cursor: 0,
        })
    }
}

impl OpIterator for TupleList {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.opened = false;
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return errinput!("cannot rewind a closed tuple list");
        }
        self.cursor = 0;
        Ok(())
    }

    fn tuple_desc(&self) -> Arc<Schema> {
        Arc::clone(&self.desc)
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.opened {
            return errinput!("cannot fetch from a closed tuple list");
        }
        let tuple = self.tuples.get(self.cursor).cloned();
        self.cursor += 1;
        Ok(tuple)
    }
}
