use crate::common::Result;
use crate::errinput;
use crate::execution::operator::OpIterator;
use crate::execution::predicate::Predicate;
use crate::storage::tuple::Tuple;
use crate::types::Schema;
use std::sync::Arc;

/// Emits the child tuples that satisfy a predicate. Output schema equals
/// the child's.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    opened: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Filter {
        Filter {
            predicate,
            child,
            opened: false,
        }
    }

    pub fn child(&self) -> &dyn OpIterator {
        self.child.as_ref()
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()?;
        self.opened = false;
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return errinput!("cannot rewind a closed filter");
        }
        self.child.rewind()
    }

    fn tuple_desc(&self) -> Arc<Schema> {
        self.child.tuple_desc()
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.opened {
            return errinput!("cannot fetch from a closed filter");
        }
        while let Some(tuple) = self.child.fetch_next()? {
            if self.predicate.eval(&tuple)? {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}
