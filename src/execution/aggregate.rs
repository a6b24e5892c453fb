use crate::common::Result;
use crate::errinput;
use crate::execution::operator::OpIterator;
use crate::storage::tuple::Tuple;
use crate::types::{Column, DataType, Field, Schema};
use itertools::Itertools;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The supported aggregate operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Sum => "sum",
            AggOp::Avg => "avg",
            AggOp::Count => "count",
        };
        f.write_str(name)
    }
}

/// Accumulates integer aggregates, bucketed by an optional group-by field.
///
/// Each bucket carries a merge count and a folded value. The first tuple
/// of a bucket seeds `count = 1, value = v`; later tuples bump the count
/// and fold the value by the operator (COUNT leaves the value untouched,
/// AVG keeps the running sum and divides on readout).
pub struct IntegerAggregator {
    gfield: Option<usize>,
    afield: usize,
    op: AggOp,
    groups: BTreeMap<Option<Field>, IntBucket>,
}

struct IntBucket {
    count: i32,
    value: i32,
}

impl IntegerAggregator {
    pub fn new(gfield: Option<usize>, afield: usize, op: AggOp) -> IntegerAggregator {
        IntegerAggregator {
            gfield,
            afield,
            op,
            groups: BTreeMap::new(),
        }
    }

    /// Folds one tuple into its group's bucket.
    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let key = match self.gfield {
            Some(gfield) => Some(tuple.get_field(gfield)?.clone()),
            None => None,
        };
        let Field::Integer(value) = *tuple.get_field(self.afield)? else {
            return errinput!("integer aggregator applied to a non-integer field");
        };

        match self.groups.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(IntBucket { count: 1, value });
            }
            Entry::Occupied(mut entry) => {
                let bucket = entry.get_mut();
                bucket.count += 1;
                match self.op {
                    AggOp::Min => bucket.value = bucket.value.min(value),
                    AggOp::Max => bucket.value = bucket.value.max(value),
                    AggOp::Sum | AggOp::Avg => bucket.value += value,
                    AggOp::Count => {}
                }
            }
        }
        Ok(())
    }

    /// Per-group readout in group-key order. AVG divides with integer
    /// truncation toward zero.
    pub fn results(self) -> Vec<(Option<Field>, i32)> {
        let op = self.op;
        self.groups
            .into_iter()
            .map(|(key, bucket)| {
                let value = match op {
                    AggOp::Min | AggOp::Max | AggOp::Sum => bucket.value,
                    AggOp::Count => bucket.count,
                    AggOp::Avg => bucket.value / bucket.count,
                };
                (key, value)
            })
            .collect_vec()
    }
}

/// Counts string tuples per group. COUNT is the only operator a string
/// column supports; anything else is rejected when the aggregator is
/// constructed.
pub struct StringAggregator {
    gfield: Option<usize>,
    afield: usize,
    groups: BTreeMap<Option<Field>, i32>,
}

impl StringAggregator {
    pub fn new(gfield: Option<usize>, afield: usize, op: AggOp) -> Result<StringAggregator> {
        if op != AggOp::Count {
            return errinput!("string aggregator supports only count, not {op}");
        }
        Ok(StringAggregator {
            gfield,
            afield,
            groups: BTreeMap::new(),
        })
    }

    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let key = match self.gfield {
            Some(gfield) => Some(tuple.get_field(gfield)?.clone()),
            None => None,
        };
        let Field::Text(_) = tuple.get_field(self.afield)? else {
            return errinput!("string aggregator applied to a non-string field");
        };

        *self.groups.entry(key).or_insert(0) += 1;
        Ok(())
    }

    pub fn results(self) -> Vec<(Option<Field>, i32)> {
        self.groups.into_iter().collect_vec()
    }
}

enum Aggregator {
    Int(IntegerAggregator),
    Str(StringAggregator),
}

impl Aggregator {
    fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        match self {
            Aggregator::Int(agg) => agg.merge(tuple),
            Aggregator::Str(agg) => agg.merge(tuple),
        }
    }

    fn results(self) -> Vec<(Option<Field>, i32)> {
        match self {
            Aggregator::Int(agg) => agg.results(),
            Aggregator::Str(agg) => agg.results(),
        }
    }
}

/// Grouped aggregation over a single child.
///
/// On `open` the entire child is folded into the aggregator in one pass;
/// fetches then walk the per-group results. Ungrouped output is a single
/// `(INT)` tuple in a column named after the operator; grouped output is
/// `(group, INT)` with columns named after the child's.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    gfield: Option<usize>,
    afield: usize,
    op: AggOp,
    desc: Arc<Schema>,
    opened: bool,
    results: Vec<Tuple>,
    cursor: usize,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        gfield: Option<usize>,
        afield: usize,
        op: AggOp,
    ) -> Result<Aggregate> {
        let child_desc = child.tuple_desc();
        if afield >= child_desc.col_count() {
            return errinput!("aggregate field {afield} is out of range");
        }
        if let Some(gfield) = gfield {
            if gfield >= child_desc.col_count() {
                return errinput!("group-by field {gfield} is out of range");
            }
        }
        // Rejects unsupported operator/type combinations up front.
        Self::build_aggregator(&child_desc, gfield, afield, op)?;

        let desc = Self::output_desc(&child_desc, gfield, afield, op);
        Ok(Aggregate {
            child,
            gfield,
            afield,
            op,
            desc,
            opened: false,
            results: Vec::new(),
            cursor: 0,
        })
    }

    fn build_aggregator(
        child_desc: &Schema,
        gfield: Option<usize>,
        afield: usize,
        op: AggOp,
    ) -> Result<Aggregator> {
        match child_desc.field_type(afield) {
            DataType::Int => Ok(Aggregator::Int(IntegerAggregator::new(gfield, afield, op))),
            DataType::Text => Ok(Aggregator::Str(StringAggregator::new(gfield, afield, op)?)),
        }
    }

    fn output_desc(
        child_desc: &Schema,
        gfield: Option<usize>,
        afield: usize,
        op: AggOp,
    ) -> Arc<Schema> {
        match gfield {
            None => Arc::new(Schema::new(vec![Column::builder()
                .name(&op.to_string())
                .data_type(DataType::Int)
                .build()])),
            Some(gfield) => {
                let group_column = child_desc.get_column(gfield).clone();
                let agg_column = Column::new(
                    child_desc.field_name(afield).map(str::to_string),
                    DataType::Int,
                    None,
                );
                Arc::new(Schema::new(vec![group_column, agg_column]))
            }
        }
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;

        let child_desc = self.child.tuple_desc();
        let mut aggregator =
            Self::build_aggregator(&child_desc, self.gfield, self.afield, self.op)?;
        while let Some(tuple) = self.child.fetch_next()? {
            aggregator.merge(&tuple)?;
        }

        self.results = aggregator
            .results()
            .into_iter()
            .map(|(key, value)| {
                let fields = match key {
                    Some(group) => vec![group, Field::Integer(value)],
                    None => vec![Field::Integer(value)],
                };
                Tuple::new(Arc::clone(&self.desc), fields)
            })
            .collect::<Result<Vec<_>>>()?;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.child.close()?;
        self.results.clear();
        self.opened = false;
        Ok(())
    }

    fn rewind(&mut self) -> Result<()> {
        if !self.opened {
            return errinput!("cannot rewind a closed aggregate");
        }
        self.close()?;
        self.open()
    }

    fn tuple_desc(&self) -> Arc<Schema> {
        Arc::clone(&self.desc)
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        if !self.opened {
            return errinput!("cannot fetch from a closed aggregate");
        }
        let tuple = self.results.get(self.cursor).cloned();
        self.cursor += 1;
        Ok(tuple)
    }
}
