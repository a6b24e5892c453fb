use crate::common::Result;
use crate::storage::tuple::Tuple;
use crate::types::Field;
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators usable in a filter predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEq,
    LessThan,
    LessThanOrEq,
}

impl CmpOp {
    fn admits(&self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Equals => ordering == Ordering::Equal,
            CmpOp::NotEquals => ordering != Ordering::Equal,
            CmpOp::GreaterThan => ordering == Ordering::Greater,
            CmpOp::GreaterThanOrEq => ordering != Ordering::Less,
            CmpOp::LessThan => ordering == Ordering::Less,
            CmpOp::LessThanOrEq => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CmpOp::Equals => "=",
            CmpOp::NotEquals => "<>",
            CmpOp::GreaterThan => ">",
            CmpOp::GreaterThanOrEq => ">=",
            CmpOp::LessThan => "<",
            CmpOp::LessThanOrEq => "<=",
        };
        f.write_str(symbol)
    }
}

/// Compares one field of each input tuple against a constant operand.
#[derive(Clone, Debug)]
pub struct Predicate {
    field: usize,
    op: CmpOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: CmpOp, operand: Field) -> Predicate {
        Predicate { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> CmpOp {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Whether the tuple satisfies the comparison.
    pub fn eval(&self, tuple: &Tuple) -> Result<bool> {
        let value = tuple.get_field(self.field)?;
        Ok(self.op.admits(value.cmp(&self.operand)))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field[{}] {} {}", self.field, self.op, self.operand)
    }
}
