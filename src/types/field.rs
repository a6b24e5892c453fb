use crate::common::{Error, Result};
use crate::errdata;
use crate::types::schema::{Column, DataType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed value stored in a tuple.
///
/// Fields are immutable, equal by value, and hashable, so they can serve as
/// grouping keys during aggregation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Field {
    Integer(i32),
    Text(String),
}

impl PartialEq for Field {
    fn eq(&self, other: &Field) -> bool {
        match (self, other) {
            (Field::Integer(lhs), Field::Integer(rhs)) => lhs == rhs,
            (Field::Text(lhs), Field::Text(rhs)) => lhs == rhs,
            _ => false,
        }
    }
}

impl Eq for Field {}

impl std::hash::Hash for Field {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Field::Integer(i) => i.hash(state),
            Field::Text(s) => s.hash(state),
        }
    }
}

// For use in sorting and aggregate bucket ordering.
impl Ord for Field {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Field::Integer(lhs), Field::Integer(rhs)) => lhs.cmp(rhs),
            (Field::Text(lhs), Field::Text(rhs)) => lhs.cmp(rhs),
            (Field::Integer(_), Field::Text(_)) => std::cmp::Ordering::Less,
            (Field::Text(_), Field::Integer(_)) => std::cmp::Ordering::Greater,
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Integer(i) => i.fmt(f),
            Field::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for Field {
    fn from(v: i32) -> Self {
        Field::Integer(v)
    }
}

impl From<String> for Field {
    fn from(v: String) -> Self {
        Field::Text(v)
    }
}

impl From<&str> for Field {
    fn from(v: &str) -> Self {
        Field::Text(v.to_owned())
    }
}

impl Field {
    pub fn get_type(&self) -> DataType {
        match self {
            Field::Integer(_) => DataType::Int,
            Field::Text(_) => DataType::Text,
        }
    }

    /// Serializes the field into the fixed-width on-disk layout of the
    /// given column: 4 little-endian bytes for integers, a 2-byte length
    /// prefix followed by a zero-padded buffer of `max_str_len` bytes for
    /// text. Over-long strings are truncated to the column bound.
    pub fn serialize(&self, column: &Column) -> Result<Vec<u8>> {
        match self {
            Field::Integer(i) => Ok(i.to_le_bytes().to_vec()),
            Field::Text(s) => {
                let max = column.max_str_len() as usize;
                let mut payload = s.clone().into_bytes();
                payload.truncate(max);

                let mut data = Vec::with_capacity(2 + max);
                data.extend_from_slice(&(payload.len() as u16).to_le_bytes());
                data.extend_from_slice(&payload);
                data.resize(2 + max, 0);
                Ok(data)
            }
        }
    }

    /// Deserializes a field from the fixed-width layout written by
    /// [`Field::serialize`].
    pub fn deserialize(data: &[u8], column: &Column) -> Result<Field> {
        if data.len() != column.length_bytes() as usize {
            return errdata!(
                "field buffer of {} bytes does not match column width {}",
                data.len(),
                column.length_bytes()
            );
        }
        match column.get_data_type() {
            DataType::Int => Ok(Field::Integer(i32::from_le_bytes(
                data.try_into().map_err(|_| Error::OutOfBounds)?,
            ))),
            DataType::Text => {
                let len = u16::from_le_bytes([data[0], data[1]]) as usize;
                if len > column.max_str_len() as usize {
                    return errdata!("string length {} exceeds column bound", len);
                }
                let s = String::from_utf8(data[2..2 + len].to_vec())
                    .map_err(|e| Error::InvalidData(e.to_string()))?;
                Ok(Field::Text(s))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::schema::Column;

    #[test]
    fn test_value_equality() {
        assert_eq!(Field::Integer(10), Field::Integer(10));
        assert_ne!(Field::Integer(10), Field::Integer(11));
        assert_ne!(Field::Integer(10), Field::from("10"));
        assert_eq!(Field::from("abc"), Field::from("abc"));
    }

    #[test]
    fn test_comparison() {
        assert!(Field::Integer(7) < Field::Integer(10));
        assert!(Field::from("abc") < Field::from("abd"));
    }

    #[test]
    fn test_integer_round_trip() {
        let column = Column::builder().data_type(DataType::Int).build();
        let field = Field::Integer(-42);
        let bytes = field.serialize(&column).unwrap();
        assert_eq!(bytes.len(), column.length_bytes() as usize);
        assert_eq!(Field::deserialize(&bytes, &column).unwrap(), field);
    }

    #[test]
    fn test_text_round_trip() {
        let column = Column::builder()
            .data_type(DataType::Text)
            .max_str_len(16)
            .build();
        let field = Field::from("testing, 1, 2, 3");
        let bytes = field.serialize(&column).unwrap();
        assert_eq!(bytes.len(), column.length_bytes() as usize);
        assert_eq!(Field::deserialize(&bytes, &column).unwrap(), field);
    }

    #[test]
    fn test_text_truncated_to_column_bound() {
        let column = Column::builder()
            .data_type(DataType::Text)
            .max_str_len(4)
            .build();
        let bytes = Field::from("truncated").serialize(&column).unwrap();
        assert_eq!(
            Field::deserialize(&bytes, &column).unwrap(),
            Field::from("trun")
        );
    }
}
