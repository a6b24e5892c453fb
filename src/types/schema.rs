use serde::{Deserialize, Serialize};
use std::fmt;

/// Bound on stored string length when a column does not specify one.
pub const DEFAULT_MAX_STR_LEN: u16 = 128;

#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy, Serialize, Deserialize)]
pub enum DataType {
    Int,
    Text,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "int"),
            DataType::Text => write!(f, "varchar"),
        }
    }
}

/// A single column definition: a data type with an advisory name.
#[derive(Eq, PartialEq, Hash, Clone, Debug, Serialize, Deserialize)]
pub struct Column {
    /// Column name. Advisory only; never part of schema equality.
    name: Option<String>,
    data_type: DataType,
    /// Storage bound for text columns; 0 for fixed-width types.
    max_str_len: u16,
}

impl Column {
    pub fn new(name: Option<String>, data_type: DataType, max_str_len: Option<u16>) -> Column {
        Column {
            name,
            data_type,
            max_str_len: match data_type {
                DataType::Int => 0,
                DataType::Text => max_str_len.unwrap_or(DEFAULT_MAX_STR_LEN),
            },
        }
    }

    pub fn builder() -> ColumnBuilder {
        ColumnBuilder::new()
    }

    pub fn get_data_type(&self) -> DataType {
        self.data_type
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn max_str_len(&self) -> u16 {
        self.max_str_len
    }

    /// The serialized width of the column: 4 bytes for integers, a 2-byte
    /// length prefix plus the string bound for text.
    pub fn length_bytes(&self) -> u16 {
        match self.data_type {
            DataType::Int => 4,
            DataType::Text => 2 + self.max_str_len,
        }
    }

    pub fn to_string(&self) -> String {
        let name = self.name.as_deref().unwrap_or("");
        match self.data_type {
            DataType::Text => format!("{}:{}({})", name, self.data_type, self.max_str_len),
            _ => format!("{}:{}", name, self.data_type),
        }
    }
}

pub struct ColumnBuilder {
    name: Option<String>,
    data_type: Option<DataType>,
    max_str_len: Option<u16>,
}

impl ColumnBuilder {
    fn new() -> Self {
        Self {
            name: None,
            data_type: None,
            max_str_len: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn max_str_len(mut self, max_str_len: u16) -> Self {
        self.max_str_len = Some(max_str_len);
        self
    }

    pub fn build(self) -> Column {
        Column::new(
            self.name,
            self.data_type
                .expect("data_type must be specified before building."),
            self.max_str_len,
        )
    }
}

/// An ordered sequence of column definitions describing one tuple layout.
///
/// Two schemas are equal iff their field-type sequences (type and width)
/// are equal; column names never participate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Schema {
        Schema { columns }
    }

    /// Convenience constructor for an all-integer schema with the given
    /// column names.
    pub fn int_columns(names: &[&str]) -> Schema {
        Schema::new(
            names
                .iter()
                .map(|name| Column::builder().name(name).data_type(DataType::Int).build())
                .collect(),
        )
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn get_column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn columns(&self) -> &Vec<Column> {
        &self.columns
    }

    pub fn field_type(&self, index: usize) -> DataType {
        self.columns[index].get_data_type()
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.columns[index].get_name()
    }

    /// The serialized width of one tuple under this schema.
    pub fn tuple_size_bytes(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.length_bytes() as usize)
            .sum()
    }

    pub fn to_string(&self) -> String {
        let inner = self
            .columns
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("({inner})")
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(lhs, rhs)| {
                    lhs.get_data_type() == rhs.get_data_type()
                        && lhs.length_bytes() == rhs.length_bytes()
                })
    }
}

impl Eq for Schema {}

impl std::hash::Hash for Schema {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for column in &self.columns {
            column.get_data_type().hash(state);
            column.length_bytes().hash(state);
        }
    }
}
