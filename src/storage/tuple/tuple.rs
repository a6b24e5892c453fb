use crate::common::{Error, Result};
use crate::errinput;
use crate::storage::page::RecordId;
use crate::types::{Field, Schema};
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

/// A schema plus an array of field values of matching arity, with the
/// record id of its physical location once it has been stored in a page.
///
/// Equality is value-based: two tuples are equal when their schemas and
/// field values agree, regardless of where they live on disk.
#[derive(Clone, Debug)]
pub struct Tuple {
    desc: Arc<Schema>,
    fields: Vec<Field>,
    rid: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: Arc<Schema>, fields: Vec<Field>) -> Result<Tuple> {
        if fields.len() != desc.col_count() {
            return errinput!(
                "{} fields do not fit a {}-column schema",
                fields.len(),
                desc.col_count()
            );
        }
        for (index, field) in fields.iter().enumerate() {
            if field.get_type() != desc.field_type(index) {
                return errinput!(
                    "field {index} is {} but the column is {}",
                    field.get_type(),
                    desc.field_type(index)
                );
            }
        }
        Ok(Tuple {
            desc,
            fields,
            rid: None,
        })
    }

    pub fn desc(&self) -> &Arc<Schema> {
        &self.desc
    }

    pub fn get_field(&self, index: usize) -> Result<&Field> {
        self.fields.get(index).ok_or(Error::OutOfBounds)
    }

    pub fn set_field(&mut self, index: usize, field: Field) -> Result<()> {
        let slot = self.fields.get_mut(index).ok_or(Error::OutOfBounds)?;
        if slot.get_type() != field.get_type() {
            return errinput!("cannot store a {} in a {} column", field.get_type(), slot.get_type());
        }
        *slot = field;
        Ok(())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rid(&self) -> Option<&RecordId> {
        self.rid.as_ref()
    }

    pub fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    /// Serializes the tuple into its fixed-width on-disk layout: each field
    /// occupies exactly its column's `length_bytes`, in column order.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.desc.tuple_size_bytes());
        for (index, field) in self.fields.iter().enumerate() {
            data.extend(field.serialize(self.desc.get_column(index))?);
        }
        Ok(data)
    }

    /// Deserializes a tuple from the layout written by [`Tuple::serialize`].
    pub fn deserialize(data: &[u8], desc: &Arc<Schema>) -> Result<Tuple> {
        if data.len() != desc.tuple_size_bytes() {
            return Err(Error::InvalidData(format!(
                "tuple buffer of {} bytes does not match schema width {}",
                data.len(),
                desc.tuple_size_bytes()
            )));
        }
        let mut fields = Vec::with_capacity(desc.col_count());
        let mut cursor = 0;
        for index in 0..desc.col_count() {
            let column = desc.get_column(index);
            let width = column.length_bytes() as usize;
            fields.push(Field::deserialize(&data[cursor..cursor + width], column)?);
            cursor += width;
        }
        Tuple::new(Arc::clone(desc), fields)
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.fields == other.fields
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.iter().map(|v| v.to_string()).join(", "))
    }
}
