//! Encoded list of column updates for a single row.
//!
//! Layout, repeated once per updated column:
//!
//! ```text
//! +------------------+---------------------------------------------+
//! | column idx (u32) | value                                       |
//! +------------------+---------------------------------------------+
//!                      BOOL          1 byte (0 or 1)
//!                      (U)INT32      4 bytes
//!                      (U)INT64      8 bytes
//!                      STRING        u32 length + bytes
//! ```
//!
//! All integers are little-endian. Column types come from the schema the
//! list was encoded against, so the list itself carries no type tags.

use crate::cell::CellRef;
use crate::error::{Error, Result};
use crate::schema::{DataType, Schema};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

const COLUMN_ID_SIZE: usize = 4;
const LENGTH_PREFIX_SIZE: usize = 4;

/// Builds a change list against a schema. Reuse across rows with `clear`.
#[derive(Debug)]
pub struct RowChangeListEncoder<'s> {
    schema: &'s Schema,
    buf: Vec<u8>,
}

impl<'s> RowChangeListEncoder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            buf: Vec::new(),
        }
    }

    pub fn add_column_update<'v>(
        &mut self,
        col_idx: usize,
        value: impl Into<CellRef<'v>>,
    ) -> Result<()> {
        let value = value.into();
        let column = self.schema.column(col_idx)?;
        if column.data_type() != value.data_type() {
            return Err(Error::TypeMismatch(format!(
                "column '{}' is {}, update is {}",
                column.name(),
                column.data_type(),
                value.data_type()
            )));
        }

        let col_id = u32::try_from(col_idx)
            .map_err(|_| Error::Encoding(format!("column index {} exceeds u32", col_idx)))?;
        self.write(|buf| buf.write_u32::<LittleEndian>(col_id))?;

        match value {
            CellRef::Bool(v) => self.write(|buf| buf.write_u8(u8::from(v))),
            CellRef::UInt32(v) => self.write(|buf| buf.write_u32::<LittleEndian>(v)),
            CellRef::Int32(v) => self.write(|buf| buf.write_i32::<LittleEndian>(v)),
            CellRef::UInt64(v) => self.write(|buf| buf.write_u64::<LittleEndian>(v)),
            CellRef::Int64(v) => self.write(|buf| buf.write_i64::<LittleEndian>(v)),
            CellRef::String(s) => {
                let len = u32::try_from(s.len()).map_err(|_| {
                    Error::Encoding(format!("string of {} bytes is too long", s.len()))
                })?;
                self.write(|buf| buf.write_u32::<LittleEndian>(len))?;
                self.buf.extend_from_slice(s);
                Ok(())
            }
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_change_list(&self) -> RowChangeList<'_> {
        RowChangeList::new(&self.buf)
    }

    fn write(
        &mut self,
        op: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
    ) -> Result<()> {
        op(&mut self.buf).map_err(|e| Error::Encoding(e.to_string()))
    }
}

/// Borrowed view of an encoded change list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowChangeList<'a> {
    data: &'a [u8],
}

impl<'a> RowChangeList<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn decoder(&self, schema: &'a Schema) -> RowChangeListDecoder<'a> {
        RowChangeListDecoder::new(schema, self.data)
    }

    /// Renders the list as `SET a=1, b="x"`.
    pub fn to_debug_string(&self, schema: &Schema) -> String {
        super::format::change_list(schema, *self)
    }

    /// Walks the whole list, failing on the first malformed update.
    pub fn validate(&self, schema: &Schema) -> Result<usize> {
        RowChangeListDecoder::new(schema, self.data).try_fold(0, |n, update| {
            update?;
            Ok(n + 1)
        })
    }
}

/// One `(column, new value)` instruction from a change list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnUpdate<'a> {
    pub col_idx: usize,
    pub value: CellRef<'a>,
}

/// Iterator over the updates in a change list. String values borrow from the
/// encoded buffer. Stops after the first error.
#[derive(Debug)]
pub struct RowChangeListDecoder<'a> {
    schema: &'a Schema,
    remaining: &'a [u8],
}

impl<'a> RowChangeListDecoder<'a> {
    pub fn new(schema: &'a Schema, data: &'a [u8]) -> Self {
        Self {
            schema,
            remaining: data,
        }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining.len() < n {
            return Err(Error::Corruption(format!(
                "truncated {}: need {} bytes, have {}",
                what,
                n,
                self.remaining.len()
            )));
        }
        let (head, tail) = self.remaining.split_at(n);
        self.remaining = tail;
        Ok(head)
    }

    fn decode_next(&mut self) -> Result<ColumnUpdate<'a>> {
        let col_idx = LittleEndian::read_u32(self.take(COLUMN_ID_SIZE, "column id")?) as usize;
        let data_type = self
            .schema
            .column(col_idx)
            .map_err(|_| {
                Error::Corruption(format!(
                    "column index {} not in schema of {} columns",
                    col_idx,
                    self.schema.num_columns()
                ))
            })?
            .data_type();

        let value = match data_type {
            DataType::Bool => match self.take(1, "bool")?[0] {
                0 => CellRef::Bool(false),
                1 => CellRef::Bool(true),
                other => {
                    return Err(Error::Corruption(format!("invalid bool byte {:#x}", other)))
                }
            },
            DataType::UInt32 => CellRef::UInt32(LittleEndian::read_u32(self.take(4, "u32")?)),
            DataType::Int32 => CellRef::Int32(LittleEndian::read_i32(self.take(4, "i32")?)),
            DataType::UInt64 => CellRef::UInt64(LittleEndian::read_u64(self.take(8, "u64")?)),
            DataType::Int64 => CellRef::Int64(LittleEndian::read_i64(self.take(8, "i64")?)),
            DataType::String => {
                let len =
                    LittleEndian::read_u32(self.take(LENGTH_PREFIX_SIZE, "string length")?);
                CellRef::String(self.take(len as usize, "string")?)
            }
        };

        Ok(ColumnUpdate { col_idx, value })
    }
}

impl<'a> Iterator for RowChangeListDecoder<'a> {
    type Item = Result<ColumnUpdate<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        let result = self.decode_next();
        if result.is_err() {
            self.remaining = &[];
        }
        Some(result)
    }
}
