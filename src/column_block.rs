//! Caller-owned output buffer for one column across a batch of rows.

use crate::arena::Arena;
use crate::cell::CellRef;
use crate::error::{Error, Result};
use crate::schema::DataType;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq)]
enum ColumnData {
    Bool(Vec<bool>),
    UInt32(Vec<u32>),
    Int32(Vec<i32>),
    UInt64(Vec<u64>),
    Int64(Vec<i64>),
    String(Vec<Bytes>),
}

impl ColumnData {
    fn new(data_type: DataType, nrows: usize) -> Self {
        match data_type {
            DataType::Bool => ColumnData::Bool(vec![false; nrows]),
            DataType::UInt32 => ColumnData::UInt32(vec![0; nrows]),
            DataType::Int32 => ColumnData::Int32(vec![0; nrows]),
            DataType::UInt64 => ColumnData::UInt64(vec![0; nrows]),
            DataType::Int64 => ColumnData::Int64(vec![0; nrows]),
            DataType::String => ColumnData::String(vec![Bytes::new(); nrows]),
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            ColumnData::Bool(_) => DataType::Bool,
            ColumnData::UInt32(_) => DataType::UInt32,
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::UInt64(_) => DataType::UInt64,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::String(_) => DataType::String,
        }
    }

    fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::String(v) => v.len(),
        }
    }
}

/// Fixed-capacity, densely packed array of typed cells for consecutive row
/// ordinals. String cells written through [`ColumnBlock::set_cell`] are
/// always deep-copied into the block's arena.
#[derive(Debug)]
pub struct ColumnBlock<'a> {
    data: ColumnData,
    arena: &'a Arena,
}

macro_rules! typed_accessors {
    ($($get:ident, $get_mut:ident, $variant:ident, $ty:ty);* $(;)?) => {
        $(
            pub fn $get(&self) -> Result<&[$ty]> {
                match &self.data {
                    ColumnData::$variant(values) => Ok(values.as_slice()),
                    other => Err(type_mismatch(DataType::$variant, other.data_type())),
                }
            }

            pub fn $get_mut(&mut self) -> Result<&mut [$ty]> {
                match &mut self.data {
                    ColumnData::$variant(values) => Ok(values.as_mut_slice()),
                    other => Err(type_mismatch(DataType::$variant, other.data_type())),
                }
            }
        )*
    };
}

impl<'a> ColumnBlock<'a> {
    pub fn new(data_type: DataType, nrows: usize, arena: &'a Arena) -> Self {
        Self {
            data: ColumnData::new(data_type, nrows),
            arena,
        }
    }

    pub fn nrows(&self) -> usize {
        self.data.len()
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    typed_accessors! {
        as_bool, as_bool_mut, Bool, bool;
        as_u32, as_u32_mut, UInt32, u32;
        as_i32, as_i32_mut, Int32, i32;
        as_u64, as_u64_mut, UInt64, u64;
        as_i64, as_i64_mut, Int64, i64;
    }

    pub fn as_strings(&self) -> Result<&[Bytes]> {
        match &self.data {
            ColumnData::String(values) => Ok(values.as_slice()),
            other => Err(type_mismatch(DataType::String, other.data_type())),
        }
    }

    pub fn cell(&self, idx: usize) -> Result<CellRef<'_>> {
        self.check_index(idx)?;
        Ok(match &self.data {
            ColumnData::Bool(v) => CellRef::Bool(v[idx]),
            ColumnData::UInt32(v) => CellRef::UInt32(v[idx]),
            ColumnData::Int32(v) => CellRef::Int32(v[idx]),
            ColumnData::UInt64(v) => CellRef::UInt64(v[idx]),
            ColumnData::Int64(v) => CellRef::Int64(v[idx]),
            ColumnData::String(v) => CellRef::String(&v[idx]),
        })
    }

    /// Writes `value` into slot `idx`, copying string payloads into the arena.
    pub fn set_cell(&mut self, idx: usize, value: CellRef<'_>) -> Result<()> {
        self.check_index(idx)?;
        match (&mut self.data, value) {
            (ColumnData::Bool(v), CellRef::Bool(x)) => v[idx] = x,
            (ColumnData::UInt32(v), CellRef::UInt32(x)) => v[idx] = x,
            (ColumnData::Int32(v), CellRef::Int32(x)) => v[idx] = x,
            (ColumnData::UInt64(v), CellRef::UInt64(x)) => v[idx] = x,
            (ColumnData::Int64(v), CellRef::Int64(x)) => v[idx] = x,
            (ColumnData::String(v), CellRef::String(x)) => v[idx] = self.arena.copy_bytes(x)?,
            (data, value) => return Err(type_mismatch(data.data_type(), value.data_type())),
        }
        Ok(())
    }

    /// Seeds every slot with `value`.
    pub fn fill(&mut self, value: CellRef<'_>) -> Result<()> {
        for idx in 0..self.nrows() {
            self.set_cell(idx, value)?;
        }
        Ok(())
    }

    fn check_index(&self, idx: usize) -> Result<()> {
        if idx >= self.nrows() {
            return Err(Error::InvalidState(format!(
                "cell {} out of bounds for block of {} rows",
                idx,
                self.nrows()
            )));
        }
        Ok(())
    }
}

fn type_mismatch(expected: DataType, actual: DataType) -> Error {
    Error::TypeMismatch(format!("expected {}, found {}", expected, actual))
}
