use crate::schema::DataType;
use bytes::Bytes;

/// A borrowed cell value. String payloads point into whatever buffer the
/// value was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRef<'a> {
    Bool(bool),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    String(&'a [u8]),
}

impl<'a> CellRef<'a> {
    pub fn data_type(&self) -> DataType {
        match self {
            CellRef::Bool(_) => DataType::Bool,
            CellRef::UInt32(_) => DataType::UInt32,
            CellRef::Int32(_) => DataType::Int32,
            CellRef::UInt64(_) => DataType::UInt64,
            CellRef::Int64(_) => DataType::Int64,
            CellRef::String(_) => DataType::String,
        }
    }

    /// Converts to an owned cell whose string payload is a zero-copy slice of
    /// `source`. The borrowed payload must point inside `source`.
    pub fn to_cell_in(&self, source: &Bytes) -> Cell {
        match *self {
            CellRef::Bool(v) => Cell::Bool(v),
            CellRef::UInt32(v) => Cell::UInt32(v),
            CellRef::Int32(v) => Cell::Int32(v),
            CellRef::UInt64(v) => Cell::UInt64(v),
            CellRef::Int64(v) => Cell::Int64(v),
            CellRef::String(s) => Cell::String(source.slice_ref(s)),
        }
    }
}

impl From<bool> for CellRef<'_> {
    fn from(v: bool) -> Self {
        CellRef::Bool(v)
    }
}

impl From<u32> for CellRef<'_> {
    fn from(v: u32) -> Self {
        CellRef::UInt32(v)
    }
}

impl From<i32> for CellRef<'_> {
    fn from(v: i32) -> Self {
        CellRef::Int32(v)
    }
}

impl From<u64> for CellRef<'_> {
    fn from(v: u64) -> Self {
        CellRef::UInt64(v)
    }
}

impl From<i64> for CellRef<'_> {
    fn from(v: i64) -> Self {
        CellRef::Int64(v)
    }
}

impl<'a> From<&'a [u8]> for CellRef<'a> {
    fn from(v: &'a [u8]) -> Self {
        CellRef::String(v)
    }
}

impl<'a> From<&'a str> for CellRef<'a> {
    fn from(v: &'a str) -> Self {
        CellRef::String(v.as_bytes())
    }
}

/// An owned cell value. String payloads are reference-counted slices of an
/// arena chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Bool(bool),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    String(Bytes),
}

impl Cell {
    pub fn as_cell_ref(&self) -> CellRef<'_> {
        match self {
            Cell::Bool(v) => CellRef::Bool(*v),
            Cell::UInt32(v) => CellRef::UInt32(*v),
            Cell::Int32(v) => CellRef::Int32(*v),
            Cell::UInt64(v) => CellRef::UInt64(*v),
            Cell::Int64(v) => CellRef::Int64(*v),
            Cell::String(v) => CellRef::String(v),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.as_cell_ref().data_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cell_in_shares_source() {
        let source = Bytes::from_static(b"xxhelloxx");
        let borrowed = CellRef::String(&source[2..7]);

        match borrowed.to_cell_in(&source) {
            Cell::String(s) => {
                assert_eq!(&s[..], b"hello");
                assert_eq!(s.as_ptr(), source[2..].as_ptr());
            }
            other => panic!("unexpected cell {:?}", other),
        }
    }

    #[test]
    fn test_data_type() {
        assert_eq!(CellRef::from(7u32).data_type(), DataType::UInt32);
        assert_eq!(CellRef::from("s").data_type(), DataType::String);
        assert_eq!(Cell::Int64(-1).data_type(), DataType::Int64);
    }
}
