use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    UInt32,
    Int32,
    UInt64,
    Int64,
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "BOOL",
            DataType::UInt32 => "UINT32",
            DataType::Int32 => "INT32",
            DataType::UInt64 => "UINT64",
            DataType::Int64 => "INT64",
            DataType::String => "STRING",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    name: String,
    data_type: DataType,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// Ordered set of typed columns, the first `num_key_columns` of which form
/// the row key. Immutable once built; share it with `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    columns: Vec<ColumnSchema>,
    num_key_columns: usize,
}

/// Wire form of [`Schema`], validated through `Schema::new` on decode.
#[derive(Deserialize)]
struct RawSchema {
    columns: Vec<ColumnSchema>,
    num_key_columns: usize,
}

impl TryFrom<RawSchema> for Schema {
    type Error = Error;

    fn try_from(raw: RawSchema) -> Result<Self> {
        Schema::new(raw.columns, raw.num_key_columns)
    }
}

impl Schema {
    pub fn new(columns: Vec<ColumnSchema>, num_key_columns: usize) -> Result<Self> {
        if num_key_columns > columns.len() {
            return Err(Error::InvalidSchema(format!(
                "{} key columns requested but only {} columns defined",
                num_key_columns,
                columns.len()
            )));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
        }

        Ok(Self {
            columns,
            num_key_columns,
        })
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_key_columns(&self) -> usize {
        self.num_key_columns
    }

    pub fn is_key_column(&self, idx: usize) -> bool {
        idx < self.num_key_columns
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Result<&ColumnSchema> {
        self.columns.get(idx).ok_or(Error::ColumnOutOfRange {
            index: idx,
            num_columns: self.columns.len(),
        })
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Builds a key-less schema holding the named columns, in the given order.
    pub fn project(&self, names: &[&str]) -> Result<Schema> {
        let columns = names
            .iter()
            .map(|name| {
                self.find_column(name)
                    .map(|idx| self.columns[idx].clone())
                    .ok_or_else(|| Error::Projection(format!("unknown column '{}'", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Schema::new(columns, 0)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema [")?;
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", column.name(), column.data_type())?;
            if self.is_key_column(idx) {
                write!(f, " (key)")?;
            }
        }
        write!(f, "]")
    }
}
