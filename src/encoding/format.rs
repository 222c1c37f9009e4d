//! Human-readable rendering of cells, change lists and delta entries, used in
//! debug dumps and trace logs.

use super::row_change_list::RowChangeList;
use crate::cell::CellRef;
use crate::mvcc::Txid;
use crate::schema::Schema;
use itertools::Itertools as _;

/// Formats raw byte slices without any decoding.
pub struct Raw;

impl Raw {
    /// Formats raw bytes as escaped ASCII strings.
    pub fn bytes(bytes: &[u8]) -> String {
        let escaped = bytes
            .iter()
            .copied()
            .flat_map(std::ascii::escape_default)
            .collect_vec();
        format!("\"{}\"", String::from_utf8_lossy(&escaped))
    }
}

pub fn cell(value: CellRef<'_>) -> String {
    match value {
        CellRef::Bool(v) => v.to_string(),
        CellRef::UInt32(v) => v.to_string(),
        CellRef::Int32(v) => v.to_string(),
        CellRef::UInt64(v) => v.to_string(),
        CellRef::Int64(v) => v.to_string(),
        CellRef::String(s) => Raw::bytes(s),
    }
}

/// Renders a change list as `SET a=1, b="x"`. A list that fails to decode
/// is rendered with the error in place of the remaining updates.
pub fn change_list(schema: &Schema, changes: RowChangeList<'_>) -> String {
    let rendered = changes
        .decoder(schema)
        .map(|update| match update {
            Ok(update) => {
                let name = schema
                    .column(update.col_idx)
                    .map(|c| c.name())
                    .unwrap_or("?");
                format!("{}={}", name, cell(update.value))
            }
            Err(e) => format!("<{}>", e),
        })
        .join(", ");
    format!("SET {}", rendered)
}

/// Renders one delta entry as `@row txid N: SET ...`.
pub fn delta_entry(schema: &Schema, row: u32, txid: Txid, changes: RowChangeList<'_>) -> String {
    format!("@{} txid {}: {}", row, txid, change_list(schema, changes))
}
