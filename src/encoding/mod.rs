pub mod bincode;
pub mod format;
pub mod row_change_list;

pub use row_change_list::{ColumnUpdate, RowChangeList, RowChangeListDecoder, RowChangeListEncoder};

use crate::error::Result;

/// Values shipped between processes, such as snapshots handed to remote
/// scanners or schemas sent along with them. Every serde type gets this
/// through the bincode impl.
pub trait Value {
    fn encode(&self) -> Result<Vec<u8>>;

    /// Fails with `Error::Encoding` on malformed input.
    fn decode(bytes: &[u8]) -> Result<Self>
    where
        Self: Sized;
}
