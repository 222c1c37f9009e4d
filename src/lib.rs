//! In-memory, multi-version delta store for a columnar tablet engine.

pub mod arena;
pub mod cell;
pub mod column_block;
pub mod config;
pub mod delta;
pub mod encoding;
pub mod error;
pub mod mvcc;
pub mod schema;

pub use arena::Arena;
pub use cell::{Cell, CellRef};
pub use column_block::ColumnBlock;
pub use config::{ArenaConfig, DeltaStoreConfig};
pub use delta::{
    BaseColumnIterator, DeltaApplier, DeltaIterator, DeltaIteratorMerger, DeltaMemStore,
    DmsIterator, RowOrdinal,
};
pub use encoding::{RowChangeList, RowChangeListDecoder, RowChangeListEncoder};
pub use error::{Error, Result};
pub use mvcc::{MvccManager, ScopedTransaction, Snapshot, Txid};
pub use schema::{ColumnSchema, DataType, Schema};
