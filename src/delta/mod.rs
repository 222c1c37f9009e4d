//! Delta stores and the batched iteration protocol that applies them.
//!
//! # Iteration Protocol
//!
//! Every delta source implements [`DeltaIterator`]. A reader drives it in
//! two phases per batch:
//!
//! ```text
//!   init() ──► seek_to_ordinal(row) ──► prepare_batch(n) ──► apply_updates(col, block)
//!                                            ▲                      │ (once per column)
//!                                            └──────────────────────┘
//! ```
//!
//! 1. **Prepare**: scan the deltas for the next `n` rows, keep the ones the
//!    snapshot considers committed, and stage their decoded values per
//!    projected column.
//! 2. **Apply**: for one projected column, overwrite the slots of a
//!    caller-owned [`ColumnBlock`] with the staged values. Rows without a
//!    visible update are left untouched, so the caller seeds them first
//!    (typically from base data, see [`DeltaApplier`]).
//!
//! Within a row, staged updates are ordered by increasing txid, so applying
//! them in order leaves the latest visible write standing.

pub mod applier;
pub mod iterator;
pub mod memstore;
pub mod merger;

pub use applier::{BaseColumnIterator, DeltaApplier};
pub use iterator::DmsIterator;
pub use memstore::{DeltaKey, DeltaMemStore};
pub use merger::DeltaIteratorMerger;

use crate::column_block::ColumnBlock;
use crate::error::Result;

/// Row ordinal within a tablet's base data.
pub type RowOrdinal = u32;

/// Batched, forward-only cursor over a delta source.
pub trait DeltaIterator {
    /// Binds the iterator to its projection. Fails if called twice.
    fn init(&mut self) -> Result<()>;

    /// Positions the cursor at `row`. Seeking backwards once a batch has
    /// been prepared is not supported.
    fn seek_to_ordinal(&mut self, row: RowOrdinal) -> Result<()>;

    /// Stages the visible deltas for rows `[position, position + nrows)` and
    /// advances the position by `nrows`.
    fn prepare_batch(&mut self, nrows: usize) -> Result<()>;

    /// Applies the staged deltas for projected column `col_idx` to `dst`,
    /// whose slot `i` holds row `batch_start + i`.
    fn apply_updates(&mut self, col_idx: usize, dst: &mut ColumnBlock<'_>) -> Result<()>;
}

impl<I: DeltaIterator + ?Sized> DeltaIterator for Box<I> {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn seek_to_ordinal(&mut self, row: RowOrdinal) -> Result<()> {
        (**self).seek_to_ordinal(row)
    }

    fn prepare_batch(&mut self, nrows: usize) -> Result<()> {
        (**self).prepare_batch(nrows)
    }

    fn apply_updates(&mut self, col_idx: usize, dst: &mut ColumnBlock<'_>) -> Result<()> {
        (**self).apply_updates(col_idx, dst)
    }
}
