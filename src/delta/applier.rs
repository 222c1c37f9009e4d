//! Read path that merges base column data with deltas.

use super::{DeltaIterator, RowOrdinal};
use crate::column_block::ColumnBlock;
use crate::error::{Error, Result};

/// Cursor over immutable base column data.
pub trait BaseColumnIterator {
    /// Total number of rows in the base data.
    fn num_rows(&self) -> u64;

    fn seek_to_ordinal(&mut self, row: RowOrdinal) -> Result<()>;

    /// Writes `nrows` rows of column `col_idx`, starting at the current
    /// position, into the first `nrows` slots of `dst`. Does not move the
    /// cursor.
    fn materialize_column(
        &mut self,
        col_idx: usize,
        nrows: usize,
        dst: &mut ColumnBlock<'_>,
    ) -> Result<()>;

    fn advance(&mut self, nrows: usize) -> Result<()>;
}

/// Produces snapshot-consistent column blocks: base values first, then the
/// visible deltas on top.
///
/// The base and delta cursors must always sit on the same row. If one of them
/// fails after the other has already moved, the applier is poisoned and every
/// later call fails with `Error::InvalidState`.
#[derive(Debug)]
pub struct DeltaApplier<B, D> {
    base: B,
    deltas: D,
    cur_row: u64,
    /// Set once a batch has been produced; seeks may not go below `cur_row`.
    produced_any: bool,
    initialized: bool,
    poisoned: bool,
}

impl<B: BaseColumnIterator, D: DeltaIterator> DeltaApplier<B, D> {
    pub fn new(base: B, deltas: D) -> Self {
        Self {
            base,
            deltas,
            cur_row: 0,
            produced_any: false,
            initialized: false,
            poisoned: false,
        }
    }

    /// Binds the delta projection and positions both sides at row 0.
    pub fn init(&mut self) -> Result<()> {
        self.deltas.init()?;
        self.initialized = true;
        self.seek_to_ordinal(0)
    }

    pub fn seek_to_ordinal(&mut self, row: RowOrdinal) -> Result<()> {
        self.check_usable("seek")?;
        if u64::from(row) > self.base.num_rows() {
            return Err(Error::InvalidState(format!(
                "row {} past end of {} base rows",
                row,
                self.base.num_rows()
            )));
        }
        if self.produced_any && u64::from(row) < self.cur_row {
            return Err(Error::InvalidState(format!(
                "cannot seek back to row {} from row {}",
                row, self.cur_row
            )));
        }

        let result = self
            .deltas
            .seek_to_ordinal(row)
            .and_then(|()| self.base.seek_to_ordinal(row));
        self.poison_on_err(result)?;
        self.cur_row = u64::from(row);
        Ok(())
    }

    pub fn has_next(&self) -> bool {
        self.initialized && !self.poisoned && self.cur_row < self.base.num_rows()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Fills `dst[i]` with projected column `i` for the next batch and
    /// returns the number of rows produced, 0 at the end of the data.
    ///
    /// The batch is as long as the smallest block allows. Slots past the
    /// returned count are left as they were.
    pub fn next_block(&mut self, dst: &mut [ColumnBlock<'_>]) -> Result<usize> {
        self.check_usable("next_block")?;
        if dst.is_empty() {
            return Err(Error::InvalidState("no column blocks to fill".to_string()));
        }
        if !self.has_next() {
            return Ok(0);
        }

        let remaining = self.base.num_rows() - self.cur_row;
        let nrows = dst
            .iter()
            .map(ColumnBlock::nrows)
            .min()
            .unwrap_or(0)
            .min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if nrows == 0 {
            return Ok(0);
        }

        let result = self.fill_batch(dst, nrows);
        self.poison_on_err(result)?;
        self.cur_row += nrows as u64;
        self.produced_any = true;

        Ok(nrows)
    }

    fn fill_batch(&mut self, dst: &mut [ColumnBlock<'_>], nrows: usize) -> Result<()> {
        self.deltas.prepare_batch(nrows)?;
        for (col_idx, block) in dst.iter_mut().enumerate() {
            self.base.materialize_column(col_idx, nrows, block)?;
            self.deltas.apply_updates(col_idx, block)?;
        }
        self.base.advance(nrows)
    }

    fn check_usable(&self, op: &str) -> Result<()> {
        if !self.initialized {
            return Err(Error::InvalidState(format!("{} before init", op)));
        }
        if self.poisoned {
            return Err(Error::InvalidState(format!(
                "{} on applier poisoned by an earlier failure at row {}",
                op, self.cur_row
            )));
        }
        Ok(())
    }

    fn poison_on_err<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::warn!(row = self.cur_row, error = %e, "Delta applier poisoned");
            self.poisoned = true;
        }
        result
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn deltas(&self) -> &D {
        &self.deltas
    }

    pub fn into_parts(self) -> (B, D) {
        (self.base, self.deltas)
    }
}
