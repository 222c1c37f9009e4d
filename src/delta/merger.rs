use super::{DeltaIterator, RowOrdinal};
use crate::column_block::ColumnBlock;
use crate::error::Result;

/// Stacks several delta sources behind one [`DeltaIterator`].
///
/// Every call is forwarded to each source in the order they were given, so
/// when two sources update the same cell the later source wins. Callers list
/// sources oldest first.
pub struct DeltaIteratorMerger<'a> {
    iters: Vec<Box<dyn DeltaIterator + 'a>>,
}

impl<'a> DeltaIteratorMerger<'a> {
    pub fn new(iters: Vec<Box<dyn DeltaIterator + 'a>>) -> Self {
        Self { iters }
    }

    /// Returns the single source unwrapped when there is nothing to merge.
    pub fn create(mut iters: Vec<Box<dyn DeltaIterator + 'a>>) -> Box<dyn DeltaIterator + 'a> {
        if iters.len() == 1 {
            if let Some(only) = iters.pop() {
                return only;
            }
        }
        Box::new(Self::new(iters))
    }

    pub fn len(&self) -> usize {
        self.iters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iters.is_empty()
    }
}

impl DeltaIterator for DeltaIteratorMerger<'_> {
    fn init(&mut self) -> Result<()> {
        self.iters.iter_mut().try_for_each(|iter| iter.init())
    }

    fn seek_to_ordinal(&mut self, row: RowOrdinal) -> Result<()> {
        self.iters.iter_mut().try_for_each(|iter| iter.seek_to_ordinal(row))
    }

    fn prepare_batch(&mut self, nrows: usize) -> Result<()> {
        self.iters.iter_mut().try_for_each(|iter| iter.prepare_batch(nrows))
    }

    fn apply_updates(&mut self, col_idx: usize, dst: &mut ColumnBlock<'_>) -> Result<()> {
        self.iters
            .iter_mut()
            .try_for_each(|iter| iter.apply_updates(col_idx, dst))
    }
}
