use super::memstore::{DeltaKey, DeltaMemStore};
use super::{DeltaIterator, RowOrdinal};
use crate::cell::Cell;
use crate::column_block::ColumnBlock;
use crate::encoding::RowChangeList;
use crate::error::{Error, Result};
use crate::mvcc::{Snapshot, Txid};
use crate::schema::Schema;
use std::ops::Bound;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Initialized,
    Positioned,
    Prepared,
}

/// One staged write, relative to the start of the prepared batch.
#[derive(Debug, Clone, PartialEq)]
struct PreparedUpdate {
    row_offset: usize,
    txid: Txid,
    value: Cell,
}

/// Iterator over the deltas of one [`DeltaMemStore`] as seen by a snapshot.
///
/// The projection is only bound to the store schema in [`init`], so creating
/// an iterator never fails.
///
/// [`init`]: DeltaIterator::init
#[derive(Debug)]
pub struct DmsIterator<'a> {
    dms: &'a DeltaMemStore,
    projection: Schema,
    snapshot: Snapshot,
    state: State,
    /// Store column index -> projected column index.
    projection_map: Vec<Option<usize>>,
    cur_row: u64,
    /// End of the furthest batch prepared so far. Seeks may not go below it.
    high_water: Option<u64>,
    prepared_count: usize,
    /// Per projected column, ordered by (row, txid).
    prepared: Vec<Vec<PreparedUpdate>>,
}

impl<'a> DmsIterator<'a> {
    pub(super) fn new(dms: &'a DeltaMemStore, projection: Schema, snapshot: Snapshot) -> Self {
        Self {
            dms,
            projection,
            snapshot,
            state: State::Created,
            projection_map: Vec::new(),
            cur_row: 0,
            high_water: None,
            prepared_count: 0,
            prepared: Vec::new(),
        }
    }

    /// Number of rows covered by the prepared batch.
    pub fn prepared_rows(&self) -> usize {
        self.prepared_count
    }

    /// Row the next batch starts at.
    pub fn position(&self) -> u64 {
        self.cur_row
    }

    pub fn projection(&self) -> &Schema {
        &self.projection
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn batch_start(&self) -> u64 {
        self.cur_row - self.prepared_count as u64
    }
}

impl DeltaIterator for DmsIterator<'_> {
    fn init(&mut self) -> Result<()> {
        if self.state != State::Created {
            return Err(Error::InvalidState("iterator already initialized".to_string()));
        }

        let schema = self.dms.schema();
        let mut projection_map = vec![None; schema.num_columns()];
        for (proj_idx, column) in self.projection.columns().iter().enumerate() {
            let store_idx = schema.find_column(column.name()).ok_or_else(|| {
                Error::Projection(format!("column {} not in store schema", column.name()))
            })?;
            let store_type = schema.column(store_idx)?.data_type();
            if store_type != column.data_type() {
                return Err(Error::Projection(format!(
                    "column {} is {} in store, {} in projection",
                    column.name(),
                    store_type,
                    column.data_type()
                )));
            }
            projection_map[store_idx] = Some(proj_idx);
        }

        self.projection_map = projection_map;
        self.prepared = vec![Vec::new(); self.projection.num_columns()];
        self.state = State::Initialized;
        Ok(())
    }

    fn seek_to_ordinal(&mut self, row: RowOrdinal) -> Result<()> {
        if self.state == State::Created {
            return Err(Error::InvalidState("seek before init".to_string()));
        }
        if let Some(high_water) = self.high_water {
            if u64::from(row) < high_water {
                return Err(Error::InvalidState(format!(
                    "cannot seek back to row {} after preparing up to row {}",
                    row, high_water
                )));
            }
        }

        self.cur_row = u64::from(row);
        self.prepared_count = 0;
        self.prepared.iter_mut().for_each(Vec::clear);
        self.state = State::Positioned;
        Ok(())
    }

    fn prepare_batch(&mut self, nrows: usize) -> Result<()> {
        if matches!(self.state, State::Created | State::Initialized) {
            return Err(Error::InvalidState("prepare_batch before seek".to_string()));
        }
        // A failed scan must not leave a previous or partial batch applicable
        self.state = State::Positioned;
        self.prepared.iter_mut().for_each(Vec::clear);
        self.prepared_count = 0;

        let start = self.cur_row;
        let end = start.saturating_add(nrows as u64);
        let dms = self.dms;
        let schema = dms.schema();
        let mut visible = 0usize;

        // Past the last representable row there is nothing to scan
        if let Ok(first) = RowOrdinal::try_from(start) {
            let upper = match RowOrdinal::try_from(end) {
                Ok(end) => Bound::Excluded(DeltaKey::new(end, 0)),
                Err(_) => Bound::Unbounded,
            };
            let range = (Bound::Included(DeltaKey::new(first, 0)), upper);

            for entry in dms.data().range(range) {
                let key = *entry.key();
                if !self.snapshot.is_committed(key.txid) {
                    continue;
                }
                visible += 1;

                let bytes = entry.value();
                let row_offset = (u64::from(key.row) - start) as usize;
                for update in RowChangeList::new(bytes).decoder(schema) {
                    let update = update?;
                    if let Some(proj_idx) = self.projection_map[update.col_idx] {
                        self.prepared[proj_idx].push(PreparedUpdate {
                            row_offset,
                            txid: key.txid,
                            value: update.value.to_cell_in(bytes),
                        });
                    }
                }
            }
        }

        self.cur_row = end;
        self.high_water = Some(end);
        self.prepared_count = nrows;
        self.state = State::Prepared;
        tracing::debug!(start, end, visible, "Prepared delta batch");
        Ok(())
    }

    fn apply_updates(&mut self, col_idx: usize, dst: &mut ColumnBlock<'_>) -> Result<()> {
        if self.state != State::Prepared {
            return Err(Error::InvalidState("apply_updates before prepare_batch".to_string()));
        }
        let column = self.projection.column(col_idx)?;
        if column.data_type() != dst.data_type() {
            return Err(Error::TypeMismatch(format!(
                "column {} is {}, block is {}",
                column.name(),
                column.data_type(),
                dst.data_type()
            )));
        }
        if dst.nrows() < self.prepared_count {
            return Err(Error::InvalidState(format!(
                "block of {} rows cannot hold batch of {} rows",
                dst.nrows(),
                self.prepared_count
            )));
        }

        for update in &self.prepared[col_idx] {
            tracing::trace!(
                row = self.batch_start() + update.row_offset as u64,
                txid = update.txid,
                col_idx,
                "Applying delta"
            );
            dst.set_cell(update.row_offset, update.value.as_cell_ref())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::cell::CellRef;
    use crate::encoding::RowChangeListEncoder;
    use crate::mvcc::{MvccManager, ScopedTransaction};
    use crate::schema::{ColumnSchema, DataType};
    use bytes::Bytes;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new(
                vec![
                    ColumnSchema::new("col1", DataType::String),
                    ColumnSchema::new("col2", DataType::String),
                    ColumnSchema::new("col3", DataType::UInt32),
                ],
                1,
            )
            .unwrap(),
        )
    }

    /// Writes `col3 = row * 10` for each row, one transaction per row.
    fn store_with_rows(rows: std::ops::Range<u32>, mvcc: &MvccManager) -> DeltaMemStore {
        let schema = schema();
        let dms = DeltaMemStore::new(schema.clone());
        let mut update = RowChangeListEncoder::new(&schema);
        for row in rows {
            let tx = ScopedTransaction::new(mvcc);
            update.clear();
            update.add_column_update(2, row * 10).unwrap();
            dms.update(tx.txid(), row, &update.as_change_list()).unwrap();
            tx.commit().unwrap();
        }
        dms
    }

    #[test]
    fn test_iterate_two_batches() {
        let mvcc = MvccManager::new();
        let dms = store_with_rows(0..1000, &mvcc);
        let projection = dms.schema().project(&["col3"]).unwrap();
        let mut iter = dms.new_delta_iterator(&projection, mvcc.take_snapshot());
        iter.init().unwrap();
        iter.seek_to_ordinal(50).unwrap();

        let arena = Arena::default();
        let mut block = ColumnBlock::new(DataType::UInt32, 100, &arena);

        iter.prepare_batch(100).unwrap();
        assert_eq!(iter.prepared_rows(), 100);
        iter.apply_updates(0, &mut block).unwrap();
        for (i, value) in block.as_u32().unwrap().iter().enumerate() {
            assert_eq!(*value, (50 + i as u32) * 10);
        }

        iter.prepare_batch(100).unwrap();
        assert_eq!(iter.position(), 250);
        iter.apply_updates(0, &mut block).unwrap();
        for (i, value) in block.as_u32().unwrap().iter().enumerate() {
            assert_eq!(*value, (150 + i as u32) * 10);
        }
    }

    #[test]
    fn test_latest_visible_write_wins() {
        let schema = schema();
        let dms = DeltaMemStore::new(schema.clone());
        let mvcc = MvccManager::new();
        let mut update = RowChangeListEncoder::new(&schema);

        let mut snapshots = Vec::new();
        for value in [1u32, 2, 3] {
            let tx = ScopedTransaction::new(&mvcc);
            update.clear();
            update.add_column_update(2, value).unwrap();
            dms.update(tx.txid(), 7, &update.as_change_list()).unwrap();
            tx.commit().unwrap();
            snapshots.push(mvcc.take_snapshot());
        }

        let projection = schema.project(&["col3"]).unwrap();
        let arena = Arena::default();
        for (expected, snapshot) in [1u32, 2, 3].into_iter().zip(snapshots) {
            let mut block = ColumnBlock::new(DataType::UInt32, 1, &arena);
            let mut iter = dms.new_delta_iterator(&projection, snapshot);
            iter.init().unwrap();
            iter.seek_to_ordinal(7).unwrap();
            iter.prepare_batch(1).unwrap();
            iter.apply_updates(0, &mut block).unwrap();
            assert_eq!(block.as_u32().unwrap()[0], expected);
        }
    }

    #[test]
    fn test_uncommitted_and_aborted_are_invisible() {
        let schema = schema();
        let dms = DeltaMemStore::new(schema.clone());
        let mvcc = MvccManager::new();
        let mut update = RowChangeListEncoder::new(&schema);
        update.add_column_update(2, 99u32).unwrap();

        let in_flight = ScopedTransaction::new(&mvcc);
        dms.update(in_flight.txid(), 0, &update.as_change_list()).unwrap();
        {
            let dropped = ScopedTransaction::new(&mvcc);
            dms.update(dropped.txid(), 1, &update.as_change_list()).unwrap();
        }
        let aborted = ScopedTransaction::new(&mvcc);
        dms.update(aborted.txid(), 2, &update.as_change_list()).unwrap();
        aborted.abort().unwrap();

        let projection = schema.project(&["col3"]).unwrap();
        let arena = Arena::default();
        let mut block = ColumnBlock::new(DataType::UInt32, 3, &arena);
        block.fill(CellRef::UInt32(0)).unwrap();

        let mut iter = dms.new_delta_iterator(&projection, mvcc.take_snapshot());
        iter.init().unwrap();
        iter.seek_to_ordinal(0).unwrap();
        iter.prepare_batch(3).unwrap();
        iter.apply_updates(0, &mut block).unwrap();
        assert_eq!(block.as_u32().unwrap(), &[0, 0, 0]);
        assert_eq!(dms.count(), 3);
        drop(in_flight);
    }

    #[test]
    fn test_non_projected_columns_are_skipped() {
        let schema = schema();
        let dms = DeltaMemStore::new(schema.clone());
        let mut update = RowChangeListEncoder::new(&schema);
        update.add_column_update(0, "a").unwrap();
        update.add_column_update(1, "b").unwrap();
        dms.update(1, 0, &update.as_change_list()).unwrap();

        let projection = schema.project(&["col2"]).unwrap();
        let arena = Arena::default();
        let mut block = ColumnBlock::new(DataType::String, 1, &arena);
        let mut iter = dms.new_delta_iterator(&projection, Snapshot::including_all());
        iter.init().unwrap();
        iter.seek_to_ordinal(0).unwrap();
        iter.prepare_batch(1).unwrap();
        iter.apply_updates(0, &mut block).unwrap();

        assert_eq!(&block.as_strings().unwrap()[0][..], b"b");
        assert!(matches!(
            iter.apply_updates(1, &mut block),
            Err(Error::ColumnOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_protocol_order_is_enforced() {
        let mvcc = MvccManager::new();
        let dms = store_with_rows(0..10, &mvcc);
        let projection = dms.schema().project(&["col3"]).unwrap();
        let arena = Arena::default();
        let mut block = ColumnBlock::new(DataType::UInt32, 5, &arena);

        let mut iter = dms.new_delta_iterator(&projection, mvcc.take_snapshot());
        assert!(matches!(iter.seek_to_ordinal(0), Err(Error::InvalidState(_))));
        iter.init().unwrap();
        assert!(matches!(iter.init(), Err(Error::InvalidState(_))));
        assert!(matches!(iter.prepare_batch(5), Err(Error::InvalidState(_))));
        iter.seek_to_ordinal(0).unwrap();
        assert!(matches!(
            iter.apply_updates(0, &mut block),
            Err(Error::InvalidState(_))
        ));

        iter.prepare_batch(5).unwrap();
        assert!(matches!(iter.seek_to_ordinal(2), Err(Error::InvalidState(_))));
        iter.seek_to_ordinal(5).unwrap();

        // A forward hop does not reopen the rows already prepared
        iter.seek_to_ordinal(8).unwrap();
        assert!(matches!(iter.seek_to_ordinal(0), Err(Error::InvalidState(_))));
        assert!(matches!(iter.seek_to_ordinal(4), Err(Error::InvalidState(_))));
        assert_eq!(iter.position(), 8);
    }

    #[test]
    fn test_failed_prepare_discards_previous_batch() {
        let mvcc = MvccManager::new();
        let dms = store_with_rows(0..10, &mvcc);
        // Column 42 is not in the schema
        dms.data()
            .insert(DeltaKey::new(7, 1), Bytes::from_static(&[42, 0, 0, 0, 1, 0, 0, 0]));

        let projection = dms.schema().project(&["col3"]).unwrap();
        let arena = Arena::default();
        let mut block = ColumnBlock::new(DataType::UInt32, 5, &arena);

        let mut iter = dms.new_delta_iterator(&projection, Snapshot::including_all());
        iter.init().unwrap();
        iter.seek_to_ordinal(0).unwrap();
        iter.prepare_batch(5).unwrap();
        iter.apply_updates(0, &mut block).unwrap();

        assert!(matches!(iter.prepare_batch(5), Err(Error::Corruption(_))));
        assert_eq!(iter.position(), 5);
        assert_eq!(iter.prepared_rows(), 0);
        assert!(matches!(
            iter.apply_updates(0, &mut block),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_apply_checks_block() {
        let mvcc = MvccManager::new();
        let dms = store_with_rows(0..10, &mvcc);
        let projection = dms.schema().project(&["col3"]).unwrap();
        let arena = Arena::default();

        let mut iter = dms.new_delta_iterator(&projection, mvcc.take_snapshot());
        iter.init().unwrap();
        iter.seek_to_ordinal(0).unwrap();
        iter.prepare_batch(10).unwrap();

        let mut wrong_type = ColumnBlock::new(DataType::Int64, 10, &arena);
        assert!(matches!(
            iter.apply_updates(0, &mut wrong_type),
            Err(Error::TypeMismatch(_))
        ));
        let mut too_small = ColumnBlock::new(DataType::UInt32, 4, &arena);
        assert!(matches!(
            iter.apply_updates(0, &mut too_small),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_init_rejects_bad_projection() {
        let dms = DeltaMemStore::new(schema());

        let missing = Schema::new(vec![ColumnSchema::new("nope", DataType::UInt32)], 0).unwrap();
        let mut iter = dms.new_delta_iterator(&missing, Snapshot::including_all());
        assert!(matches!(iter.init(), Err(Error::Projection(_))));

        let retyped = Schema::new(vec![ColumnSchema::new("col3", DataType::Int64)], 0).unwrap();
        let mut iter = dms.new_delta_iterator(&retyped, Snapshot::including_all());
        assert!(matches!(iter.init(), Err(Error::Projection(_))));
    }

    #[test]
    fn test_batch_at_end_of_row_space() {
        let schema = schema();
        let dms = DeltaMemStore::new(schema.clone());
        let mut update = RowChangeListEncoder::new(&schema);
        update.add_column_update(2, 5u32).unwrap();
        dms.update(1, u32::MAX, &update.as_change_list()).unwrap();

        let projection = schema.project(&["col3"]).unwrap();
        let arena = Arena::default();
        let mut block = ColumnBlock::new(DataType::UInt32, 2, &arena);
        let mut iter = dms.new_delta_iterator(&projection, Snapshot::including_all());
        iter.init().unwrap();
        iter.seek_to_ordinal(u32::MAX - 1).unwrap();
        iter.prepare_batch(2).unwrap();
        iter.apply_updates(0, &mut block).unwrap();

        assert_eq!(block.as_u32().unwrap(), &[0, 5]);
    }
}
