//! In-memory delta store backed by a concurrent skip list.
//!
//! Each entry records one transaction's changes to one row. Entries are keyed
//! by `(row, txid)` so that a forward scan yields them grouped by row, oldest
//! transaction first. Entries are append-only: a second transaction touching
//! the same row adds a new entry instead of replacing the first, which is
//! what lets older snapshots keep reading older values.
//!
//! # Crossbeam SkipMap
//!
//! `crossbeam-skiplist::SkipMap` gives us lock-free inserts from many writers
//! and lock-free ordered range scans for readers. A reader never blocks a
//! writer and vice versa.
//!
//! # Memory
//!
//! The caller's change list buffer is not retained: its bytes are copied
//! into an arena owned by the store before the entry becomes visible.

use super::iterator::DmsIterator;
use super::RowOrdinal;
use crate::arena::Arena;
use crate::config::DeltaStoreConfig;
use crate::encoding::{format, RowChangeList};
use crate::error::{Error, Result};
use crate::mvcc::{Snapshot, Txid};
use crate::schema::Schema;
use bytes::Bytes;
use crossbeam_skiplist::SkipMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Skip list key: row first, then txid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeltaKey {
    pub row: RowOrdinal,
    pub txid: Txid,
}

impl DeltaKey {
    pub fn new(row: RowOrdinal, txid: Txid) -> Self {
        Self { row, txid }
    }
}

#[derive(Debug)]
pub struct DeltaMemStore {
    schema: Arc<Schema>,
    data: SkipMap<DeltaKey, Bytes>,
    arena: Arena,
    count: AtomicUsize,
}

impl DeltaMemStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_config(schema, DeltaStoreConfig::default())
    }

    pub fn with_config(schema: Arc<Schema>, config: DeltaStoreConfig) -> Self {
        Self {
            schema,
            data: SkipMap::new(),
            arena: Arena::new(config.arena),
            count: AtomicUsize::new(0),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Records `changes` made to `row` by transaction `txid`.
    ///
    /// The change list is validated against the schema and copied into the
    /// store's arena before it is inserted. On error nothing is inserted.
    pub fn update(&self, txid: Txid, row: RowOrdinal, changes: &RowChangeList<'_>) -> Result<()> {
        if changes.is_empty() {
            return Err(Error::Encoding("empty change list".to_string()));
        }
        let num_updates = changes.validate(&self.schema)?;

        let key = DeltaKey::new(row, txid);
        if self.data.contains_key(&key) {
            return Err(Error::DuplicateDelta { row, txid });
        }

        let copy = self.arena.copy_bytes(changes.as_bytes())?;
        let copy_ptr = copy.as_ptr();
        let entry = self.data.get_or_insert(key, copy);
        // Lost a race against another insert of the same key
        if entry.value().as_ptr() != copy_ptr {
            return Err(Error::DuplicateDelta { row, txid });
        }
        self.count.fetch_add(1, Ordering::SeqCst);

        tracing::trace!(
            row,
            txid,
            num_updates,
            changes = %changes.to_debug_string(&self.schema),
            "Inserted delta"
        );
        Ok(())
    }

    /// Number of entries ever inserted.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Bytes reserved by the arena holding the copied change lists.
    pub fn memory_footprint(&self) -> usize {
        self.arena.memory_footprint()
    }

    /// Creates an iterator over the columns of `projection` that applies only
    /// deltas committed in `snapshot`.
    pub fn new_delta_iterator(&self, projection: &Schema, snapshot: Snapshot) -> DmsIterator<'_> {
        DmsIterator::new(self, projection.clone(), snapshot)
    }

    /// One line per entry, in key order.
    pub fn debug_dump(&self) -> Vec<String> {
        self.data
            .iter()
            .map(|entry| {
                let key = entry.key();
                format::delta_entry(
                    &self.schema,
                    key.row,
                    key.txid,
                    RowChangeList::new(entry.value()),
                )
            })
            .collect()
    }

    pub(super) fn data(&self) -> &SkipMap<DeltaKey, Bytes> {
        &self.data
    }
}
