use super::{Snapshot, Txid};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// First id handed out by a fresh manager. Zero is never allocated so that
/// `Snapshot::including_none` can use it as its watermark.
pub const FIRST_TXID: Txid = 1;

#[derive(Debug)]
struct MvccState {
    next_txid: Txid,
    in_flight: BTreeSet<Txid>,
    /// Committed ids at or above the current watermark.
    committed: BTreeSet<Txid>,
    /// Every aborted id. Copied on write so snapshots can share it.
    aborted: Arc<BTreeSet<Txid>>,
}

impl MvccState {
    /// Smallest txid that is not yet known to be resolved.
    fn watermark(&self) -> Txid {
        self.in_flight.first().copied().unwrap_or(self.next_txid)
    }

    fn finish(&mut self, txid: Txid) -> Result<()> {
        if !self.in_flight.remove(&txid) {
            return Err(Error::InvalidTransaction(txid));
        }
        Ok(())
    }

    fn prune_committed(&mut self) {
        let watermark = self.watermark();
        self.committed = self.committed.split_off(&watermark);
    }
}

/// Hands out transaction ids and tracks which of them have committed.
///
/// All state lives behind one short mutex: it is the serialization point
/// that orders commits against snapshots, so a snapshot either contains a
/// commit or it does not.
#[derive(Debug)]
pub struct MvccManager {
    state: Mutex<MvccState>,
}

impl MvccManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MvccState {
                next_txid: FIRST_TXID,
                in_flight: BTreeSet::new(),
                committed: BTreeSet::new(),
                aborted: Arc::default(),
            }),
        }
    }

    /// Allocates a new txid and records it as in flight.
    pub fn begin(&self) -> Txid {
        let mut state = self.state.lock();
        let txid = state.next_txid;
        state.next_txid += 1;
        state.in_flight.insert(txid);
        tracing::trace!(txid, "Transaction started");
        txid
    }

    /// Marks an in-flight transaction committed.
    pub fn commit(&self, txid: Txid) -> Result<()> {
        let mut state = self.state.lock();
        state.finish(txid)?;
        state.committed.insert(txid);
        state.prune_committed();
        tracing::trace!(txid, "Transaction committed");
        Ok(())
    }

    /// Marks an in-flight transaction aborted. Its deltas stay in the stores
    /// but are invisible to every snapshot.
    pub fn abort(&self, txid: Txid) -> Result<()> {
        let mut state = self.state.lock();
        state.finish(txid)?;
        Arc::make_mut(&mut state.aborted).insert(txid);
        state.prune_committed();
        tracing::debug!(txid, "Transaction aborted");
        Ok(())
    }

    pub fn take_snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        Snapshot::new(
            state.watermark(),
            state.committed.iter().copied().collect(),
            state.aborted.clone(),
        )
    }

    pub fn is_committed(&self, txid: Txid) -> bool {
        let state = self.state.lock();
        if txid < state.watermark() {
            !state.aborted.contains(&txid)
        } else {
            state.committed.contains(&txid)
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }
}

impl Default for MvccManager {
    fn default() -> Self {
        Self::new()
    }
}
