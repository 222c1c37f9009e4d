use super::Txid;
use crate::error::{Error, Result};
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Frozen predicate over transaction ids: "committed as of the moment this
/// snapshot was taken".
///
/// A txid `t` is committed in the snapshot iff
///
/// - `t < all_committed_before` and `t` was not aborted, or
/// - `t` is listed in `committed_at_or_after`.
///
/// Nothing in a snapshot is ever mutated after construction, so evaluating
/// it needs no synchronization with writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct Snapshot {
    all_committed_before: Txid,
    /// Sorted.
    committed_at_or_after: Vec<Txid>,
    /// Shared with the manager until the next abort copies it.
    aborted: Arc<BTreeSet<Txid>>,
}

/// Wire form of [`Snapshot`]. Decoding rejects an unsorted commit list,
/// which `is_committed` would otherwise search incorrectly.
#[derive(Deserialize)]
struct RawSnapshot {
    all_committed_before: Txid,
    committed_at_or_after: Vec<Txid>,
    aborted: Arc<BTreeSet<Txid>>,
}

impl TryFrom<RawSnapshot> for Snapshot {
    type Error = Error;

    fn try_from(raw: RawSnapshot) -> Result<Self> {
        if let Some(w) = raw
            .committed_at_or_after
            .windows(2)
            .find(|w| w[0] >= w[1])
        {
            return Err(Error::Encoding(format!(
                "snapshot commit list not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }
        Ok(Snapshot::new(
            raw.all_committed_before,
            raw.committed_at_or_after,
            raw.aborted,
        ))
    }
}

impl Snapshot {
    pub(super) fn new(
        all_committed_before: Txid,
        committed_at_or_after: Vec<Txid>,
        aborted: Arc<BTreeSet<Txid>>,
    ) -> Self {
        debug_assert!(committed_at_or_after.windows(2).all(|w| w[0] < w[1]));
        Self {
            all_committed_before,
            committed_at_or_after,
            aborted,
        }
    }

    /// A snapshot that considers every transaction committed.
    pub fn including_all() -> Self {
        Self::new(Txid::MAX, Vec::new(), Arc::default())
    }

    /// A snapshot that considers no transaction committed.
    pub fn including_none() -> Self {
        Self::new(0, Vec::new(), Arc::default())
    }

    pub fn is_committed(&self, txid: Txid) -> bool {
        if txid < self.all_committed_before {
            !self.aborted.contains(&txid)
        } else {
            self.committed_at_or_after.binary_search(&txid).is_ok()
        }
    }

    /// Every txid below this value has been resolved.
    pub fn watermark(&self) -> Txid {
        self.all_committed_before
    }

    /// Returns whichever snapshot sees less: the lower watermark, or on a
    /// tie the one with fewer commits above the watermark.
    pub fn earliest<'a>(a: &'a Snapshot, b: &'a Snapshot) -> &'a Snapshot {
        let key = |s: &Snapshot| (s.all_committed_before, s.committed_at_or_after.len());
        if key(b) < key(a) {
            b
        } else {
            a
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot[committed={{T|T < {}", self.all_committed_before)?;
        if !self.aborted.is_empty() {
            write!(f, " and T not in {{{}}}", self.aborted.iter().join(","))?;
        }
        if !self.committed_at_or_after.is_empty() {
            write!(
                f,
                " or (T in {{{}}})",
                self.committed_at_or_after.iter().join(",")
            )?;
        }
        write!(f, "}}]")
    }
}
