//! Multi-version concurrency control.
//!
//! Writers obtain a transaction id from the [`MvccManager`], tag every delta
//! they insert with it, and commit (or abort) when done. Readers take a
//! [`Snapshot`], an immutable predicate over txids, and only apply deltas
//! whose txid the snapshot considers committed.
//!
//! Guarantees:
//!
//! - txids are strictly increasing and never reused
//! - a commit that happens before `take_snapshot` is visible in it
//! - a transaction that begins after `take_snapshot` is never visible in it
//! - once visible in a snapshot, a txid is visible in every later snapshot
//! - aborted txids are never visible

pub mod manager;
pub mod snapshot;
pub mod transaction;

pub use manager::{MvccManager, FIRST_TXID};
pub use snapshot::Snapshot;
pub use transaction::ScopedTransaction;

/// Transaction id.
pub type Txid = u64;
