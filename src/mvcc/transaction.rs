use super::{MvccManager, Txid};
use crate::error::Result;

/// RAII handle for one write transaction.
///
/// The transaction becomes visible only through an explicit
/// [`commit`](ScopedTransaction::commit). Dropping the guard any other way
/// (an early `?` return, a panic) aborts it, so deltas written under a
/// failed operation are never published.
#[derive(Debug)]
pub struct ScopedTransaction<'a> {
    manager: &'a MvccManager,
    txid: Txid,
    finished: bool,
}

impl<'a> ScopedTransaction<'a> {
    pub fn new(manager: &'a MvccManager) -> Self {
        Self {
            manager,
            txid: manager.begin(),
            finished: false,
        }
    }

    pub fn txid(&self) -> Txid {
        self.txid
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.manager.commit(self.txid)
    }

    pub fn abort(mut self) -> Result<()> {
        self.finished = true;
        self.manager.abort(self.txid)
    }
}

impl Drop for ScopedTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!(txid = self.txid, "Transaction dropped without commit, aborting");
        if let Err(e) = self.manager.abort(self.txid) {
            tracing::error!(txid = self.txid, error = %e, "Failed to abort transaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_commit() {
        let mvcc = MvccManager::new();
        let tx = ScopedTransaction::new(&mvcc);
        let txid = tx.txid();
        tx.commit().unwrap();

        assert!(mvcc.take_snapshot().is_committed(txid));
        assert_eq!(mvcc.in_flight_count(), 0);
    }

    #[test]
    fn test_drop_aborts() {
        let mvcc = MvccManager::new();
        let txid = {
            let tx = ScopedTransaction::new(&mvcc);
            tx.txid()
        };

        assert_eq!(mvcc.in_flight_count(), 0);
        assert!(!mvcc.take_snapshot().is_committed(txid));
    }

    #[test]
    fn test_early_return_aborts() {
        fn write_row(txid: Txid) -> Result<()> {
            Err(Error::InvalidState(format!("write {} failed", txid)))
        }

        fn failing_write(mvcc: &MvccManager) -> Result<Txid> {
            let tx = ScopedTransaction::new(mvcc);
            let txid = tx.txid();
            write_row(txid)?;
            tx.commit()?;
            Ok(txid)
        }

        let mvcc = MvccManager::new();
        assert!(failing_write(&mvcc).is_err());

        // The failed txid is 1; a later commit must not make it visible
        let tx = ScopedTransaction::new(&mvcc);
        tx.commit().unwrap();
        let snap = mvcc.take_snapshot();
        assert!(!snap.is_committed(1));
        assert!(snap.is_committed(2));
    }

    #[test]
    fn test_explicit_abort() {
        let mvcc = MvccManager::new();
        let tx = ScopedTransaction::new(&mvcc);
        let txid = tx.txid();
        tx.abort().unwrap();

        assert!(!mvcc.take_snapshot().is_committed(txid));
        assert_eq!(mvcc.commit(txid), Err(Error::InvalidTransaction(txid)));
    }
}
