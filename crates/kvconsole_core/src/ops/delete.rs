use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::transaction::Transaction;
use kvconsole_storage::SequenceNumber;
use tracing::warn;

/// A delete that could not be buffered.
#[derive(Debug)]
pub struct DeleteFailure {
    /// Key that was not deleted.
    pub key: Vec<u8>,
    /// Why.
    pub error: CoreError,
}

/// Outcome of a committed delete operation.
///
/// Failed deletes do not stop the operation: they are collected here and
/// the deletes that succeeded are still committed.
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Keys deleted, in ascending order.
    pub deleted: Vec<Vec<u8>>,
    /// Keys that could not be deleted.
    pub failures: Vec<DeleteFailure>,
    /// Sequence of the commit.
    pub sequence: SequenceNumber,
}

impl DeleteReport {
    /// Number of keys deleted.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Returns true if every attempted delete succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Deletes `key` if present.
///
/// An absent key yields an empty report.
pub fn delete_one(store: &Store, key: &[u8]) -> CoreResult<DeleteReport> {
    let mut txn = store.begin(true)?;
    let mut report = DeleteReport::default();

    match txn.get(key) {
        Ok(_) => record_delete(&mut txn, key.to_vec(), &mut report),
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err),
    }

    report.sequence = txn.commit()?;
    Ok(report)
}

/// Deletes every key in the store in a single commit.
///
/// `Config::max_txn_writes` does not apply: the store is emptied however
/// many keys it holds.
pub fn delete_all(store: &Store) -> CoreResult<DeleteReport> {
    delete_matching(store, &[])
}

/// Deletes every key starting with `prefix`.
///
/// An empty prefix deletes everything. Like [`delete_all`], the matched
/// keys are removed in one commit regardless of `Config::max_txn_writes`.
pub fn prefix_delete(store: &Store, prefix: &[u8]) -> CoreResult<DeleteReport> {
    delete_matching(store, prefix)
}

fn delete_matching(store: &Store, prefix: &[u8]) -> CoreResult<DeleteReport> {
    let mut txn = store.begin(true)?;
    // The whole matched range goes out in one commit
    txn.lift_write_limit();
    let mut report = DeleteReport::default();

    // The iterator copies pending writes up front, so deleting as we go
    // leaves the remaining sequence intact.
    let mut it = txn.iter(store.iterator_options().prefix(prefix));
    it.seek(prefix)?;
    while it.valid_for_prefix(prefix) {
        if let Some(record) = it.item() {
            record_delete(&mut txn, record.key.clone(), &mut report);
        }
        it.next()?;
    }

    report.sequence = txn.commit()?;
    Ok(report)
}

fn record_delete(txn: &mut Transaction<'_>, key: Vec<u8>, report: &mut DeleteReport) {
    match txn.delete(key.clone()) {
        Ok(()) => report.deleted.push(key),
        Err(error) => {
            warn!(key = %String::from_utf8_lossy(&key), %error, "delete failed");
            report.failures.push(DeleteFailure { key, error });
        }
    }
}
