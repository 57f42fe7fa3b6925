use crate::error::CoreResult;
use crate::store::Store;
use kvconsole_storage::SequenceNumber;

/// Stores `value` under `key` in its own transaction.
///
/// An existing value is overwritten. On any failure the transaction is
/// discarded and nothing becomes visible.
pub fn insert(store: &Store, key: &[u8], value: &[u8]) -> CoreResult<SequenceNumber> {
    let mut txn = store.begin(true)?;
    txn.set(key, value)?;
    txn.commit()
}
