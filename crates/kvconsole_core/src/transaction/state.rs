//! Transaction state.

use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::transaction::iterator::{IteratorOptions, KeyIterator};
use kvconsole_storage::{CommitRequest, SequenceNumber, Snapshot, WriteOp};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transaction identifier, unique per store handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Whether a transaction may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Reads only; `set` and `delete` fail.
    ReadOnly,
    /// Reads and buffered writes.
    ReadWrite,
}

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction was discarded, explicitly or by a failed commit.
    Discarded,
}

/// Represents a pending write in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// Insert or overwrite a key.
    Put {
        /// New value.
        value: Vec<u8>,
    },
    /// Remove a key.
    Delete,
}

/// A unit of isolated reads and atomic writes.
///
/// Reads see the snapshot taken when the transaction began, overlaid with
/// the transaction's own pending writes. Writes are buffered until
/// [`Transaction::commit`], which applies all of them or none.
///
/// A read-write transaction remembers every key it read through
/// [`Transaction::get`] and every key it writes. Commit fails with
/// [`CoreError::TransactionConflict`] if any of those keys was changed by
/// another transaction after this one began.
///
/// Dropping an active transaction discards it.
pub struct Transaction<'s> {
    store: &'s Store,
    id: TransactionId,
    mode: TransactionMode,
    snapshot: Arc<dyn Snapshot>,
    state: TransactionState,
    /// Pending writes, last write per key wins.
    writes: BTreeMap<Vec<u8>, PendingWrite>,
    /// Keys read from the snapshot, checked at commit.
    reads: BTreeSet<Vec<u8>>,
    /// Pending-write cap; `None` once lifted by a bulk delete.
    write_limit: Option<usize>,
}

impl<'s> Transaction<'s> {
    pub(crate) fn new(
        store: &'s Store,
        id: TransactionId,
        mode: TransactionMode,
        snapshot: Arc<dyn Snapshot>,
    ) -> Self {
        Self {
            store,
            id,
            mode,
            snapshot,
            state: TransactionState::Active,
            writes: BTreeMap::new(),
            reads: BTreeSet::new(),
            write_limit: Some(store.config().max_txn_writes),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the transaction mode.
    #[must_use]
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Checks if the transaction may write.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.mode == TransactionMode::ReadWrite
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns the snapshot sequence number.
    #[must_use]
    pub fn snapshot_seq(&self) -> SequenceNumber {
        self.snapshot.sequence()
    }

    /// Returns the number of pending writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::KeyNotFound`] if the key is absent (or deleted
    /// in this transaction), or a storage error if the snapshot read fails.
    pub fn get(&mut self, key: &[u8]) -> CoreResult<Vec<u8>> {
        if let Some(write) = self.writes.get(key) {
            return match write {
                PendingWrite::Put { value } => Ok(value.clone()),
                PendingWrite::Delete => Err(CoreError::key_not_found(key)),
            };
        }

        if self.is_writable() {
            self.reads.insert(key.to_vec());
        }
        self.snapshot
            .get(key)?
            .ok_or_else(|| CoreError::key_not_found(key))
    }

    /// Buffers a put of `key` to `value`.
    ///
    /// # Errors
    ///
    /// Fails on a read-only transaction, an empty key, or when the pending
    /// write limit would be exceeded.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> CoreResult<()> {
        self.buffer(
            key.into(),
            PendingWrite::Put {
                value: value.into(),
            },
        )
    }

    /// Buffers a delete of `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Transaction::set`].
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> CoreResult<()> {
        self.buffer(key.into(), PendingWrite::Delete)
    }

    /// Creates an iterator over this transaction's view.
    ///
    /// The iterator sees pending writes made before this call, but not
    /// those made afterwards.
    #[must_use]
    pub fn iter(&self, options: IteratorOptions) -> KeyIterator {
        let pending = match &options.prefix {
            Some(prefix) => self
                .writes
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, write)| (key.clone(), write.clone()))
                .collect(),
            None => self.writes.clone(),
        };
        KeyIterator::new(Arc::clone(&self.snapshot), pending, options)
    }

    /// Commits all pending writes atomically.
    ///
    /// A transaction without writes (including every read-only one)
    /// commits trivially and returns its snapshot sequence.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TransactionConflict`] if a key read or written
    /// here was changed by a transaction that committed after this one
    /// began, or a storage error. In both cases nothing is applied and the
    /// transaction is discarded.
    pub fn commit(mut self) -> CoreResult<SequenceNumber> {
        if self.writes.is_empty() {
            self.state = TransactionState::Committed;
            debug!(txn = %self.id, "committed transaction without writes");
            return Ok(self.snapshot.sequence());
        }

        let ops: Vec<WriteOp> = std::mem::take(&mut self.writes)
            .into_iter()
            .map(|(key, write)| match write {
                PendingWrite::Put { value } => WriteOp::put(key, value),
                PendingWrite::Delete => WriteOp::delete(key),
            })
            .collect();
        let guarded: Vec<Vec<u8>> = std::mem::take(&mut self.reads).into_iter().collect();
        let request = CommitRequest::checked(self.snapshot.sequence(), &guarded, &ops);

        let result = self
            .store
            .ensure_open()
            .and_then(|()| self.store.engine().commit(request).map_err(CoreError::from));
        match result {
            Ok(sequence) => {
                self.state = TransactionState::Committed;
                debug!(txn = %self.id, %sequence, writes = ops.len(), "committed transaction");
                Ok(sequence)
            }
            Err(err) => {
                self.state = TransactionState::Discarded;
                warn!(txn = %self.id, error = %err, "commit failed, transaction discarded");
                Err(err)
            }
        }
    }

    /// Removes the pending-write cap.
    ///
    /// Used by operations that must delete a whole key range in one commit,
    /// however large it is.
    pub(crate) fn lift_write_limit(&mut self) {
        self.write_limit = None;
    }

    /// Discards all pending writes.
    pub fn discard(mut self) {
        self.abandon();
    }

    fn abandon(&mut self) {
        if self.state == TransactionState::Active {
            self.state = TransactionState::Discarded;
            self.writes.clear();
            self.reads.clear();
            debug!(txn = %self.id, "discarded transaction");
        }
    }

    fn buffer(&mut self, key: Vec<u8>, write: PendingWrite) -> CoreResult<()> {
        if !self.is_writable() {
            return Err(CoreError::ReadOnlyTransaction);
        }
        if key.is_empty() {
            return Err(CoreError::EmptyKey);
        }
        if let Some(limit) = self.write_limit {
            if self.writes.len() >= limit && !self.writes.contains_key(&key) {
                return Err(CoreError::TransactionTooBig { limit });
            }
        }
        self.writes.insert(key, write);
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.abandon();
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("snapshot_seq", &self.snapshot.sequence())
            .field("writes", &self.writes.len())
            .field("reads", &self.reads.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transaction::IteratorOptions;
    use kvconsole_storage::{Engine, MemoryEngine};

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn put(store: &Store, key: &str, value: &str) {
        let mut txn = store.begin(true).unwrap();
        txn.set(key, value).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn transaction_id_display() {
        assert_eq!(TransactionId::new(7).to_string(), "txn:7");
    }

    #[test]
    fn read_your_own_writes() {
        let store = store();
        let mut txn = store.begin(true).unwrap();
        txn.set("k", "v").unwrap();
        assert_eq!(txn.get(b"k").unwrap(), b"v");
        txn.delete("k").unwrap();
        assert!(txn.get(b"k").unwrap_err().is_not_found());
    }

    #[test]
    fn uncommitted_writes_are_invisible_to_others() {
        let store = store();
        let mut writer = store.begin(true).unwrap();
        writer.set("k", "v").unwrap();

        let mut reader = store.begin(false).unwrap();
        assert!(reader.get(b"k").unwrap_err().is_not_found());
        writer.commit().unwrap();
        // Snapshot isolation: still not visible to the older reader
        assert!(reader.get(b"k").unwrap_err().is_not_found());

        let mut fresh = store.begin(false).unwrap();
        assert_eq!(fresh.get(b"k").unwrap(), b"v");
    }

    #[test]
    fn read_only_rejects_writes() {
        let store = store();
        let mut txn = store.begin(false).unwrap();
        assert!(matches!(
            txn.set("k", "v"),
            Err(CoreError::ReadOnlyTransaction)
        ));
        assert!(matches!(
            txn.delete("k"),
            Err(CoreError::ReadOnlyTransaction)
        ));
    }

    #[test]
    fn empty_key_rejected() {
        let store = store();
        let mut txn = store.begin(true).unwrap();
        assert!(matches!(txn.set("", "v"), Err(CoreError::EmptyKey)));
        assert!(matches!(txn.delete(""), Err(CoreError::EmptyKey)));
    }

    #[test]
    fn pending_write_limit() {
        let store = Store::open_in_memory_with_config(Config::new().max_txn_writes(2)).unwrap();
        let mut txn = store.begin(true).unwrap();
        txn.set("a", "1").unwrap();
        txn.set("b", "1").unwrap();
        // Overwriting a buffered key does not grow the set
        txn.set("a", "2").unwrap();
        assert!(matches!(
            txn.set("c", "1"),
            Err(CoreError::TransactionTooBig { limit: 2 })
        ));
        assert_eq!(txn.write_count(), 2);
    }

    #[test]
    fn discard_applies_nothing() {
        let store = store();
        let mut txn = store.begin(true).unwrap();
        txn.set("k", "v").unwrap();
        txn.discard();

        let mut check = store.begin(false).unwrap();
        assert!(check.get(b"k").unwrap_err().is_not_found());
    }

    #[test]
    fn drop_discards() {
        let store = store();
        {
            let mut txn = store.begin(true).unwrap();
            txn.set("k", "v").unwrap();
        }
        let mut check = store.begin(false).unwrap();
        assert!(check.get(b"k").unwrap_err().is_not_found());
    }

    #[test]
    fn read_only_commit_returns_snapshot_seq() {
        let store = store();
        put(&store, "k", "v");
        let txn = store.begin(false).unwrap();
        let seq = txn.snapshot_seq();
        assert_eq!(txn.commit().unwrap(), seq);
    }

    #[test]
    fn commit_advances_sequence() {
        let store = store();
        let txn = store.begin(true).unwrap();
        let before = txn.snapshot_seq();
        drop(txn);

        let mut txn = store.begin(true).unwrap();
        txn.set("k", "v").unwrap();
        let seq = txn.commit().unwrap();
        assert!(seq > before);
    }

    #[test]
    fn write_write_conflict() {
        let store = store();
        let mut first = store.begin(true).unwrap();
        let mut second = store.begin(true).unwrap();
        first.set("k", "one").unwrap();
        second.set("k", "two").unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(err.is_conflict());

        let mut check = store.begin(false).unwrap();
        assert_eq!(check.get(b"k").unwrap(), b"one");
    }

    #[test]
    fn read_write_conflict() {
        let store = store();
        put(&store, "counter", "1");

        let mut reader = store.begin(true).unwrap();
        let value = reader.get(b"counter").unwrap();
        assert_eq!(value, b"1");
        reader.set("other", "derived").unwrap();

        put(&store, "counter", "2");

        let err = reader.commit().unwrap_err();
        assert!(matches!(err, CoreError::TransactionConflict { ref key } if key == b"counter"));

        let mut check = store.begin(false).unwrap();
        assert!(check.get(b"other").unwrap_err().is_not_found());
    }

    #[test]
    fn disjoint_transactions_both_commit() {
        let store = store();
        let mut first = store.begin(true).unwrap();
        let mut second = store.begin(true).unwrap();
        first.set("a", "1").unwrap();
        second.set("b", "2").unwrap();
        first.commit().unwrap();
        second.commit().unwrap();

        let mut check = store.begin(false).unwrap();
        assert_eq!(check.get(b"a").unwrap(), b"1");
        assert_eq!(check.get(b"b").unwrap(), b"2");
    }

    #[test]
    fn failed_commit_leaves_store_unchanged() {
        let engine = Arc::new(MemoryEngine::new());
        let store = Store::open_with_engine(Config::default(), engine.clone());
        put(&store, "keep", "1");

        engine.set_fail_on_commit(true);
        let mut txn = store.begin(true).unwrap();
        txn.set("new", "x").unwrap();
        txn.delete("keep").unwrap();
        assert!(matches!(txn.commit(), Err(CoreError::Storage(_))));
        engine.set_fail_on_commit(false);

        assert_eq!(engine.len(), 1);
        let mut check = store.begin(false).unwrap();
        assert_eq!(check.get(b"keep").unwrap(), b"1");
    }

    #[test]
    fn iterator_snapshot_of_pending_writes() {
        let store = store();
        put(&store, "a", "1");
        put(&store, "b", "2");

        let mut txn = store.begin(true).unwrap();
        txn.set("c", "3").unwrap();
        let mut it = txn.iter(IteratorOptions::default());
        // Writes after iterator creation are not observed
        txn.delete("a").unwrap();

        it.rewind().unwrap();
        let mut keys = Vec::new();
        while let Some(record) = it.item() {
            keys.push(record.key_lossy());
            it.next().unwrap();
        }
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn closed_store_rejects_commit() {
        let store = store();
        let mut txn = store.begin(true).unwrap();
        txn.set("k", "v").unwrap();
        store.close().unwrap();
        assert!(matches!(txn.commit(), Err(CoreError::StoreClosed)));
    }

    #[test]
    fn engine_is_shared() {
        let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::new());
        let store = Store::open_with_engine(Config::default(), Arc::clone(&engine));
        put(&store, "k", "v");
        assert_eq!(engine.snapshot().unwrap().get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
