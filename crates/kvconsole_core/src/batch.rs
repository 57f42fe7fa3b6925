//! Non-transactional bulk writes.

use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use kvconsole_storage::{CommitRequest, SequenceNumber, WriteOp};
use tracing::{debug, warn};

/// Counters reported by [`WriteBatch::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Operations applied.
    pub ops: usize,
    /// Engine commits used to apply them.
    pub commits: usize,
    /// Sequence of the last applied chunk, if any.
    pub last_sequence: Option<SequenceNumber>,
}

/// Buffers writes and applies them in atomic chunks.
///
/// Unlike a [`crate::Transaction`], a batch has no snapshot and no conflict
/// detection, and it is not atomic as a whole: operations are applied in
/// submission order, `Config::max_batch_ops` at a time, each chunk in its
/// own engine commit. Once a chunk fails the batch is poisoned: later
/// `set`/`delete` calls fail with [`CoreError::BatchAborted`] and
/// [`WriteBatch::flush`] returns the original error.
///
/// Dropping a batch without flushing discards the unflushed operations.
pub struct WriteBatch<'s> {
    store: &'s Store,
    pending: Vec<WriteOp>,
    failure: Option<CoreError>,
    stats: BatchStats,
}

impl<'s> WriteBatch<'s> {
    pub(crate) fn new(store: &'s Store) -> Self {
        Self {
            store,
            pending: Vec::new(),
            failure: None,
            stats: BatchStats::default(),
        }
    }

    /// Queues a put.
    ///
    /// # Errors
    ///
    /// Returns `EmptyKey` for an empty key, or `BatchAborted` once a chunk
    /// has failed. The underlying failure is returned by `flush`.
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> CoreResult<()> {
        self.push(WriteOp::put(key.into(), value.into()))
    }

    /// Queues a delete.
    ///
    /// # Errors
    ///
    /// Same conditions as [`WriteBatch::set`].
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> CoreResult<()> {
        self.push(WriteOp::delete(key.into()))
    }

    /// Number of queued operations not yet applied.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Applies all queued operations.
    ///
    /// # Errors
    ///
    /// Returns the stored error if any chunk failed, in which case the
    /// unflushed remainder is abandoned.
    pub fn flush(mut self) -> CoreResult<BatchStats> {
        if let Some(err) = self.failure.take() {
            self.pending.clear();
            return Err(err);
        }
        if !self.pending.is_empty() {
            self.apply_chunk()?;
        }
        Ok(self.stats)
    }

    /// Discards all queued operations. Chunks already applied stay applied.
    pub fn cancel(mut self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "cancelled write batch");
        }
        self.pending.clear();
    }

    fn push(&mut self, op: WriteOp) -> CoreResult<()> {
        if self.failure.is_some() {
            return Err(CoreError::BatchAborted);
        }
        if op.key().is_empty() {
            return Err(CoreError::EmptyKey);
        }

        self.pending.push(op);
        if self.pending.len() >= self.store.config().max_batch_ops.max(1) {
            if let Err(err) = self.apply_chunk() {
                self.failure = Some(err);
                return Err(CoreError::BatchAborted);
            }
        }
        Ok(())
    }

    fn apply_chunk(&mut self) -> CoreResult<()> {
        let ops = std::mem::take(&mut self.pending);
        self.store.ensure_open()?;
        match self.store.engine().commit(CommitRequest::unconditional(&ops)) {
            Ok(sequence) => {
                self.stats.ops += ops.len();
                self.stats.commits += 1;
                self.stats.last_sequence = Some(sequence);
                debug!(ops = ops.len(), %sequence, "applied write batch chunk");
                Ok(())
            }
            Err(err) => {
                let err = CoreError::from(err);
                warn!(ops = ops.len(), error = %err, "write batch chunk failed");
                Err(err)
            }
        }
    }
}

impl Drop for WriteBatch<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "write batch dropped without flush");
        }
    }
}

impl std::fmt::Debug for WriteBatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBatch")
            .field("pending", &self.pending.len())
            .field("failed", &self.failure.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use kvconsole_storage::MemoryEngine;
    use std::sync::Arc;

    fn memory_store(max_batch_ops: usize) -> (Arc<MemoryEngine>, Store) {
        let engine = Arc::new(MemoryEngine::new());
        let store = Store::open_with_engine(
            Config::new().max_batch_ops(max_batch_ops),
            engine.clone(),
        );
        (engine, store)
    }

    #[test]
    fn flush_applies_everything() {
        let (engine, store) = memory_store(100);
        let mut batch = store.new_write_batch();
        batch.set("a", "1").unwrap();
        batch.set("b", "2").unwrap();
        batch.delete("a").unwrap();
        assert_eq!(batch.pending(), 3);
        assert!(engine.is_empty());

        let stats = batch.flush().unwrap();
        assert_eq!(stats.ops, 3);
        assert_eq!(stats.commits, 1);
        assert_eq!(engine.records().into_keys().collect::<Vec<_>>(), vec![b"b".to_vec()]);
    }

    #[test]
    fn chunks_apply_in_submission_order() {
        let (engine, store) = memory_store(2);
        let mut batch = store.new_write_batch();
        batch.set("k", "1").unwrap();
        batch.set("k", "2").unwrap();
        // First chunk is applied once it fills up
        assert_eq!(engine.len(), 1);
        batch.delete("k").unwrap();
        batch.set("k", "3").unwrap();
        batch.set("z", "z").unwrap();

        let stats = batch.flush().unwrap();
        assert_eq!(stats.ops, 5);
        assert_eq!(stats.commits, 3);
        assert_eq!(engine.records().get(b"k".as_slice()), Some(&b"3".to_vec()));
    }

    #[test]
    fn empty_flush_is_noop() {
        let (_, store) = memory_store(10);
        let stats = store.new_write_batch().flush().unwrap();
        assert_eq!(stats, BatchStats::default());
    }

    #[test]
    fn empty_key_is_rejected_without_poisoning() {
        let (engine, store) = memory_store(10);
        let mut batch = store.new_write_batch();
        assert!(matches!(batch.set("", "v"), Err(CoreError::EmptyKey)));
        batch.set("k", "v").unwrap();
        batch.flush().unwrap();
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn chunk_failure_poisons_batch() {
        let (engine, store) = memory_store(2);
        let mut batch = store.new_write_batch();
        batch.set("a", "1").unwrap();
        batch.set("b", "2").unwrap();

        engine.set_fail_on_commit(true);
        batch.set("c", "3").unwrap();
        assert!(matches!(batch.set("d", "4"), Err(CoreError::BatchAborted)));
        engine.set_fail_on_commit(false);

        assert!(matches!(batch.set("e", "5"), Err(CoreError::BatchAborted)));
        assert!(matches!(batch.flush(), Err(CoreError::Storage(_))));
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn flush_failure_is_reported() {
        let (engine, store) = memory_store(10);
        let mut batch = store.new_write_batch();
        batch.set("a", "1").unwrap();
        engine.set_fail_on_commit(true);
        assert!(matches!(batch.flush(), Err(CoreError::Storage(_))));
        assert!(engine.is_empty());
    }

    #[test]
    fn cancel_discards_unflushed() {
        let (engine, store) = memory_store(2);
        let mut batch = store.new_write_batch();
        batch.set("a", "1").unwrap();
        batch.set("b", "2").unwrap();
        batch.set("c", "3").unwrap();
        batch.cancel();

        let keys: Vec<_> = engine.records().into_keys().collect();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn closed_store_poisons_batch() {
        let (_, store) = memory_store(1);
        let mut batch = store.new_write_batch();
        store.close().unwrap();
        assert!(matches!(batch.set("a", "1"), Err(CoreError::BatchAborted)));
        assert!(matches!(batch.set("b", "1"), Err(CoreError::BatchAborted)));
        assert!(matches!(batch.flush(), Err(CoreError::StoreClosed)));
    }
}
