//! Storage engine trait definitions.

use crate::error::StorageResult;
use crate::types::{Entry, SequenceNumber, WriteOp};
use std::ops::Bound;
use std::sync::Arc;

/// An immutable, ordered view of the keyspace.
///
/// A snapshot observes exactly the commits whose sequence is at or below
/// [`Snapshot::sequence`]. Commits made after the snapshot was taken are
/// never visible through it.
///
/// # Invariants
///
/// - Keys are ordered lexicographically by byte value
/// - Repeated reads of the same snapshot return the same data
/// - Values are copied out; nothing returned borrows engine memory
pub trait Snapshot {
    /// Returns the commit sequence this snapshot was taken at.
    fn sequence(&self) -> SequenceNumber;

    /// Looks up a single key.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot read the key.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Returns up to `limit` entries in ascending key order, starting at
    /// `from`.
    ///
    /// Callers page through the keyspace by passing the last key they saw as
    /// `Bound::Excluded`. Fewer than `limit` entries means the end of the
    /// keyspace was reached.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot read the range.
    fn scan(&self, from: Bound<&[u8]>, limit: usize) -> StorageResult<Vec<Entry>>;
}

/// A write set submitted to [`Engine::commit`].
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    /// Snapshot sequence the writer read from.
    ///
    /// When set, the commit fails with [`crate::StorageError::Conflict`] if
    /// any key in `guarded` or `ops` was committed after this sequence.
    /// `None` applies the operations unconditionally (write batches).
    ///
    /// The base must come from a snapshot the caller still holds: engines
    /// drop per-key versions that no live snapshot can conflict with.
    pub base: Option<SequenceNumber>,
    /// Keys that were read and must not have changed since `base`.
    pub guarded: &'a [Vec<u8>],
    /// Operations applied in order.
    pub ops: &'a [WriteOp],
}

impl<'a> CommitRequest<'a> {
    /// Creates a conflict-checked commit request.
    #[must_use]
    pub fn checked(base: SequenceNumber, guarded: &'a [Vec<u8>], ops: &'a [WriteOp]) -> Self {
        Self {
            base: Some(base),
            guarded,
            ops,
        }
    }

    /// Creates a request that is applied without conflict detection.
    #[must_use]
    pub fn unconditional(ops: &'a [WriteOp]) -> Self {
        Self {
            base: None,
            guarded: &[],
            ops,
        }
    }

    /// Returns every key the conflict check has to look at.
    pub fn checked_keys(&self) -> impl Iterator<Item = &[u8]> {
        self.guarded
            .iter()
            .map(Vec::as_slice)
            .chain(self.ops.iter().map(WriteOp::key))
    }
}

/// A transactional key-value engine.
///
/// Engines are the external collaborator underneath the console: they own
/// the on-disk (or in-memory) layout, snapshots, and durability. The
/// transaction layer above buffers writes itself and hands the final write
/// set to [`Engine::commit`].
///
/// # Invariants
///
/// - `commit` is atomic: all operations become visible, or none do
/// - A failed commit leaves the keyspace exactly as it was
/// - A successful commit is durable when the engine was configured to sync
/// - Engines must be `Send + Sync`
///
/// # Implementors
///
/// - [`crate::MemoryEngine`] - For testing
/// - [`crate::RedbEngine`] - For persistent storage
pub trait Engine: Send + Sync {
    /// Takes a snapshot of the current committed state.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start a read.
    fn snapshot(&self) -> StorageResult<Arc<dyn Snapshot>>;

    /// Atomically applies a write set and returns the new commit sequence.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Conflict`] if conflict detection was
    /// requested and a checked key changed after the base sequence, or an
    /// engine/I-O error if the write could not be made durable.
    fn commit(&self, request: CommitRequest<'_>) -> StorageResult<SequenceNumber>;

    /// Flushes any buffered engine state to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn sync(&self) -> StorageResult<()>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}
