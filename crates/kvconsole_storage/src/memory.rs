//! In-memory storage engine for testing.

use crate::engine::{CommitRequest, Engine, Snapshot};
use crate::error::{StorageError, StorageResult};
use crate::registry::{still_needed, SnapshotPin, SnapshotRegistry};
use crate::types::{Entry, SequenceNumber, WriteOp};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Records = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
struct MemoryState {
    /// Committed records. Snapshots share this map until the next commit.
    records: Arc<Records>,
    /// Sequence of the last commit that touched each key, kept only while
    /// an older snapshot is alive.
    versions: HashMap<Vec<u8>, SequenceNumber>,
    /// Sequence of the last commit.
    committed: SequenceNumber,
}

/// An in-memory storage engine.
///
/// This engine keeps all records in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// Snapshots are copy-on-write: taking one is a reference-count bump, and
/// the first commit after it clones the record map.
///
/// # Example
///
/// ```rust
/// use kvconsole_storage::{CommitRequest, Engine, MemoryEngine, WriteOp};
///
/// let engine = MemoryEngine::new();
/// let ops = vec![WriteOp::put(b"k".to_vec(), b"v".to_vec())];
/// engine.commit(CommitRequest::unconditional(&ops)).unwrap();
/// assert_eq!(engine.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: RwLock<MemoryState>,
    snapshots: SnapshotRegistry,
    fail_on_commit: AtomicBool,
}

impl MemoryEngine {
    /// Creates a new empty in-memory engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all committed records.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn records(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.state.read().records.as_ref().clone()
    }

    /// Returns the number of committed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    /// Returns the number of keys whose commit version is still tracked for
    /// conflict detection.
    #[must_use]
    pub fn tracked_versions(&self) -> usize {
        self.state.read().versions.len()
    }

    /// Returns true if no records are committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes every subsequent commit fail with an I/O error until reset.
    ///
    /// Failed commits leave the keyspace untouched, which lets tests drive
    /// the failure paths of the layers above.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }
}

impl Engine for MemoryEngine {
    fn snapshot(&self) -> StorageResult<Arc<dyn Snapshot>> {
        let state = self.state.read();
        let pin = self.snapshots.lock().pin(state.committed);
        Ok(Arc::new(MemorySnapshot {
            records: Arc::clone(&state.records),
            sequence: state.committed,
            _pin: pin,
        }))
    }

    fn commit(&self, request: CommitRequest<'_>) -> StorageResult<SequenceNumber> {
        let mut state = self.state.write();

        if let Some(base) = request.base {
            for key in request.checked_keys() {
                let touched = state.versions.get(key).copied().unwrap_or_default();
                if touched > base {
                    return Err(StorageError::conflict(key));
                }
            }
        }

        if self.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "injected commit failure",
            )));
        }

        if request.ops.is_empty() {
            return Ok(state.committed);
        }

        let sequence = state.committed.next();
        let horizon = self.snapshots.lock().horizon(request.base);
        let MemoryState {
            records, versions, ..
        } = &mut *state;
        versions.retain(|_, version| still_needed(*version, horizon));
        let record_versions = still_needed(sequence, horizon);

        let records = Arc::make_mut(records);
        for op in request.ops {
            match op {
                WriteOp::Put { key, value } => {
                    records.insert(key.clone(), value.clone());
                }
                WriteOp::Delete { key } => {
                    records.remove(key);
                }
            }
            if record_versions {
                versions.insert(op.key().to_vec(), sequence);
            }
        }
        state.committed = sequence;

        Ok(sequence)
    }

    fn sync(&self) -> StorageResult<()> {
        // Nothing is buffered outside the record map
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Snapshot over a shared record map.
struct MemorySnapshot {
    records: Arc<Records>,
    sequence: SequenceNumber,
    _pin: SnapshotPin,
}

impl Snapshot for MemorySnapshot {
    fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.records.get(key).cloned())
    }

    fn scan(&self, from: Bound<&[u8]>, limit: usize) -> StorageResult<Vec<Entry>> {
        Ok(self
            .records
            .range::<[u8], _>((from, Bound::Unbounded))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
