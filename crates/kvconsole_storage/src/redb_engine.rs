//! Persistent storage engine backed by `redb`.

use crate::engine::{CommitRequest, Engine, Snapshot};
use crate::error::{StorageError, StorageResult};
use crate::registry::{still_needed, SnapshotPin, SnapshotRegistry};
use crate::types::{Entry, SequenceNumber, WriteOp};
use redb::{
    Database, Durability, ReadTransaction, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// User records, ordered by key bytes.
const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");
/// Sequence of the last commit that touched each key. Only versions newer
/// than the oldest live snapshot are kept.
const VERSIONS: TableDefinition<&[u8], u64> = TableDefinition::new("versions");
/// Engine metadata.
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
/// Meta key holding the last commit sequence.
const COMMITTED: &str = "committed";

/// Options for opening a [`RedbEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Whether each commit is fsynced before returning.
    ///
    /// When false, commits are crash-consistent but the most recent ones may
    /// be lost on power failure until [`Engine::sync`] is called.
    pub sync_on_commit: bool,
    /// Page cache size in bytes (`None` keeps redb's default).
    pub cache_size: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
            cache_size: None,
        }
    }
}

/// A persistent storage engine.
///
/// Records live in a single redb file. redb provides the page layout,
/// copy-on-write B-trees, MVCC read transactions and crash-safe commits;
/// this adapter adds the commit sequence and per-key versions that the
/// transaction layer uses for write conflict detection.
///
/// Versions are pruned on every commit: once no snapshot older than a
/// version is alive, nothing can conflict with it and its row is removed.
///
/// # Durability
///
/// - With `sync_on_commit` every commit is fsynced before it returns
/// - Without it, [`Engine::sync`] forces an fsync
///
/// # Example
///
/// ```no_run
/// use kvconsole_storage::{CommitRequest, Engine, EngineOptions, RedbEngine, WriteOp};
/// use std::path::Path;
///
/// let engine = RedbEngine::open(Path::new("data.redb"), EngineOptions::default()).unwrap();
/// let ops = vec![WriteOp::put(b"k".to_vec(), b"v".to_vec())];
/// engine.commit(CommitRequest::unconditional(&ops)).unwrap();
/// ```
pub struct RedbEngine {
    path: PathBuf,
    db: Database,
    options: EngineOptions,
    snapshots: SnapshotRegistry,
}

impl RedbEngine {
    /// Opens or creates an engine file at the given path.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or opened, is not a
    /// redb file, or is already open elsewhere.
    pub fn open(path: &Path, options: EngineOptions) -> StorageResult<Self> {
        let mut builder = Database::builder();
        if let Some(bytes) = options.cache_size {
            builder.set_cache_size(bytes);
        }
        let db = builder.create(path)?;

        // Create the tables up front so read transactions never see them missing
        let txn = db.begin_write()?;
        {
            txn.open_table(RECORDS)?;
            txn.open_table(VERSIONS)?;
            txn.open_table(META)?;
        }
        txn.commit()?;

        debug!(path = %path.display(), "opened redb engine");

        Ok(Self {
            path: path.to_path_buf(),
            db,
            options,
            snapshots: SnapshotRegistry::new(),
        })
    }

    /// Returns the path to the engine file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the options the engine was opened with.
    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Returns the number of rows in the version table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read.
    pub fn tracked_versions(&self) -> StorageResult<u64> {
        let txn = self.db.begin_read()?;
        let versions = txn.open_table(VERSIONS)?;
        Ok(versions.len()?)
    }

    fn begin_write(&self) -> StorageResult<WriteTransaction> {
        let mut txn = self.db.begin_write()?;
        if !self.options.sync_on_commit {
            txn.set_durability(Durability::Eventual);
        }
        Ok(txn)
    }

    /// Checks conflicts and applies operations inside an open write
    /// transaction. Tables are closed again before this returns.
    fn apply(
        txn: &WriteTransaction,
        request: &CommitRequest<'_>,
        horizon: Option<SequenceNumber>,
    ) -> StorageResult<SequenceNumber> {
        let mut meta = txn.open_table(META)?;
        let mut versions = txn.open_table(VERSIONS)?;
        let mut records = txn.open_table(RECORDS)?;

        let committed = SequenceNumber::new(meta.get(COMMITTED)?.map(|g| g.value()).unwrap_or(0));

        if let Some(base) = request.base {
            // Nothing can conflict if no commit happened since the snapshot
            if committed > base {
                for key in request.checked_keys() {
                    let touched = versions.get(key)?.map(|g| g.value()).unwrap_or(0);
                    if touched > base.as_u64() {
                        return Err(StorageError::conflict(key));
                    }
                }
            }
        }

        if request.ops.is_empty() {
            return Ok(committed);
        }

        let sequence = committed.next();
        versions.retain(|_, version| still_needed(SequenceNumber::new(version), horizon))?;
        let record_versions = still_needed(sequence, horizon);

        for op in request.ops {
            match op {
                WriteOp::Put { key, value } => {
                    records.insert(key.as_slice(), value.as_slice())?;
                }
                WriteOp::Delete { key } => {
                    records.remove(key.as_slice())?;
                }
            }
            if record_versions {
                versions.insert(op.key(), sequence.as_u64())?;
            }
        }
        meta.insert(COMMITTED, sequence.as_u64())?;

        Ok(sequence)
    }
}

impl Engine for RedbEngine {
    fn snapshot(&self) -> StorageResult<Arc<dyn Snapshot>> {
        let mut snapshots = self.snapshots.lock();
        let txn = self.db.begin_read()?;
        let sequence = {
            let meta = txn.open_table(META)?;
            let value = meta.get(COMMITTED)?.map(|g| g.value()).unwrap_or(0);
            SequenceNumber::new(value)
        };
        let pin = snapshots.pin(sequence);
        Ok(Arc::new(RedbSnapshot {
            txn,
            sequence,
            _pin: pin,
        }))
    }

    fn commit(&self, request: CommitRequest<'_>) -> StorageResult<SequenceNumber> {
        // Held until the commit is visible so no snapshot slips in unpinned
        let snapshots = self.snapshots.lock();
        let horizon = snapshots.horizon(request.base);

        let txn = self.begin_write()?;
        match Self::apply(&txn, &request, horizon) {
            Ok(sequence) => {
                txn.commit()?;
                Ok(sequence)
            }
            Err(err) => {
                txn.abort()?;
                Err(err)
            }
        }
    }

    fn sync(&self) -> StorageResult<()> {
        // An empty immediate commit flushes every earlier eventual commit
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::Immediate);
        txn.commit()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redb"
    }
}

impl std::fmt::Debug for RedbEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbEngine")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Snapshot over a redb read transaction.
struct RedbSnapshot {
    txn: ReadTransaction,
    sequence: SequenceNumber,
    _pin: SnapshotPin,
}

impl Snapshot for RedbSnapshot {
    fn sequence(&self) -> SequenceNumber {
        self.sequence
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let table = self.txn.open_table(RECORDS)?;
        let value = table.get(key)?.map(|g| g.value().to_vec());
        Ok(value)
    }

    fn scan(&self, from: Bound<&[u8]>, limit: usize) -> StorageResult<Vec<Entry>> {
        let table = self.txn.open_table(RECORDS)?;
        let mut entries = Vec::with_capacity(limit.min(1024));
        for entry in table.range::<&[u8]>((from, Bound::Unbounded))?.take(limit) {
            let (key, value) = entry?;
            entries.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(entries)
    }
}
