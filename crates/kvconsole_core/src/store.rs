//! Store facade.

use crate::batch::WriteBatch;
use crate::config::Config;
use crate::dir::StoreDir;
use crate::error::{CoreError, CoreResult};
use crate::transaction::{IteratorOptions, Transaction, TransactionId, TransactionMode};
use kvconsole_storage::{Engine, EngineOptions, MemoryEngine, RedbEngine, SequenceNumber};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// The main store handle.
///
/// `Store` is the entry point for reading and writing key/value pairs. All
/// access goes through transactions:
///
/// ```rust,ignore
/// use kvconsole_core::Store;
/// use std::path::Path;
///
/// let store = Store::open(Path::new("/tmp/kvconsole"))?;
///
/// store.update(|txn| txn.set("hello", "world"))?;
///
/// let value = store.view(|txn| txn.get(b"hello"))?;
/// assert_eq!(value, b"world");
///
/// store.close()?;
/// ```
///
/// # In-Memory Stores
///
/// For testing, use `Store::open_in_memory()`:
///
/// ```rust,ignore
/// let store = Store::open_in_memory()?;
/// ```
pub struct Store {
    /// Configuration.
    config: Config,
    /// Storage engine. Declared before `dir` so it closes before the lock is released.
    engine: Arc<dyn Engine>,
    /// Store directory (holds the lock). None for in-memory stores.
    dir: Option<StoreDir>,
    /// Next transaction ID.
    next_txid: AtomicU64,
    /// Whether the store is open.
    is_open: RwLock<bool>,
}

impl Store {
    /// Opens a store from a directory path with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another handle or process has the store locked (`StoreLocked`)
    /// - The path is unusable (`InvalidPath`)
    /// - The engine file cannot be opened
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store from a directory path with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use kvconsole_core::{Config, Store};
    /// use std::path::Path;
    ///
    /// let config = Config::default().sync_on_commit(false);
    /// let store = Store::open_with_config(Path::new("/tmp/kvconsole"), config)?;
    /// ```
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;

        if !config.create_if_missing && dir.is_new_store() {
            return Err(CoreError::invalid_path(format!(
                "no store at {} and create_if_missing is false",
                path.display()
            )));
        }

        let options = EngineOptions {
            sync_on_commit: config.sync_on_commit,
            cache_size: config.cache_size,
        };
        let engine = RedbEngine::open(&dir.engine_path(), options)?;

        info!(
            path = %path.display(),
            sync_on_commit = config.sync_on_commit,
            "opened store"
        );

        Ok(Self {
            config,
            engine: Arc::new(engine),
            dir: Some(dir),
            next_txid: AtomicU64::new(1),
            is_open: RwLock::new(true),
        })
    }

    /// Creates an in-memory store.
    ///
    /// Nothing is persisted; the contents vanish when the store is dropped.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_in_memory_with_config(Config::default())
    }

    /// Creates an in-memory store with custom configuration.
    pub fn open_in_memory_with_config(config: Config) -> CoreResult<Self> {
        debug!("opened in-memory store");
        Ok(Self::open_with_engine(config, Arc::new(MemoryEngine::new())))
    }

    /// Wraps an existing engine.
    ///
    /// Used by tests that need to observe or break the engine underneath.
    pub fn open_with_engine(config: Config, engine: Arc<dyn Engine>) -> Self {
        Self {
            config,
            engine,
            dir: None,
            next_txid: AtomicU64::new(1),
            is_open: RwLock::new(true),
        }
    }

    /// Begins a transaction over a snapshot of the current committed state.
    ///
    /// # Errors
    ///
    /// Returns `StoreClosed` after [`Store::close`], or a storage error if
    /// the snapshot cannot be taken.
    pub fn begin(&self, writable: bool) -> CoreResult<Transaction<'_>> {
        self.ensure_open()?;
        let mode = if writable {
            TransactionMode::ReadWrite
        } else {
            TransactionMode::ReadOnly
        };
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let snapshot = self.engine.snapshot()?;
        debug!(txn = %id, ?mode, snapshot = %snapshot.sequence(), "began transaction");
        Ok(Transaction::new(self, id, mode, snapshot))
    }

    /// Runs `f` inside a read-only transaction.
    pub fn view<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut txn = self.begin(false)?;
        let result = f(&mut txn);
        txn.discard();
        result
    }

    /// Runs `f` inside a read-write transaction.
    ///
    /// The transaction is committed if `f` succeeds and discarded if it
    /// fails. A commit error (such as a conflict) is returned as is.
    pub fn update<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut txn = self.begin(true)?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.discard();
                Err(err)
            }
        }
    }

    /// Creates a write batch for bulk, non-transactional writes.
    pub fn new_write_batch(&self) -> WriteBatch<'_> {
        WriteBatch::new(self)
    }

    /// Iterator options seeded from the configured prefetch size.
    #[must_use]
    pub fn iterator_options(&self) -> IteratorOptions {
        IteratorOptions::new().prefetch_size(self.config.prefetch_size)
    }

    /// Returns the sequence number of the latest commit.
    pub fn committed_seq(&self) -> CoreResult<SequenceNumber> {
        self.ensure_open()?;
        Ok(self.engine.snapshot()?.sequence())
    }

    /// Forces committed data to durable storage.
    pub fn sync(&self) -> CoreResult<()> {
        self.ensure_open()?;
        self.engine.sync()?;
        Ok(())
    }

    /// Closes the store. Closing twice is a no-op.
    pub fn close(&self) -> CoreResult<()> {
        let mut is_open = self.is_open.write();
        if !*is_open {
            return Ok(());
        }

        self.engine.sync()?;

        *is_open = false;
        info!(engine = self.engine.name(), "closed store");
        Ok(())
    }

    /// Checks if the store is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    /// Returns the store directory, if the store is persistent.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the engine name.
    #[must_use]
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub(crate) fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub(crate) fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::StoreClosed)
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path())
            .field("engine", &self.engine.name())
            .field("is_open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn open_in_memory() {
        let store = create_store();
        assert!(store.is_open());
        assert!(store.path().is_none());
        assert_eq!(store.engine_name(), "memory");
    }

    #[test]
    fn update_then_view() {
        let store = create_store();
        store.update(|txn| txn.set("hello", "world")).unwrap();
        let value = store.view(|txn| txn.get(b"hello")).unwrap();
        assert_eq!(value, b"world");
    }

    #[test]
    fn failed_update_discards() {
        let store = create_store();
        let result: CoreResult<()> = store.update(|txn| {
            txn.set("k", "v")?;
            Err(CoreError::EmptyKey)
        });
        assert!(matches!(result, Err(CoreError::EmptyKey)));
        assert!(store
            .view(|txn| txn.get(b"k"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn view_cannot_write() {
        let store = create_store();
        let result = store.view(|txn| txn.set("k", "v"));
        assert!(matches!(result, Err(CoreError::ReadOnlyTransaction)));
    }

    #[test]
    fn committed_seq_advances() {
        let store = create_store();
        let before = store.committed_seq().unwrap();
        store.update(|txn| txn.set("k", "v")).unwrap();
        assert!(store.committed_seq().unwrap() > before);
    }

    #[test]
    fn iterator_options_follow_config() {
        let store = Store::open_in_memory_with_config(Config::new().prefetch_size(7)).unwrap();
        assert_eq!(store.iterator_options().prefetch_size, 7);
    }

    #[test]
    fn close_store() {
        let store = create_store();
        store.close().unwrap();
        assert!(!store.is_open());
        assert!(matches!(store.begin(false), Err(CoreError::StoreClosed)));
        assert!(matches!(store.sync(), Err(CoreError::StoreClosed)));
        // Second close is a no-op
        store.close().unwrap();
    }

    #[test]
    fn persistent_store_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");

        {
            let store = Store::open(&path).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
            assert_eq!(store.engine_name(), "redb");
            store
                .update(|txn| {
                    txn.set("a", "1")?;
                    txn.set("b", "2")
                })
                .unwrap();
            store.close().unwrap();
        }

        let store = Store::open(&path).unwrap();
        let (a, b) = store
            .view(|txn| Ok((txn.get(b"a")?, txn.get(b"b")?)))
            .unwrap();
        assert_eq!(a, b"1");
        assert_eq!(b, b"2");
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("store");
        let _first = Store::open(&path).unwrap();
        assert!(matches!(Store::open(&path), Err(CoreError::StoreLocked)));
    }

    #[test]
    fn missing_store_without_create() {
        let temp = tempdir().unwrap();
        let config = Config::new().create_if_missing(false);

        let result = Store::open_with_config(&temp.path().join("absent"), config.clone());
        assert!(matches!(result, Err(CoreError::InvalidPath { .. })));

        // Directory exists but holds no engine file
        let result = Store::open_with_config(temp.path(), config);
        assert!(matches!(result, Err(CoreError::InvalidPath { .. })));
    }

    #[test]
    fn unsynced_store_still_persists_after_close() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nosync");
        let config = Config::new().sync_on_commit(false);

        {
            let store = Store::open_with_config(&path, config.clone()).unwrap();
            store.update(|txn| txn.set("k", "v")).unwrap();
        }

        let store = Store::open_with_config(&path, config).unwrap();
        assert_eq!(store.view(|txn| txn.get(b"k")).unwrap(), b"v");
    }
}
