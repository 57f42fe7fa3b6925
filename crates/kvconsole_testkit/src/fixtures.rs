//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use kvconsole_core::{Config, Store};
use kvconsole_storage::MemoryEngine;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    /// The memory engine underneath, for in-memory stores.
    engine: Option<Arc<MemoryEngine>>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self::memory_with_config(Config::default())
    }

    /// Creates an in-memory test store with custom configuration.
    pub fn memory_with_config(config: Config) -> Self {
        let engine = Arc::new(MemoryEngine::new());
        Self {
            store: Store::open_with_engine(config, engine.clone()),
            engine: Some(engine),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test store in a temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a file-based test store with custom configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Store::open_with_config(&temp_dir.path().join("store"), config)
            .expect("Failed to open file store");
        Self {
            store,
            engine: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the memory engine for in-memory stores.
    ///
    /// Use it to inspect committed records or inject commit failures.
    pub fn engine(&self) -> Option<&MemoryEngine> {
        self.engine.as_deref()
    }

    /// Returns the store directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("store"))
    }

    /// Closes the store and opens it again from the same directory.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores.
    pub fn reopen(self) -> Self {
        let Self {
            store, temp_dir, ..
        } = self;
        let temp_dir = temp_dir.expect("Only file stores can be reopened");
        let config = store.config().clone();
        store.close().expect("Failed to close store");
        drop(store);

        let store = Store::open_with_config(&temp_dir.path().join("store"), config)
            .expect("Failed to reopen store");
        Self {
            store,
            engine: None,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust,ignore
/// use kvconsole_testkit::with_memory_store;
///
/// #[test]
/// fn my_test() {
///     with_memory_store(|store| {
///         // ... test operations
///     });
/// }
/// ```
pub fn with_memory_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary file-based store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store, &Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use kvconsole_core::ops;

    /// Key of the `i`th populated record.
    pub fn populated_key(i: usize) -> String {
        format!("key{i:05}")
    }

    /// Value of the `i`th populated record.
    pub fn populated_value(i: usize) -> String {
        format!("value{i}")
    }

    /// Creates an in-memory store holding `count` records.
    pub fn populated_store(count: usize) -> TestStore {
        let test_store = TestStore::memory();
        populate(&test_store.store, count);
        test_store
    }

    /// Writes `count` records in a single transaction.
    pub fn populate(store: &Store, count: usize) {
        store
            .update(|txn| {
                for i in 0..count {
                    txn.set(populated_key(i), populated_value(i))?;
                }
                Ok(())
            })
            .expect("Failed to populate store");
    }

    /// Returns every key in the store in ascending order.
    pub fn all_keys(store: &Store) -> Vec<Vec<u8>> {
        let mut keys = Vec::new();
        ops::display_all(store, |record| {
            keys.push(record.key.clone());
            Ok(())
        })
        .expect("Failed to scan store");
        keys
    }
}
