//! Store directory management.
//!
//! This module handles the file system layout of a store:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! └─ data.redb         # Engine file (records, versions, commit sequence)
//! ```
//!
//! The LOCK file ensures only one process (and one open handle) uses the
//! store at a time.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const ENGINE_FILE: &str = "data.redb";

/// Manages the store directory and its exclusive lock.
///
/// The lock is held for as long as the `StoreDir` is alive and released
/// when it is dropped.
#[derive(Debug)]
pub struct StoreDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the store directory
    /// * `create_if_missing` - If true, creates the directory if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - The path exists but is not a directory
    /// - Another handle holds the lock (returns `StoreLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> CoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(CoreError::invalid_path(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(CoreError::invalid_path(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        // Non-blocking: a second opener fails instead of waiting
        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the engine file.
    #[must_use]
    pub fn engine_path(&self) -> PathBuf {
        self.path.join(ENGINE_FILE)
    }

    /// Checks if the directory holds no engine file yet.
    #[must_use]
    pub fn is_new_store(&self) -> bool {
        !self.engine_path().exists()
    }
}
