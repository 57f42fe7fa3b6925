//! Error types for kvconsole core.

use kvconsole_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in kvconsole core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage engine error (I/O or engine failure).
    #[error("storage error: {0}")]
    Storage(StorageError),

    /// I/O error outside the engine (store directory, lock file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store directory is locked by another handle or process.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// The store path is unusable.
    #[error("invalid store path: {message}")]
    InvalidPath {
        /// Description of the problem.
        message: String,
    },

    /// Key is not present.
    #[error("key not found: {}", String::from_utf8_lossy(.key))]
    KeyNotFound {
        /// The key that was looked up.
        key: Vec<u8>,
    },

    /// Commit collided with a concurrently committed transaction.
    #[error("transaction conflict on key {}; no changes were applied", String::from_utf8_lossy(.key))]
    TransactionConflict {
        /// The first conflicting key.
        key: Vec<u8>,
    },

    /// Write attempted in a read-only transaction.
    #[error("cannot write in a read-only transaction")]
    ReadOnlyTransaction,

    /// Keys must be non-empty.
    #[error("key cannot be empty")]
    EmptyKey,

    /// Transaction buffered more writes than allowed.
    #[error("transaction too big: more than {limit} pending writes")]
    TransactionTooBig {
        /// The configured limit.
        limit: usize,
    },

    /// A write batch already failed; its remaining operations were abandoned.
    #[error("write batch aborted after an earlier failure")]
    BatchAborted,

    /// Store is closed.
    #[error("store is closed")]
    StoreClosed,
}

impl CoreError {
    /// Creates an invalid path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    /// Creates a key not found error.
    pub fn key_not_found(key: impl Into<Vec<u8>>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    /// Returns true if this is a commit conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. })
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { key } => Self::TransactionConflict { key },
            other => Self::Storage(other),
        }
    }
}
