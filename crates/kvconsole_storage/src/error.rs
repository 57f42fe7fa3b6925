//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The underlying engine reported an error.
    #[error("engine error: {0}")]
    Engine(#[from] redb::Error),

    /// A checked key was committed by another writer after the base snapshot.
    #[error("commit conflict on key {}", String::from_utf8_lossy(.key))]
    Conflict {
        /// The first key found to conflict.
        key: Vec<u8>,
    },
}

impl StorageError {
    /// Creates a conflict error for the given key.
    pub fn conflict(key: impl Into<Vec<u8>>) -> Self {
        Self::Conflict { key: key.into() }
    }

    /// Returns true if this error is a commit conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

macro_rules! engine_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StorageError {
                fn from(err: $source) -> Self {
                    Self::Engine(redb::Error::from(err))
                }
            }
        )*
    };
}

engine_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_shows_key() {
        let err = StorageError::conflict(b"user:1".to_vec());
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "commit conflict on key user:1");
    }

    #[test]
    fn io_error_is_not_conflict() {
        let err = StorageError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(!err.is_conflict());
        assert!(err.to_string().contains("disk full"));
    }
}
