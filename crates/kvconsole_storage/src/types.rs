//! Shared storage types.

use std::fmt;

/// A key/value pair as returned by snapshot scans.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Sequence number for ordering commits.
///
/// Every successful commit advances the engine's sequence by one. A snapshot
/// remembers the sequence it was taken at, and conflict detection compares
/// per-key commit sequences against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    /// Creates a new sequence number.
    #[must_use]
    pub const fn new(seq: u64) -> Self {
        Self(seq)
    }

    /// Returns the raw sequence value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next sequence number.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq:{}", self.0)
    }
}

/// A single mutation applied by a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or overwrite a key.
    Put {
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Remove a key. Removing an absent key is not an error.
    Delete {
        /// Key bytes.
        key: Vec<u8>,
    },
}

impl WriteOp {
    /// Creates a put operation.
    #[must_use]
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self::Put { key, value }
    }

    /// Creates a delete operation.
    #[must_use]
    pub fn delete(key: Vec<u8>) -> Self {
        Self::Delete { key }
    }

    /// Returns the key this operation touches.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}
