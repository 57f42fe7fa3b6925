//! Store configuration.

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether every commit is fsynced before it returns (safer but slower).
    pub sync_on_commit: bool,

    /// Default number of entries an iterator pulls from its snapshot at once.
    pub prefetch_size: usize,

    /// Maximum number of pending writes a single transaction may buffer.
    pub max_txn_writes: usize,

    /// Number of operations a write batch applies per engine commit.
    pub max_batch_ops: usize,

    /// Engine page cache size in bytes (`None` keeps the engine default).
    pub cache_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            prefetch_size: 100,
            max_txn_writes: 100_000,
            max_batch_ops: 10_000,
            cache_size: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the default iterator prefetch size. Zero is treated as one.
    #[must_use]
    pub const fn prefetch_size(mut self, size: usize) -> Self {
        self.prefetch_size = size;
        self
    }

    /// Sets the pending-write limit per transaction.
    #[must_use]
    pub const fn max_txn_writes(mut self, limit: usize) -> Self {
        self.max_txn_writes = limit;
        self
    }

    /// Sets the number of operations per write batch commit.
    #[must_use]
    pub const fn max_batch_ops(mut self, limit: usize) -> Self {
        self.max_batch_ops = limit;
        self
    }

    /// Sets the engine page cache size in bytes.
    #[must_use]
    pub const fn cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = Some(bytes);
        self
    }
}
