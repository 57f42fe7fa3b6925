//! Transactions with snapshot isolation.
//!
//! Every transaction reads from a snapshot fixed when it began and buffers
//! its writes until commit. Commits are atomic: either every pending write
//! is applied or none is. Read-write transactions use optimistic
//! concurrency control; a commit that overlaps a newer commit on any key it
//! read or wrote fails with a conflict and must be retried by the caller.

mod iterator;
mod state;

pub use iterator::{IteratorOptions, KeyIterator, DEFAULT_PREFETCH_SIZE};
pub use state::{PendingWrite, Transaction, TransactionId, TransactionMode, TransactionState};
