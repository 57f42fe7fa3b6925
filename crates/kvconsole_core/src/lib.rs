//! # kvconsole core
//!
//! Transactional key/value store behind the kvconsole operator console.
//!
//! This crate provides:
//! - [`Store`], a handle over a locked store directory or an in-memory engine
//! - [`Transaction`]s with snapshot isolation and optimistic conflict checks
//! - [`KeyIterator`], ordered and prefix-bounded iteration
//! - [`WriteBatch`] for bulk writes outside transactions
//! - [`ops`], the console operations built on top of all of the above
//!
//! ## Example
//!
//! ```rust
//! use kvconsole_core::{ops, Store};
//!
//! let store = Store::open_in_memory().unwrap();
//! ops::insert(&store, b"user:1", b"ada").unwrap();
//! ops::insert(&store, b"user:2", b"grace").unwrap();
//!
//! let mut names = Vec::new();
//! ops::prefix_scan(&store, b"user:", |record| {
//!     names.push(record.value_lossy());
//!     Ok(())
//! })
//! .unwrap();
//! assert_eq!(names, ["ada", "grace"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod config;
mod dir;
mod error;
mod record;
mod store;
mod transaction;

pub mod ops;

pub use batch::{BatchStats, WriteBatch};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use record::Record;
pub use store::Store;
pub use transaction::{
    IteratorOptions, KeyIterator, PendingWrite, Transaction, TransactionId, TransactionMode,
    TransactionState, DEFAULT_PREFETCH_SIZE,
};

pub use kvconsole_storage::SequenceNumber;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
