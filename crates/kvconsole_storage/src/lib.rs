//! # kvconsole storage
//!
//! Storage engine seam for kvconsole.
//!
//! The console never talks to an on-disk format directly. Everything below
//! the transaction layer goes through two small traits:
//!
//! - [`Engine`] hands out read snapshots and applies write sets atomically
//! - [`Snapshot`] is an immutable, ordered view of the keyspace
//!
//! Engines know nothing about transactions, iterators or the console. They
//! store opaque byte keys and values, order keys lexicographically, and
//! detect write conflicts against a base sequence number when asked to.
//! Conflict detection holds for as long as the caller keeps the snapshot
//! that produced the base sequence alive.
//!
//! ## Available Engines
//!
//! - [`MemoryEngine`] - For testing and ephemeral stores
//! - [`RedbEngine`] - Persistent storage backed by the `redb` crate
//!
//! ## Example
//!
//! ```rust
//! use kvconsole_storage::{CommitRequest, Engine, MemoryEngine, WriteOp};
//! use std::ops::Bound;
//!
//! let engine = MemoryEngine::new();
//! let ops = vec![WriteOp::put(b"k1".to_vec(), b"v1".to_vec())];
//! engine.commit(CommitRequest::unconditional(&ops)).unwrap();
//!
//! let snapshot = engine.snapshot().unwrap();
//! let entries = snapshot.scan(Bound::Unbounded, 10).unwrap();
//! assert_eq!(entries, vec![(b"k1".to_vec(), b"v1".to_vec())]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod memory;
mod redb_engine;
mod registry;
mod types;

pub use engine::{CommitRequest, Engine, Snapshot};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryEngine;
pub use redb_engine::{EngineOptions, RedbEngine};
pub use types::{Entry, SequenceNumber, WriteOp};
