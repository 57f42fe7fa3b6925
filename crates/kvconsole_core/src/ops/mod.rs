//! Console operations.
//!
//! Each operation is a complete unit of work against a [`Store`]: it opens
//! its own transaction (or write batch), does its work and closes it on
//! every exit path. Operations never print; records are handed to a
//! visitor and outcomes are returned as values so the caller decides how
//! to present them.
//!
//! [`Store`]: crate::Store

mod bulk;
mod delete;
mod read;
mod write;

pub use bulk::{batch_load, record_key, record_value, BatchLoadReport, VALUE_WIDTH};
pub use delete::{delete_all, delete_one, prefix_delete, DeleteFailure, DeleteReport};
pub use read::{count, display_all, display_one, prefix_scan};
pub use write::insert;
