//! # kvconsole testkit
//!
//! Test utilities for kvconsole.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - Property-based test generators using proptest
//! - A model harness that mirrors a store in a `BTreeMap` and checks that
//!   both agree
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kvconsole_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_memory_store(|store| {
//!         kvconsole_core::ops::insert(store, b"k", b"v").unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
}

pub use fixtures::*;
pub use generators::*;
pub use harness::*;
