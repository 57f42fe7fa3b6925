//! Property-based test generators using proptest.
//!
//! Keys are drawn from a small alphabet so that generated prefixes
//! actually collide with generated keys.

use proptest::prelude::*;

/// Alphabet used for generated keys and prefixes.
pub const KEY_ALPHABET: &[u8] = b"abcd";

/// Strategy for generating valid (non-empty) keys.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(KEY_ALPHABET), 1..6)
}

/// Strategy for generating prefixes, including the empty prefix.
pub fn prefix_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(KEY_ALPHABET), 0..3)
}

/// Strategy for generating values (arbitrary bytes, possibly empty).
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// A console operation that changes the store.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Insert or overwrite a key.
    Insert {
        /// Key
        key: Vec<u8>,
        /// Value
        value: Vec<u8>,
    },
    /// Delete one key.
    DeleteOne {
        /// Key
        key: Vec<u8>,
    },
    /// Delete every key with a prefix.
    PrefixDelete {
        /// Prefix
        prefix: Vec<u8>,
    },
    /// Delete everything.
    DeleteAll,
}

/// Strategy for generating store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        6 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| StoreOperation::Insert { key, value }),
        2 => key_strategy().prop_map(|key| StoreOperation::DeleteOne { key }),
        2 => prefix_strategy().prop_map(|prefix| StoreOperation::PrefixDelete { prefix }),
        1 => Just(StoreOperation::DeleteAll),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
