//! Model-checking harness.
//!
//! Runs console operations against a real store and against a `BTreeMap`
//! model at the same time, so tests can assert the two never diverge.

use crate::fixtures::TestStore;
use crate::generators::StoreOperation;
use kvconsole_core::ops;
use std::collections::BTreeMap;

/// A store paired with the contents it is expected to hold.
pub struct ModelHarness {
    /// The store under test.
    pub store: TestStore,
    model: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ModelHarness {
    /// Creates a harness over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(TestStore::memory())
    }

    /// Creates a harness over an existing, empty test store.
    pub fn with_store(store: TestStore) -> Self {
        Self {
            store,
            model: BTreeMap::new(),
        }
    }

    /// Applies an operation to both the store and the model.
    ///
    /// # Panics
    ///
    /// Panics if the store operation fails or deletes a different key set
    /// than the model predicts.
    pub fn apply(&mut self, op: &StoreOperation) {
        match op {
            StoreOperation::Insert { key, value } => {
                ops::insert(&self.store, key, value).expect("Failed to insert");
                self.model.insert(key.clone(), value.clone());
            }
            StoreOperation::DeleteOne { key } => {
                let report = ops::delete_one(&self.store, key).expect("Failed to delete");
                let expected: Vec<Vec<u8>> =
                    self.model.remove(key).map(|_| key.clone()).into_iter().collect();
                assert_eq!(report.deleted, expected, "DeleteOne removed the wrong keys");
            }
            StoreOperation::PrefixDelete { prefix } => {
                let report =
                    ops::prefix_delete(&self.store, prefix).expect("Failed to prefix delete");
                let expected = self.take_matching(prefix);
                assert_eq!(report.deleted, expected, "PrefixDelete removed the wrong keys");
            }
            StoreOperation::DeleteAll => {
                let report = ops::delete_all(&self.store).expect("Failed to delete all");
                let expected = self.take_matching(&[]);
                assert_eq!(report.deleted, expected, "DeleteAll removed the wrong keys");
            }
        }
    }

    /// Verifies that a full scan of the store equals the model.
    pub fn verify(&self) {
        let mut actual = Vec::new();
        ops::display_all(&self.store, |record| {
            actual.push((record.key.clone(), record.value.clone()));
            Ok(())
        })
        .expect("Failed to scan store");

        let expected: Vec<(Vec<u8>, Vec<u8>)> = self
            .model
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        assert_eq!(actual, expected, "Store contents diverged from model");
    }

    /// Verifies that a prefix scan returns exactly the model's matches.
    pub fn verify_prefix(&self, prefix: &[u8]) {
        let mut actual = Vec::new();
        ops::prefix_scan(&self.store, prefix, |record| {
            actual.push(record.key.clone());
            Ok(())
        })
        .expect("Failed to prefix scan");

        let expected: Vec<Vec<u8>> = self
            .model
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        assert_eq!(actual, expected, "Prefix scan diverged from model");
    }

    /// Returns the number of keys the model holds.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }

    fn take_matching(&mut self, prefix: &[u8]) -> Vec<Vec<u8>> {
        let keys: Vec<Vec<u8>> = self
            .model
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        for key in &keys {
            self.model.remove(key);
        }
        keys
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}
