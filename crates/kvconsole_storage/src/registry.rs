//! Live snapshot tracking for version pruning.
//!
//! Conflict detection only needs a key's commit version while some snapshot
//! older than that commit is still alive. Engines pin every snapshot they
//! hand out here, and before each commit ask for the oldest pinned sequence
//! so they can drop versions nobody can conflict with any more.

use crate::types::SequenceNumber;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

type Pins = BTreeMap<SequenceNumber, usize>;

/// Reference counts of live snapshots, keyed by snapshot sequence.
#[derive(Debug, Default, Clone)]
pub(crate) struct SnapshotRegistry {
    pins: Arc<Mutex<Pins>>,
}

impl SnapshotRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Locks the registry.
    ///
    /// Engines hold the lock while taking a snapshot and while committing,
    /// so a snapshot is either pinned before a commit computes its horizon
    /// or observes that commit.
    pub(crate) fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            registry: self,
            pins: self.pins.lock(),
        }
    }

    /// Number of distinct sequences currently pinned.
    #[cfg(test)]
    pub(crate) fn pinned(&self) -> usize {
        self.pins.lock().len()
    }
}

/// Exclusive access to the pin table.
pub(crate) struct RegistryGuard<'r> {
    registry: &'r SnapshotRegistry,
    pins: MutexGuard<'r, Pins>,
}

impl RegistryGuard<'_> {
    /// Pins `sequence` until the returned handle is dropped.
    pub(crate) fn pin(&mut self, sequence: SequenceNumber) -> SnapshotPin {
        *self.pins.entry(sequence).or_insert(0) += 1;
        SnapshotPin {
            pins: Arc::clone(&self.registry.pins),
            sequence,
        }
    }

    /// Returns the oldest sequence still pinned by someone other than the
    /// committer, or `None` if no other snapshot is alive.
    ///
    /// `own` is the committer's base: one pin at that sequence belongs to
    /// the committer itself, which cannot commit again.
    pub(crate) fn horizon(&self, own: Option<SequenceNumber>) -> Option<SequenceNumber> {
        self.pins
            .iter()
            .find(|(sequence, count)| {
                let own_pin = usize::from(own == Some(**sequence));
                **count > own_pin
            })
            .map(|(sequence, _)| *sequence)
    }
}

/// Keeps a snapshot sequence pinned while alive.
#[derive(Debug)]
pub(crate) struct SnapshotPin {
    pins: Arc<Mutex<Pins>>,
    sequence: SequenceNumber,
}

impl Drop for SnapshotPin {
    fn drop(&mut self) {
        let mut pins = self.pins.lock();
        if let Some(count) = pins.get_mut(&self.sequence) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&self.sequence);
            }
        }
    }
}

/// Returns true if a version committed at `version` can still conflict with
/// a snapshot at or after `horizon`.
pub(crate) fn still_needed(version: SequenceNumber, horizon: Option<SequenceNumber>) -> bool {
    horizon.is_some_and(|oldest| version > oldest)
}
