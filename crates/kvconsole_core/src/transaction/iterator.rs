//! Ordered key iteration over a transaction's view.

use crate::error::CoreResult;
use crate::record::Record;
use crate::transaction::state::PendingWrite;
use kvconsole_storage::{Entry, Snapshot};
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

/// Default number of entries fetched from the snapshot per round trip.
pub const DEFAULT_PREFETCH_SIZE: usize = 100;

/// Options for [`crate::Transaction::iter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratorOptions {
    /// Entries pulled from the snapshot per fetch. Zero is treated as one.
    pub prefetch_size: usize,
    /// Restricts iteration to keys starting with these bytes.
    pub prefix: Option<Vec<u8>>,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self {
            prefetch_size: DEFAULT_PREFETCH_SIZE,
            prefix: None,
        }
    }
}

impl IteratorOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefetch size.
    #[must_use]
    pub fn prefetch_size(mut self, size: usize) -> Self {
        self.prefetch_size = size;
        self
    }

    /// Restricts iteration to the given key prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// A cursor over the keys visible to a transaction, in ascending order.
///
/// The iterator reads from the transaction's snapshot, merged with a copy
/// of the transaction's pending writes taken when the iterator was created.
/// It holds no borrow of the transaction, so the transaction may keep
/// setting and deleting keys while the iterator is live; those later writes
/// never change what the iterator yields.
///
/// A new iterator is unpositioned. Call [`KeyIterator::rewind`] or
/// [`KeyIterator::seek`] before reading.
///
/// ```rust,ignore
/// let mut it = txn.iter(IteratorOptions::default());
/// it.rewind()?;
/// while let Some(record) = it.item() {
///     println!("{record}");
///     it.next()?;
/// }
/// ```
pub struct KeyIterator {
    snapshot: Arc<dyn Snapshot>,
    /// Pending writes as of iterator creation.
    pending: BTreeMap<Vec<u8>, PendingWrite>,
    prefix: Option<Vec<u8>>,
    prefetch_size: usize,
    /// First key of the current positioning.
    start: Vec<u8>,
    /// Last key fetched from the snapshot.
    resume_after: Option<Vec<u8>>,
    fetched: VecDeque<Entry>,
    snapshot_done: bool,
    overlay: VecDeque<(Vec<u8>, PendingWrite)>,
    current: Option<Record>,
}

impl KeyIterator {
    pub(crate) fn new(
        snapshot: Arc<dyn Snapshot>,
        pending: BTreeMap<Vec<u8>, PendingWrite>,
        options: IteratorOptions,
    ) -> Self {
        Self {
            snapshot,
            pending,
            prefix: options.prefix,
            prefetch_size: options.prefetch_size.max(1),
            start: Vec::new(),
            resume_after: None,
            fetched: VecDeque::new(),
            snapshot_done: true,
            overlay: VecDeque::new(),
            current: None,
        }
    }

    /// Positions the iterator at the first visible key (or the first key
    /// with the configured prefix).
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub fn rewind(&mut self) -> CoreResult<()> {
        let start = self.prefix.clone().unwrap_or_default();
        self.position(start)
    }

    /// Positions the iterator at the first key greater than or equal to
    /// `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub fn seek(&mut self, key: &[u8]) -> CoreResult<()> {
        let start = match &self.prefix {
            Some(prefix) if key < prefix.as_slice() => prefix.clone(),
            _ => key.to_vec(),
        };
        self.position(start)
    }

    /// Returns true while the iterator points at a record.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Returns true while the iterator points at a record whose key starts
    /// with `prefix`.
    #[must_use]
    pub fn valid_for_prefix(&self, prefix: &[u8]) -> bool {
        self.current
            .as_ref()
            .is_some_and(|record| record.key.starts_with(prefix))
    }

    /// Returns the record under the cursor.
    #[must_use]
    pub fn item(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Advances to the next record. Does nothing once the iterator is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> CoreResult<()> {
        if self.current.is_none() {
            return Ok(());
        }
        self.advance()
    }

    fn position(&mut self, start: Vec<u8>) -> CoreResult<()> {
        self.fetched.clear();
        self.resume_after = None;
        self.snapshot_done = false;
        self.overlay = self
            .pending
            .range(start.clone()..)
            .map(|(key, write)| (key.clone(), write.clone()))
            .collect();
        self.start = start;
        self.advance()
    }

    /// Pulls the next page from the snapshot once the buffer runs dry.
    fn fill(&mut self) -> CoreResult<()> {
        if !self.fetched.is_empty() || self.snapshot_done {
            return Ok(());
        }

        let from = match &self.resume_after {
            Some(key) => Bound::Excluded(key.as_slice()),
            None => Bound::Included(self.start.as_slice()),
        };
        let page = self.snapshot.scan(from, self.prefetch_size)?;

        if page.len() < self.prefetch_size {
            self.snapshot_done = true;
        }
        if let Some((last, _)) = page.last() {
            // Past the prefix range: nothing further can match
            if let Some(prefix) = &self.prefix {
                if !last.starts_with(prefix) {
                    self.snapshot_done = true;
                }
            }
            self.resume_after = Some(last.clone());
        }
        self.fetched.extend(page);
        Ok(())
    }

    fn advance(&mut self) -> CoreResult<()> {
        self.current = loop {
            self.fill()?;

            let step = match (self.fetched.front(), self.overlay.front()) {
                (None, None) => None,
                (Some(_), None) => Some(Ordering::Less),
                (None, Some(_)) => Some(Ordering::Greater),
                (Some((base, _)), Some((pending, _))) => Some(base.cmp(pending)),
            };
            let Some(step) = step else {
                break None;
            };

            // On equal keys the pending write shadows the snapshot entry
            let base = if step == Ordering::Greater {
                None
            } else {
                self.fetched.pop_front()
            };
            if step == Ordering::Less {
                break base.map(Record::from);
            }
            if let Some((key, PendingWrite::Put { value })) = self.overlay.pop_front() {
                break Some(Record { key, value });
            }
        };

        let outside_prefix = match (&self.prefix, &self.current) {
            (Some(prefix), Some(record)) => !record.key.starts_with(prefix),
            _ => false,
        };
        if outside_prefix {
            self.exhaust();
        }
        Ok(())
    }

    fn exhaust(&mut self) {
        self.current = None;
        self.fetched.clear();
        self.overlay.clear();
        self.snapshot_done = true;
    }
}

impl std::fmt::Debug for KeyIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyIterator")
            .field("snapshot_seq", &self.snapshot.sequence())
            .field("prefix", &self.prefix)
            .field("prefetch_size", &self.prefetch_size)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
