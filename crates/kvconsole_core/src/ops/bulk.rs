use crate::batch::BatchStats;
use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use tracing::info;

/// Width of the zero-padded decimal written as each bulk-load value.
pub const VALUE_WIDTH: usize = 128;

/// Outcome of [`batch_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLoadReport {
    /// Records written.
    pub inserted: usize,
    /// Records deleted afterwards.
    pub deleted: usize,
    /// Batch counters.
    pub stats: BatchStats,
}

/// Key of the `i`th bulk-load record: its decimal form.
#[must_use]
pub fn record_key(i: usize) -> String {
    i.to_string()
}

/// Value of the `i`th bulk-load record: its decimal form zero-padded to
/// 128 digits.
#[must_use]
pub fn record_value(i: usize) -> String {
    format!("{i:0width$}", width = VALUE_WIDTH)
}

/// Writes `records` synthetic records, then deletes the first `deletes` of
/// them, all through one write batch.
///
/// Deletes past the last record are still issued and are no-ops.
pub fn batch_load(store: &Store, records: usize, deletes: usize) -> CoreResult<BatchLoadReport> {
    let mut batch = store.new_write_batch();

    let queued = (0..records)
        .try_for_each(|i| batch.set(record_key(i), record_value(i)))
        .and_then(|()| (0..deletes).try_for_each(|i| batch.delete(record_key(i))));
    if let Err(err) = queued {
        // Surface the chunk failure rather than the poisoned-batch marker
        return Err(match err {
            CoreError::BatchAborted => batch.flush().err().unwrap_or(CoreError::BatchAborted),
            other => other,
        });
    }
    let stats = batch.flush()?;

    info!(records, deletes, commits = stats.commits, "bulk load complete");
    Ok(BatchLoadReport {
        inserted: records,
        deleted: deletes,
        stats,
    })
}
