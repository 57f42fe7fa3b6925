//! Bulk load command implementation.

use super::CommandResult;
use kvconsole_core::{ops, Store};
use std::io::Write;

/// Loads `records` synthetic records and deletes the first `deletes`.
pub fn run(store: &Store, records: usize, deletes: usize, out: &mut impl Write) -> CommandResult {
    let report = ops::batch_load(store, records, deletes)?;
    writeln!(
        out,
        "Inserted {} Deleted {}",
        report.inserted, report.deleted
    )?;
    Ok(())
}
