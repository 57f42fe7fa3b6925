//! Count command implementation.

use super::CommandResult;
use kvconsole_core::{ops, Store};
use std::io::Write;

/// Prints `Read <n> keys` for the store.
pub fn run(store: &Store, out: &mut impl Write) -> CommandResult {
    let keys = ops::count(store)?;
    writeln!(out, "Read {keys} keys")?;
    Ok(())
}
