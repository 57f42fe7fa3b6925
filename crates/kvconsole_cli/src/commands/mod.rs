//! Command implementations shared by the console and the subcommands.

pub mod bulk_load;
pub mod count;

use kvconsole_core::ops::DeleteReport;
use kvconsole_core::CoreError;
use std::io::{self, Write};
use thiserror::Error;

/// Result type for command handlers.
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Errors raised while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The store rejected the operation.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// Writing to the operator failed.
    #[error("output error: {0}")]
    Output(#[from] io::Error),

    /// A count prompt got something that is not a non-negative integer.
    #[error("invalid number: {input:?}")]
    InvalidNumber {
        /// What was typed.
        input: String,
    },
}

impl CommandError {
    /// Returns true if the error only concerns this command and the console
    /// can keep going.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Output(_))
    }
}

/// Parses a count typed by the operator.
pub fn parse_count(input: &str) -> CommandResult<usize> {
    input
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidNumber {
            input: input.trim().to_string(),
        })
}

/// Prints one line per deleted key and per failure.
pub fn print_delete_report(out: &mut impl Write, report: &DeleteReport) -> io::Result<()> {
    for key in &report.deleted {
        writeln!(out, "Record Deleted - {}", String::from_utf8_lossy(key))?;
    }
    for failure in &report.failures {
        writeln!(
            out,
            "Delete Failed - {}: {}",
            String::from_utf8_lossy(&failure.key),
            failure.error
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvconsole_core::ops::DeleteFailure;

    #[test]
    fn parse_count_accepts_padded_numbers() {
        assert_eq!(parse_count(" 42 ").unwrap(), 42);
    }

    #[test]
    fn parse_count_rejects_garbage() {
        let err = parse_count("-3").unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "invalid number: \"-3\"");
    }

    #[test]
    fn output_errors_are_fatal() {
        let err = CommandError::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn delete_report_lines() {
        let report = DeleteReport {
            deleted: vec![b"a".to_vec(), b"b".to_vec()],
            failures: vec![DeleteFailure {
                key: b"c".to_vec(),
                error: CoreError::EmptyKey,
            }],
            ..DeleteReport::default()
        };
        let mut out = Vec::new();
        print_delete_report(&mut out, &report).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Record Deleted - a\nRecord Deleted - b\nDelete Failed - c: key cannot be empty\n"
        );
    }
}
