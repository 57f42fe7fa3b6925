//! Interactive menu loop.

use crate::commands::{self, CommandError, CommandResult};
use kvconsole_core::{ops, Store};
use std::io::{self, BufRead, Write};
use tracing::debug;

const MENU: &str = "\
Enter your choice
1. Enter value
2. Display all records
3. Display one record
4. Delete one record
5. Prefix scan
6. Prefix scan - delete
7. Delete all records
8. Exit
9. Bulk load";

/// A menu selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Insert,
    DisplayAll,
    DisplayOne,
    DeleteOne,
    PrefixScan,
    PrefixDelete,
    DeleteAll,
    Exit,
    BulkLoad,
}

impl Choice {
    fn parse(input: &str) -> Option<Self> {
        let choice = match input.trim() {
            "1" => Self::Insert,
            "2" => Self::DisplayAll,
            "3" => Self::DisplayOne,
            "4" => Self::DeleteOne,
            "5" => Self::PrefixScan,
            "6" => Self::PrefixDelete,
            "7" => Self::DeleteAll,
            "8" => Self::Exit,
            "9" => Self::BulkLoad,
            _ => return None,
        };
        Some(choice)
    }
}

/// The operator console.
///
/// Reads one selection per line from `input` and writes prompts and results
/// to `output`. Store errors are printed and the loop continues; only a
/// failure to read input or write output ends it with an error. Exit,
/// an unrecognized selection, or end of input end it normally.
pub struct Console<'s, R, W> {
    store: &'s Store,
    input: R,
    output: W,
}

impl<'s, R: BufRead, W: Write> Console<'s, R, W> {
    /// Creates a console over the given store and streams.
    pub fn new(store: &'s Store, input: R, output: W) -> Self {
        Self {
            store,
            input,
            output,
        }
    }

    /// Runs the menu loop until the operator leaves.
    pub fn run(&mut self) -> io::Result<()> {
        let greeting = commands::count::run(self.store, &mut self.output);
        self.settle(greeting)?;

        loop {
            writeln!(self.output, "{MENU}")?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                debug!("end of input");
                return Ok(());
            };
            let choice = match Choice::parse(&line) {
                Some(Choice::Exit) => return Ok(()),
                Some(choice) => choice,
                None => {
                    debug!(input = %line.trim(), "unrecognized selection");
                    return Ok(());
                }
            };

            let result = self.dispatch(choice);
            self.settle(result)?;
        }
    }

    /// Consumes the console and returns its output stream.
    pub fn into_output(self) -> W {
        self.output
    }

    fn dispatch(&mut self, choice: Choice) -> CommandResult {
        match choice {
            Choice::Insert => self.insert(),
            Choice::DisplayAll => self.display_all(),
            Choice::DisplayOne => self.display_one(),
            Choice::DeleteOne => self.delete_one(),
            Choice::PrefixScan => self.prefix_scan(),
            Choice::PrefixDelete => self.prefix_delete(),
            Choice::DeleteAll => self.delete_all(),
            Choice::BulkLoad => self.bulk_load(),
            Choice::Exit => Ok(()),
        }
    }

    /// Prints recoverable errors and propagates the rest.
    fn settle(&mut self, result: CommandResult) -> io::Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(CommandError::Output(err)) => Err(err),
            Err(err) => writeln!(self.output, "{err}"),
        }
    }

    fn insert(&mut self) -> CommandResult {
        let key = self.prompt("Enter Key")?;
        let value = self.prompt("Enter Value")?;
        ops::insert(self.store, key.as_bytes(), value.as_bytes())?;
        writeln!(self.output, "Record Inserted")?;
        Ok(())
    }

    fn display_all(&mut self) -> CommandResult {
        let out = &mut self.output;
        let keys = ops::display_all(self.store, |record| {
            writeln!(out, "Value : {record}")?;
            Ok(())
        })?;
        writeln!(self.output, "Read {keys} keys")?;
        Ok(())
    }

    fn display_one(&mut self) -> CommandResult {
        let key = self.prompt("Enter Key")?;
        if let Some(record) = ops::display_one(self.store, key.as_bytes())? {
            writeln!(self.output, "{record}")?;
        }
        Ok(())
    }

    fn delete_one(&mut self) -> CommandResult {
        let key = self.prompt("Enter Key")?;
        let report = ops::delete_one(self.store, key.as_bytes())?;
        commands::print_delete_report(&mut self.output, &report)?;
        Ok(())
    }

    fn prefix_scan(&mut self) -> CommandResult {
        let prefix = self.prompt("Enter Prefix")?;
        let out = &mut self.output;
        ops::prefix_scan(self.store, prefix.as_bytes(), |record| {
            writeln!(out, "{record}")?;
            Ok(())
        })?;
        Ok(())
    }

    fn prefix_delete(&mut self) -> CommandResult {
        let prefix = self.prompt("Enter Prefix To Delete")?;
        let report = ops::prefix_delete(self.store, prefix.as_bytes())?;
        commands::print_delete_report(&mut self.output, &report)?;
        Ok(())
    }

    fn delete_all(&mut self) -> CommandResult {
        let report = ops::delete_all(self.store)?;
        commands::print_delete_report(&mut self.output, &report)?;
        Ok(())
    }

    fn bulk_load(&mut self) -> CommandResult {
        let records = commands::parse_count(&self.prompt("Enter number of records")?)?;
        let deletes = commands::parse_count(&self.prompt("Enter number of deletes")?)?;
        commands::bulk_load::run(self.store, records, deletes, &mut self.output)
    }

    /// Prints `label` and reads the answer. End of input reads as empty.
    fn prompt(&mut self, label: &str) -> io::Result<String> {
        writeln!(self.output, "{label}")?;
        self.output.flush()?;
        Ok(self
            .read_line()?
            .map(|line| line.trim().to_string())
            .unwrap_or_default())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_script(store: &Store, script: &str) -> String {
        let mut console = Console::new(store, Cursor::new(script.to_string()), Vec::new());
        console.run().unwrap();
        String::from_utf8(console.into_output()).unwrap()
    }

    fn body(output: &str) -> Vec<&str> {
        output
            .lines()
            .filter(|line| !MENU.lines().any(|m| m == *line))
            .collect()
    }

    #[test]
    fn choice_parsing() {
        assert_eq!(Choice::parse("1\n"), Some(Choice::Insert));
        assert_eq!(Choice::parse(" 9 "), Some(Choice::BulkLoad));
        assert_eq!(Choice::parse("10"), None);
        assert_eq!(Choice::parse(""), None);
    }

    #[test]
    fn greets_with_key_count() {
        let store = Store::open_in_memory().unwrap();
        ops::insert(&store, b"k", b"v").unwrap();
        let output = run_script(&store, "8\n");
        assert!(output.starts_with("Read 1 keys\n"));
    }

    #[test]
    fn insert_and_display() {
        let store = Store::open_in_memory().unwrap();
        let output = run_script(&store, "1\nbKey\nbValue\n3\nbKey\n2\n8\n");
        assert_eq!(
            body(&output),
            vec![
                "Read 0 keys",
                "Enter Key",
                "Enter Value",
                "Record Inserted",
                "Enter Key",
                "key=bKey, value=bValue",
                "Value : key=bKey, value=bValue",
                "Read 1 keys",
            ]
        );
    }

    #[test]
    fn delete_one_then_display_all_is_empty() {
        let store = Store::open_in_memory().unwrap();
        let output = run_script(&store, "1\nbKey\nbValue\n4\nbKey\n2\n");
        let lines = body(&output);
        assert!(lines.contains(&"Record Deleted - bKey"));
        assert!(!lines.iter().any(|l| l.starts_with("Value :")));
        assert_eq!(lines.last(), Some(&"Read 0 keys"));
        assert_eq!(ops::count(&store).unwrap(), 0);
    }

    #[test]
    fn prefix_commands() {
        let store = Store::open_in_memory().unwrap();
        for key in ["ab1", "ab2", "b"] {
            ops::insert(&store, key.as_bytes(), b"v").unwrap();
        }
        let output = run_script(&store, "5\nab\n6\nab\n");
        let lines = body(&output);
        assert!(lines.contains(&"key=ab1, value=v"));
        assert!(lines.contains(&"key=ab2, value=v"));
        assert!(!lines.contains(&"key=b, value=v"));
        assert!(lines.contains(&"Record Deleted - ab1"));
        assert!(lines.contains(&"Record Deleted - ab2"));
        assert_eq!(ops::count(&store).unwrap(), 1);
    }

    #[test]
    fn delete_all_and_bulk_load() {
        let store = Store::open_in_memory().unwrap();
        let output = run_script(&store, "9\n30\n10\n7\n");
        let lines = body(&output);
        assert!(lines.contains(&"Inserted 30 Deleted 10"));
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("Record Deleted - ")).count(),
            20
        );
        assert_eq!(ops::count(&store).unwrap(), 0);
    }

    #[test]
    fn errors_are_reported_and_loop_continues() {
        let store = Store::open_in_memory().unwrap();
        let output = run_script(&store, "1\n\nvalue\n9\nlots\n1\nk\nv\n");
        let lines = body(&output);
        assert!(lines.contains(&"key cannot be empty"));
        assert!(lines.contains(&"invalid number: \"lots\""));
        assert!(lines.contains(&"Record Inserted"));
    }

    #[test]
    fn unrecognized_choice_exits() {
        let store = Store::open_in_memory().unwrap();
        let output = run_script(&store, "x\n1\nk\nv\n");
        assert!(!output.contains("Record Inserted"));
        assert_eq!(ops::count(&store).unwrap(), 0);
    }

    #[test]
    fn end_of_input_exits() {
        let store = Store::open_in_memory().unwrap();
        let output = run_script(&store, "");
        assert_eq!(body(&output), vec!["Read 0 keys"]);
    }

    #[test]
    fn closed_store_errors_are_printed() {
        let store = Store::open_in_memory().unwrap();
        store.close().unwrap();
        let output = run_script(&store, "2\n");
        assert_eq!(body(&output), vec!["store is closed", "store is closed"]);
    }
}
