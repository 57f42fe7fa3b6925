//! kvconsole
//!
//! Interactive console over a transactional key/value store.
//!
//! Without a subcommand the numbered operator menu runs on stdin/stdout.
//!
//! # Commands
//!
//! - `bulk-load` - Write synthetic records, then delete some of them
//! - `count` - Print the number of keys
//! - `version` - Show version information

mod commands;
mod console;

use clap::{Parser, Subcommand};
use kvconsole_core::{Config, Store, DEFAULT_PREFETCH_SIZE};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Operator console for a kvconsole store.
#[derive(Parser)]
#[command(name = "kvconsole")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long, default_value = "/tmp/kvconsole")]
    path: PathBuf,

    /// Use a throwaway in-memory store instead of the directory
    #[arg(global = true, long)]
    in_memory: bool,

    /// Do not fsync on every commit
    #[arg(global = true, long)]
    no_sync: bool,

    /// Entries fetched per iterator round trip
    #[arg(global = true, long, default_value_t = DEFAULT_PREFETCH_SIZE)]
    prefetch_size: usize,

    /// Engine page cache size in bytes
    #[arg(global = true, long, value_name = "BYTES")]
    cache_size: Option<usize>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write synthetic records, then delete the first few
    BulkLoad {
        /// Number of records to write
        #[arg(short, long, default_value_t = 50_000)]
        records: usize,

        /// Number of records to delete afterwards
        #[arg(short, long, default_value_t = 1_000)]
        deletes: usize,
    },

    /// Print the number of keys in the store
    Count,

    /// Show version information
    Version,
}

impl Cli {
    fn config(&self) -> Config {
        let config = Config::new()
            .sync_on_commit(!self.no_sync)
            .prefetch_size(self.prefetch_size);
        match self.cache_size {
            Some(bytes) => config.cache_size(bytes),
            None => config,
        }
    }

    fn open_store(&self) -> Result<Store, kvconsole_core::CoreError> {
        if self.in_memory {
            Store::open_in_memory_with_config(self.config())
        } else {
            Store::open_with_config(&self.path, self.config())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so the menu owns stdout
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Some(Commands::Version) = cli.command {
        println!("kvconsole v{}", env!("CARGO_PKG_VERSION"));
        println!("kvconsole core v{}", kvconsole_core::VERSION);
        return Ok(());
    }

    let store = cli.open_store()?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        None => {
            let stdin = io::stdin().lock();
            console::Console::new(&store, stdin, &mut stdout).run()?;
        }
        Some(Commands::BulkLoad { records, deletes }) => {
            commands::bulk_load::run(&store, records, deletes, &mut stdout)?;
        }
        Some(Commands::Count) => {
            commands::count::run(&store, &mut stdout)?;
        }
        Some(Commands::Version) => {}
    }

    store.close()?;
    Ok(())
}
