//! CaskDB CLI
//!
//! Runs a single command against a local data directory.

use std::process;

use caskdb::{CaskError, Config, Engine, Record};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// CaskDB CLI
#[derive(Parser, Debug)]
#[command(name = "caskdb-cli")]
#[command(about = "CLI for the CaskDB key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./caskdb_data")]
    data_dir: String,

    /// Segment size limit in MB before rolling to a new segment
    #[arg(short = 's', long, default_value = "1024")]
    segment_mb: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    #[command(alias = "del")]
    Delete {
        /// The key to delete
        key: String,
    },

    /// List records with keys in [start, end]
    Scan {
        /// Lower bound (inclusive)
        #[arg(long, default_value = "")]
        start: String,

        /// Upper bound (inclusive); everything when omitted
        #[arg(long)]
        end: Option<String>,
    },

    /// Print store statistics
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caskdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let max_segment_size = match segment_bytes(args.segment_mb) {
        Ok(size) => size,
        Err(e) => {
            tracing::error!("Invalid arguments: {}", e);
            process::exit(2);
        }
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .max_segment_size(max_segment_size)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            process::exit(1);
        }
    };

    let outcome = run(&engine, args.command);

    if let Err(e) = engine.close() {
        tracing::error!("Failed to close engine: {}", e);
        process::exit(1);
    }

    if let Err(e) = outcome {
        tracing::error!("Command failed: {}", e);
        process::exit(1);
    }
}

/// Megabytes from the command line to bytes
fn segment_bytes(segment_mb: u64) -> caskdb::Result<u64> {
    segment_mb
        .checked_mul(1024 * 1024)
        .ok_or_else(|| CaskError::Config(format!("segment size of {} MB is out of range", segment_mb)))
}

fn run(engine: &Engine, command: Commands) -> caskdb::Result<()> {
    match command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(record) => print_record(&record),
            None => println!("(not found)"),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Delete { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Scan { start, end } => {
            let records = match end {
                Some(end) => engine.scan(start.as_bytes(), end.as_bytes())?,
                None => engine.scan_from(start.as_bytes())?,
            };
            for record in &records {
                print_record(record);
            }
            println!("({} records)", records.len());
        }
        Commands::Stats => {
            let recovery = engine.recovery();
            println!("version:          {}", caskdb::VERSION);
            println!("live keys:        {}", engine.len());
            println!("segments:         {:?}", engine.segment_ids());
            println!("active segment:   {}", engine.active_segment_id());
            println!("replayed records: {}", recovery.records_replayed);
            println!("tombstones:       {}", recovery.tombstones_replayed);
            println!("truncated tails:  {:?}", recovery.truncated_segments);
        }
    }
    Ok(())
}

fn print_record(record: &Record) {
    println!(
        "{}\t{}\t{}",
        String::from_utf8_lossy(&record.key),
        String::from_utf8_lossy(&record.value),
        record.timestamp
    );
}
