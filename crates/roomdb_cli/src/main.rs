//! RoomDB CLI
//!
//! Command-line tools for RoomDB data file management.
//!
//! # Commands
//!
//! - `init` - Create a fresh data file with the standard room schema
//! - `inspect` - Display header, schema, and slot statistics
//! - `verify` - Verify data file integrity
//! - `dump` - Print records for debugging

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RoomDB command-line data file tools.
#[derive(Parser)]
#[command(name = "roomdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh data file with the standard room schema
    Init {
        /// Magic number to write into the header
        #[arg(short, long)]
        magic: Option<u32>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Display header, schema, and slot statistics
    Inspect {
        /// Show the field schema
        #[arg(short, long)]
        schema: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify data file integrity
    Verify {
        /// Required magic number
        #[arg(short, long)]
        magic: Option<u32>,
    },

    /// Print records for debugging
    Dump {
        /// Include tombstoned slots
        #[arg(short, long)]
        include_deleted: bool,

        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { magic, force } => {
            let path = cli.path.ok_or("Data file path required for init")?;
            commands::init::run(&path, magic, force)?;
        }
        Commands::Inspect { schema, format } => {
            let path = cli.path.ok_or("Data file path required for inspect")?;
            commands::inspect::run(&path, schema, &format)?;
        }
        Commands::Verify { magic } => {
            let path = cli.path.ok_or("Data file path required for verify")?;
            commands::verify::run(&path, magic)?;
        }
        Commands::Dump {
            include_deleted,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Data file path required for dump")?;
            commands::dump::run(&path, include_deleted, limit, &format)?;
        }
        Commands::Version => {
            println!("RoomDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("RoomDB Core v{}", roomdb_core::VERSION);
        }
    }

    Ok(())
}
