//! SegStore CLI
//!
//! Command-line tools for inspecting and exercising a segment store.
//!
//! # Commands
//!
//! - `inspect` - List groups, segments, and foreign entries under the root
//! - `create` - Create a segment and optionally fill it
//! - `delete` - Delete a segment by group and version

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use segstore_core::{Config, VersionPolicy, DEFAULT_ROOT};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SegStore command-line tools.
#[derive(Parser)]
#[command(name = "segstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage root directory
    #[arg(global = true, short, long, default_value = DEFAULT_ROOT)]
    root: PathBuf,

    /// Version allocation policy
    #[arg(global = true, long, value_enum, default_value_t = Policy::Disk)]
    policy: Policy,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Scan the group directory on every create
    Disk,
    /// Use the in-memory index
    Index,
}

impl From<Policy> for VersionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Disk => VersionPolicy::DiskScan,
            Policy::Index => VersionPolicy::IndexScan,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the contents of the storage root
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a segment
    Create {
        /// Group id
        group: u64,

        /// Size in bytes
        size: u64,

        /// Byte to fill the new segment with
        #[arg(long)]
        fill: Option<u8>,
    },

    /// Delete a segment
    Delete {
        /// Group id
        group: u64,

        /// Segment version
        version: u64,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::new()
        .create_if_missing(false)
        .version_policy(cli.policy.into());

    match cli.command {
        Commands::Inspect { format } => {
            commands::inspect::run(&cli.root, &config, &format)?;
        }
        Commands::Create { group, size, fill } => {
            commands::create::run(&cli.root, config, group, size, fill)?;
        }
        Commands::Delete { group, version } => {
            commands::delete::run(&cli.root, config, group, version)?;
        }
        Commands::Version => {
            println!("SegStore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("SegStore Core v{}", segstore_core::VERSION);
        }
    }

    Ok(())
}
