//! CLI argument definitions using clap
//!
//! Commands:
//! - persistent-atom inspect --config <path> --key <key>
//! - persistent-atom backups --config <path> --key <key>
//! - persistent-atom write --config <path> --key <key> --value <json>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// persistent-atom - inspect and maintain persisted atom records
#[derive(Parser, Debug)]
#[command(name = "persistent-atom")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit INFO and TRACE logs as well as warnings and errors
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show a record's stored version and payload without hydrating it
    Inspect {
        /// Path to settings file
        #[arg(long, default_value = "./atoms.json")]
        config: PathBuf,

        /// Record key
        #[arg(long)]
        key: String,
    },

    /// List backups taken of corrupt records for a key
    Backups {
        /// Path to settings file
        #[arg(long, default_value = "./atoms.json")]
        config: PathBuf,

        /// Record key
        #[arg(long)]
        key: String,
    },

    /// Hydrate a key, set a new JSON value and flush it
    Write {
        /// Path to settings file
        #[arg(long, default_value = "./atoms.json")]
        config: PathBuf,

        /// Record key
        #[arg(long)]
        key: String,

        /// New value as JSON text
        #[arg(long)]
        value: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
