//! CLI module for persistent-atom
//!
//! Provides command-line interface for:
//! - inspect: Show a stored record without hydrating it
//! - backups: List corrupt-record backups for a key
//! - write: Hydrate a key and persist a new value

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{backups, inspect, load_settings, run, run_command, write};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
