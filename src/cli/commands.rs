//! CLI command implementations
//!
//! Commands work directly against a [`FileAdapter`] rooted at the settings'
//! `data_dir`. `inspect` and `backups` never write; `write` goes through a
//! full atom hydration so a corrupt record is refused rather than overwritten.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::atom::{AtomConfig, AtomSettings, PersistentAtom};
use crate::codec::inspect as inspect_record;
use crate::observability::{Logger, Severity};
use crate::storage::StorageAdapter;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Load settings from a JSON file
pub fn load_settings(path: &Path) -> CliResult<AtomSettings> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

    AtomSettings::from_json(&content)
        .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(if cli.verbose {
        Severity::Trace
    } else {
        Severity::Warn
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(run_command(cli.command)) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one command and return its response payload
pub async fn run_command(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Inspect { config, key } => inspect(&load_settings(&config)?, &key).await,
        Command::Backups { config, key } => backups(&load_settings(&config)?, &key).await,
        Command::Write { config, key, value } => {
            write(&load_settings(&config)?, &key, &value).await
        }
    }
}

/// Describe the stored record for `key` without migrating or validating it
pub async fn inspect(settings: &AtomSettings, key: &str) -> CliResult<Value> {
    let adapter = settings.file_adapter();
    let location = adapter.location(key);

    let Some(raw) = adapter.get_item(key).await? else {
        return Ok(json!({
            "key": key,
            "exists": false,
            "location": location,
        }));
    };

    let info = inspect_record(&raw)?;
    Ok(json!({
        "key": key,
        "exists": true,
        "location": location,
        "stored_version": info.stored_version,
        "target_version": settings.version,
        "legacy": info.legacy,
        "ahead": info.stored_version > settings.version,
        "payload": info.payload,
    }))
}

/// List `.corrupt-*.bak` copies for `key`, oldest first
pub async fn backups(settings: &AtomSettings, key: &str) -> CliResult<Value> {
    let adapter = settings.file_adapter();
    let paths: Vec<String> = adapter
        .backups(key)
        .await?
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    Ok(json!({
        "key": key,
        "backups": paths,
    }))
}

/// Hydrate `key` as untyped JSON, then set and flush `value`
pub async fn write(settings: &AtomSettings, key: &str, value: &str) -> CliResult<Value> {
    let next: Value = serde_json::from_str(value)
        .map_err(|e| CliError::invalid_value(format!("--value is not JSON: {}", e)))?;

    let storage = Arc::new(settings.file_adapter());
    let atom = PersistentAtom::new(AtomConfig::new(key, storage, Value::Null).with_settings(settings));
    atom.ready().await?;

    let previous = atom.get();
    atom.set_and_flush(next).await?;

    Ok(json!({
        "key": key,
        "version": settings.version,
        "previous": previous,
        "value": atom.get(),
    }))
}
