//! CLI-specific error types
//!
//! All CLI errors end the process with a non-zero exit.

use std::io;

use thiserror::Error;

use crate::atom::AtomError;
use crate::codec::CodecError;
use crate::storage::StorageError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Settings file missing or invalid
    ConfigError,
    /// I/O error (stdout, runtime)
    IoError,
    /// Adapter refused the operation
    StorageError,
    /// Stored record could not be parsed
    CorruptRecord,
    /// `--value` is not JSON
    InvalidValue,
    /// Atom failed to hydrate or persist
    AtomFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ATOM_CLI_CONFIG_ERROR",
            Self::IoError => "ATOM_CLI_IO_ERROR",
            Self::StorageError => "ATOM_CLI_STORAGE_ERROR",
            Self::CorruptRecord => "ATOM_CLI_CORRUPT_RECORD",
            Self::InvalidValue => "ATOM_CLI_INVALID_VALUE",
            Self::AtomFailed => "ATOM_CLI_ATOM_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {}", .code.code(), .message)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidValue, msg)
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<StorageError> for CliError {
    fn from(e: StorageError) -> Self {
        Self::new(CliErrorCode::StorageError, format!("{} ({})", e, e.code()))
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        Self::new(CliErrorCode::CorruptRecord, format!("{} ({})", e, e.code()))
    }
}

impl From<AtomError> for CliError {
    fn from(e: AtomError) -> Self {
        Self::new(CliErrorCode::AtomFailed, format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
