//! Atom error taxonomy
//!
//! | variant | raised by | surfaced through |
//! |---|---|---|
//! | `Read`, `Decode`, `Migration`, `Validation` | hydration | `ready()` unless a fallback recovers |
//! | `Validation` | `set` | the `set` call, always |
//! | `NotReady` | `set`, `flush` | the call, always |
//! | `Write`, `Encode` | writes | `flush`/`set_and_flush`; logged for automatic writes |
//! | `Backup`, `Fallback` | recovery | logged only |

use thiserror::Error;

use crate::codec::CodecError;
use crate::schema::ValidationError;
use crate::storage::StorageError;

/// Result type for atom operations
pub type AtomResult<T> = Result<T, AtomError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtomError {
    #[error("atom '{key}' is not hydrated")]
    NotReady { key: String },

    #[error("failed to read '{key}': {source}")]
    Read { key: String, source: StorageError },

    #[error("failed to decode '{key}': {message}")]
    Decode { key: String, message: String },

    #[error("failed to migrate '{key}' to version {version}: {cause}")]
    Migration {
        key: String,
        version: u32,
        cause: String,
    },

    #[error("invalid value for '{key}': {source}")]
    Validation {
        key: String,
        source: ValidationError,
    },

    #[error("failed to encode '{key}': {message}")]
    Encode { key: String, message: String },

    #[error("failed to write '{key}': {source}")]
    Write { key: String, source: StorageError },

    #[error("failed to back up '{location}': {source}")]
    Backup {
        location: String,
        source: StorageError,
    },

    #[error("fallback for '{key}' failed: {message}")]
    Fallback { key: String, message: String },
}

impl AtomError {
    pub(crate) fn from_codec(key: &str, err: CodecError) -> Self {
        let key = key.to_string();
        match err {
            CodecError::Encode(message) => AtomError::Encode { key, message },
            CodecError::Decode(message) => AtomError::Decode { key, message },
            CodecError::Migration { version, cause } => AtomError::Migration {
                key,
                version,
                cause,
            },
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            AtomError::NotReady { .. } => "ATOM_NOT_READY",
            AtomError::Read { .. } => "ATOM_READ_FAILED",
            AtomError::Decode { .. } => "ATOM_DECODE_FAILED",
            AtomError::Migration { .. } => "ATOM_MIGRATION_FAILED",
            AtomError::Validation { .. } => "ATOM_VALIDATION_FAILED",
            AtomError::Encode { .. } => "ATOM_ENCODE_FAILED",
            AtomError::Write { .. } => "ATOM_WRITE_FAILED",
            AtomError::Backup { .. } => "ATOM_BACKUP_FAILED",
            AtomError::Fallback { .. } => "ATOM_FALLBACK_FAILED",
        }
    }

    /// True for hydration failures a fallback producer may recover from
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AtomError::Read { .. }
                | AtomError::Decode { .. }
                | AtomError::Migration { .. }
                | AtomError::Validation { .. }
        )
    }
}
