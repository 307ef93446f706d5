//! Storage adapter errors

use thiserror::Error;

/// Result type for storage adapter operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage adapters.
///
/// "No record under this key" is not an error: `get_item` returns `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Stored data is not valid text: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Backups are not supported by adapter '{0}'")]
    BackupUnsupported(String),

    /// Failure reported by a backend that does not map to a more specific variant
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::InvalidKey(_) => "ATOM_STORAGE_INVALID_KEY",
            StorageError::InvalidData(_) => "ATOM_STORAGE_INVALID_DATA",
            StorageError::Io(_) => "ATOM_STORAGE_IO_ERROR",
            StorageError::BackupUnsupported(_) => "ATOM_STORAGE_BACKUP_UNSUPPORTED",
            StorageError::Backend(_) => "ATOM_STORAGE_BACKEND_ERROR",
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
