//! Codec error types

use thiserror::Error;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding a persisted record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The value could not be serialized
    #[error("encode failed: {0}")]
    Encode(String),

    /// The stored text is not parseable
    #[error("decode failed: {0}")]
    Decode(String),

    /// A migration step failed
    #[error("migration to version {version} failed: {cause}")]
    Migration { version: u32, cause: String },
}

impl CodecError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::Encode(_) => "ATOM_ENCODE_FAILED",
            CodecError::Decode(_) => "ATOM_DECODE_FAILED",
            CodecError::Migration { .. } => "ATOM_MIGRATION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_names_version() {
        let err = CodecError::Migration {
            version: 3,
            cause: "missing field".into(),
        };
        assert!(err.to_string().contains("version 3"));
        assert!(err.to_string().contains("missing field"));
        assert_eq!(err.code(), "ATOM_MIGRATION_FAILED");
    }
}
