//! Validation error types

use std::fmt;

use thiserror::Error;

/// Where a value failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g., "theme.colors[2]"); `$root` for the whole value
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// A value was rejected by a validator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {message}")]
pub struct ValidationError {
    message: String,
    details: Option<ValidationDetails>,
}

impl ValidationError {
    /// Rejection with a field-level explanation
    pub fn field(details: ValidationDetails) -> Self {
        Self {
            message: details.to_string(),
            details: Some(details),
        }
    }

    /// Rejection from a custom rule
    pub fn custom(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// The value could not be turned into the target type
    pub fn deserialize(err: serde_json::Error) -> Self {
        Self::custom(format!("value does not match target type: {}", err))
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        "ATOM_VALIDATION_FAILED"
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&ValidationDetails> {
        self.details.as_ref()
    }
}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_display() {
        let details = ValidationDetails::type_mismatch("volume", "float", "string");
        let display = details.to_string();
        assert!(display.contains("volume"));
        assert!(display.contains("float"));
        assert!(display.contains("string"));
    }

    #[test]
    fn test_field_error_keeps_details() {
        let err = ValidationError::field(ValidationDetails::missing_field("theme"));
        assert_eq!(err.details().unwrap().field, "theme");
        assert!(err.to_string().contains("theme"));
        assert_eq!(err.code(), "ATOM_VALIDATION_FAILED");
    }

    #[test]
    fn test_custom_error_has_no_details() {
        let err = ValidationError::custom("volume out of range");
        assert!(err.details().is_none());
        assert_eq!(err.message(), "volume out of range");
    }
}
