//! Error types for skyplan builders.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for builder operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Validation failures raised by the builders.
///
/// Each variant carries the message that callers surface to the end user
/// unmodified. Builders stop at the first failed check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A required string or collection was empty or absent.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A numeric field fell outside its legal bound.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// A field was present but not of the expected kind.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// A collection had the wrong size, or an exactly-one or uniqueness
    /// constraint over a collection was violated.
    #[error("cardinality violation: {0}")]
    CardinalityViolation(String),
}

/// Discriminant of [`BuildError`], for matching without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingField,
    InvalidRange,
    InvalidType,
    CardinalityViolation,
}

impl BuildError {
    pub fn missing(msg: impl Into<String>) -> Self {
        Self::MissingField(msg.into())
    }

    pub fn range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    pub fn invalid_type(msg: impl Into<String>) -> Self {
        Self::InvalidType(msg.into())
    }

    pub fn cardinality(msg: impl Into<String>) -> Self {
        Self::CardinalityViolation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::InvalidRange(_) => ErrorKind::InvalidRange,
            Self::InvalidType(_) => ErrorKind::InvalidType,
            Self::CardinalityViolation(_) => ErrorKind::CardinalityViolation,
        }
    }

    /// The bare message, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::MissingField(m)
            | Self::InvalidRange(m)
            | Self::InvalidType(m)
            | Self::CardinalityViolation(m) => m,
        }
    }
}

/// Fail with `MissingField` when `value` is empty or whitespace.
///
/// `what` is the full message, e.g. `"VMSS name is required"`.
pub fn require(value: &str, what: &str) -> BuildResult<()> {
    if value.trim().is_empty() {
        return Err(BuildError::missing(what));
    }
    Ok(())
}
