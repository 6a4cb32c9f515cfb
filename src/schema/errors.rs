//! Schema error types
//!
//! Error codes:
//! - AVRO_UNSUPPORTED_TYPE (REJECT)
//! - AVRO_INVALID_NAME (REJECT)
//! - AVRO_INVALID_SCHEMA (REJECT)
//!
//! All schema errors are raised at derivation or parse time, before any
//! value is encoded. None of them are retryable: the type definition or
//! schema text has to be fixed by the caller.

use std::fmt;

use thiserror::Error;

/// Severity levels shared by every error family in this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call fails, the process continues
    Reject,
    /// Integrity fault, further use of the affected component must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Errors raised while deriving, validating or parsing a schema
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A declared field type has no mapping rule
    #[error("unsupported type at '{path}': {reason}")]
    UnsupportedType { path: String, reason: String },

    /// Name does not match `[A-Za-z_][A-Za-z0-9_]*`
    #[error("invalid name '{name}': names must start with [A-Za-z_] and subsequently contain only [A-Za-z0-9_]")]
    InvalidName { name: String },

    /// Namespace is malformed or does not extend the enclosing one
    #[error("invalid namespace '{namespace}': {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    /// Two fields of one record share a name
    #[error("duplicate field '{field}' in record '{record}'")]
    DuplicateField { record: String, field: String },

    /// Two union branches are structurally identical
    #[error("duplicate union branch {branch} at '{path}'")]
    DuplicateBranch { path: String, branch: String },

    /// Two enum symbols are identical
    #[error("duplicate symbol '{symbol}' in enum '{name}'")]
    DuplicateSymbol { name: String, symbol: String },

    /// One full name is bound to two different definitions
    #[error("conflicting definitions for named type '{name}'")]
    ConflictingDefinition { name: String },

    /// A field default does not conform to the field schema
    #[error("invalid default for field '{field}': {reason}")]
    InvalidDefault { field: String, reason: String },

    /// Schema text could not be interpreted
    #[error("malformed schema: {0}")]
    Parse(String),

    /// A schema file could not be read or written
    #[error("schema file '{path}': {reason}")]
    Load { path: String, reason: String },
}

impl SchemaError {
    pub fn unsupported(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse(reason.into())
    }

    pub fn load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::UnsupportedType { .. } => "AVRO_UNSUPPORTED_TYPE",
            SchemaError::InvalidName { .. } | SchemaError::InvalidNamespace { .. } => {
                "AVRO_INVALID_NAME"
            }
            _ => "AVRO_INVALID_SCHEMA",
        }
    }

    /// Schema errors never halt the process
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SchemaError::unsupported("A", "no mapping").code(),
            "AVRO_UNSUPPORTED_TYPE"
        );
        assert_eq!(
            SchemaError::InvalidName { name: "1a".into() }.code(),
            "AVRO_INVALID_NAME"
        );
        assert_eq!(SchemaError::parse("eof").code(), "AVRO_INVALID_SCHEMA");
    }

    #[test]
    fn test_unsupported_display_names_path() {
        let err = SchemaError::unsupported("Model.A", "maps must have string keys");
        let display = err.to_string();
        assert!(display.contains("Model.A"));
        assert!(display.contains("string keys"));
        assert_eq!(err.severity(), Severity::Reject);
    }
}
