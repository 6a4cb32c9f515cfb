//! Codec error types
//!
//! Error codes:
//! - AVRO_SCHEMA_MISMATCH (REJECT)
//! - AVRO_DECODE_ERROR (REJECT)
//! - AVRO_INCOMPATIBLE_UNION (REJECT)
//! - AVRO_MISSING_DEFAULT (REJECT)
//! - AVRO_INCOMPATIBLE_SCHEMA (REJECT)
//!
//! Every variant carries the path of the offending field (`Request.items[2].A`)
//! so schema drift between client and server can be located.

use thiserror::Error;

use crate::schema::Severity;

/// Errors raised while encoding or decoding values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Value does not conform to the schema it is encoded with
    #[error("schema mismatch at '{path}': expected {expected}, found {found}")]
    SchemaMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Input is truncated or malformed
    #[error("decode error at '{path}': {reason}")]
    Decode { path: String, reason: String },

    /// No reader branch accepts the writer's selected branch
    #[error("incompatible union at '{path}': no reader branch accepts writer branch {writer_branch}")]
    IncompatibleUnion { path: String, writer_branch: String },

    /// Reader field absent from the writer has no default
    #[error("missing default at '{path}': field '{field}' is absent from the writer schema and has no default")]
    MissingDefault { path: String, field: String },

    /// Writer and reader schemas cannot be resolved against each other
    #[error("incompatible schema at '{path}': writer {writer} cannot be read as {reader}")]
    IncompatibleSchema {
        path: String,
        writer: String,
        reader: String,
    },
}

impl CodecError {
    pub fn mismatch(path: &str, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.to_string(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn decode(path: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn incompatible(path: &str, writer: impl Into<String>, reader: impl Into<String>) -> Self {
        Self::IncompatibleSchema {
            path: path.to_string(),
            writer: writer.into(),
            reader: reader.into(),
        }
    }

    /// Path of the field the error occurred at
    pub fn path(&self) -> &str {
        match self {
            CodecError::SchemaMismatch { path, .. }
            | CodecError::Decode { path, .. }
            | CodecError::IncompatibleUnion { path, .. }
            | CodecError::MissingDefault { path, .. }
            | CodecError::IncompatibleSchema { path, .. } => path,
        }
    }

    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::SchemaMismatch { .. } => "AVRO_SCHEMA_MISMATCH",
            CodecError::Decode { .. } => "AVRO_DECODE_ERROR",
            CodecError::IncompatibleUnion { .. } => "AVRO_INCOMPATIBLE_UNION",
            CodecError::MissingDefault { .. } => "AVRO_MISSING_DEFAULT",
            CodecError::IncompatibleSchema { .. } => "AVRO_INCOMPATIBLE_SCHEMA",
        }
    }

    /// Codec errors fail the call only
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Append a field name to a path
pub(crate) fn make_path(base: &str, field: &str) -> String {
    if base.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", base, field)
    }
}

/// Append an element index or map key to a path
pub(crate) fn index_path(base: &str, index: impl std::fmt::Display) -> String {
    format!("{}[{}]", base, index)
}
