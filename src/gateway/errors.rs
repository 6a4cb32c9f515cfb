//! Gateway errors
//!
//! Error codes:
//! - AVRO_UNRESOLVABLE_SCHEMA (REJECT, never retried)
//! - AVRO_TRANSPORT_ERROR (REJECT, retried)
//! - AVRO_TIMEOUT (REJECT, retried)
//! - AVRO_REMOTE_ERROR (REJECT, retried on 5xx only)
//! - AVRO_UNEXPECTED_CONTENT_TYPE (REJECT)
//! - AVRO_INVALID_CONFIG (REJECT)
//!
//! Schema, codec and cache errors pass through with their own codes.

use thiserror::Error;

use crate::codec::CodecError;
use crate::fingerprint::{CacheError, Fingerprint};
use crate::schema::{SchemaError, Severity};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The peer could not supply the writer schema for a fingerprint
    #[error("unresolvable schema {fingerprint}: {reason}")]
    UnresolvableSchema { fingerprint: Fingerprint, reason: String },

    #[error("transport error calling {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("call to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// Non-success status from the peer
    #[error("remote error {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("unexpected content type '{content_type}'")]
    UnexpectedContentType { content_type: String },

    #[error("invalid gateway configuration: {0}")]
    InvalidConfig(String),
}

impl GatewayError {
    pub fn transport(url: &str, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unresolvable(fingerprint: Fingerprint, reason: impl Into<String>) -> Self {
        Self::UnresolvableSchema {
            fingerprint,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Schema(e) => e.code(),
            GatewayError::Codec(e) => e.code(),
            GatewayError::Cache(e) => e.code(),
            GatewayError::UnresolvableSchema { .. } => "AVRO_UNRESOLVABLE_SCHEMA",
            GatewayError::Transport { .. } => "AVRO_TRANSPORT_ERROR",
            GatewayError::Timeout { .. } => "AVRO_TIMEOUT",
            GatewayError::Remote { .. } => "AVRO_REMOTE_ERROR",
            GatewayError::UnexpectedContentType { .. } => "AVRO_UNEXPECTED_CONTENT_TYPE",
            GatewayError::InvalidConfig(_) => "AVRO_INVALID_CONFIG",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            GatewayError::Cache(e) => e.severity(),
            GatewayError::Schema(e) => e.severity(),
            _ => Severity::Reject,
        }
    }

    /// Whether another attempt of the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport { .. } | GatewayError::Timeout { .. } => true,
            GatewayError::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(GatewayError::transport("http://x", "refused").is_retryable());
        assert!(GatewayError::Timeout { url: "http://x".into(), timeout_ms: 10 }.is_retryable());
        assert!(GatewayError::Remote { status: 503, message: String::new() }.is_retryable());
        assert!(!GatewayError::Remote { status: 400, message: String::new() }.is_retryable());
        assert!(!GatewayError::unresolvable(Fingerprint::from_u64(1), "unknown").is_retryable());
        assert!(!GatewayError::from(CodecError::decode("x", "truncated")).is_retryable());
    }

    #[test]
    fn test_codes_pass_through() {
        let err = GatewayError::from(CodecError::decode("x", "truncated"));
        assert_eq!(err.code(), "AVRO_DECODE_ERROR");
        assert_eq!(GatewayError::from(CacheError::Halted).severity(), Severity::Fatal);
        assert_eq!(
            GatewayError::unresolvable(Fingerprint::from_u64(1), "unknown").code(),
            "AVRO_UNRESOLVABLE_SCHEMA"
        );
    }
}
