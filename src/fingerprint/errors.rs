//! Fingerprint and schema cache errors
//!
//! Error codes:
//! - AVRO_INVALID_FINGERPRINT (REJECT)
//! - AVRO_FINGERPRINT_MISMATCH (REJECT)
//! - AVRO_FINGERPRINT_COLLISION (FATAL, or REJECT for a peer's schema)
//! - AVRO_CACHE_HALTED (FATAL)
//!
//! A collision means two structurally different schemas share one
//! fingerprint. Between schemas this process derived or fetched, the cache
//! halts on the first one and refuses every later lookup and insert. A
//! schema posted by a peer that collides is refused on its own.

use thiserror::Error;

use super::rabin::Fingerprint;
use crate::schema::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    #[error("invalid fingerprint '{text}': expected 16 hex characters")]
    InvalidHex { text: String },
}

impl FingerprintError {
    pub fn code(&self) -> &'static str {
        "AVRO_INVALID_FINGERPRINT"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Insert under a fingerprint the schema does not hash to
    #[error("fingerprint mismatch: schema hashes to {actual}, inserted as {claimed}")]
    FingerprintMismatch { claimed: Fingerprint, actual: Fingerprint },

    /// Two different schemas share a fingerprint
    #[error("fingerprint collision on {fingerprint}: {existing} vs {incoming}")]
    FingerprintCollision {
        fingerprint: Fingerprint,
        existing: String,
        incoming: String,
    },

    /// A peer's schema collides with a cached one; only that schema is refused
    #[error("fingerprint collision on {fingerprint}: peer schema {incoming} refused, {existing} already cached")]
    PeerCollision {
        fingerprint: Fingerprint,
        existing: String,
        incoming: String,
    },

    /// The cache stopped after a collision
    #[error("schema cache halted after a fingerprint collision")]
    Halted,
}

impl CacheError {
    pub fn code(&self) -> &'static str {
        match self {
            CacheError::FingerprintMismatch { .. } => "AVRO_FINGERPRINT_MISMATCH",
            CacheError::FingerprintCollision { .. } | CacheError::PeerCollision { .. } => "AVRO_FINGERPRINT_COLLISION",
            CacheError::Halted => "AVRO_CACHE_HALTED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CacheError::FingerprintMismatch { .. } | CacheError::PeerCollision { .. } => Severity::Reject,
            CacheError::FingerprintCollision { .. } | CacheError::Halted => Severity::Fatal,
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
