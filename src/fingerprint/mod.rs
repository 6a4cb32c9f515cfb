//! Fingerprinting and the schema cache
//!
//! A fingerprint identifies a schema by the Rabin hash of its canonical
//! text. The cache maps fingerprints back to schemas so a peer's payload
//! can be decoded once its writer schema is known.
//!
//! # Invariants
//!
//! - `Fingerprint::of` is a pure function of canonical text
//! - Cached entries are never replaced or evicted
//! - A fingerprint collision halts the cache

mod cache;
mod errors;
mod rabin;

pub use cache::SchemaCache;
pub use errors::{CacheError, CacheResult, FingerprintError};
pub use rabin::{Fingerprint, EMPTY};
