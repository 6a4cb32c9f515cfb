//! Observable events
//!
//! Events are explicit and typed; the logged name is fixed per variant.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Configuration file read and validated
    ConfigLoaded,
    /// Schema files read from disk
    SchemasLoaded,
    /// Server bound and serving
    ServerStart,

    // Schema cache
    /// New fingerprint cached
    SchemaCacheInsert,
    /// Two schemas share a fingerprint (FATAL)
    SchemaCacheCollision,
    /// Peer schema refused; the cache keeps running
    SchemaCacheRefused,

    // Negotiation
    /// Writer schema fetched from a peer
    SchemaFetch,
    /// Writer schema could not be fetched
    SchemaFetchFailed,
    /// Local writer schema registered with a peer
    SchemaRegistered,
    /// Gateway attempt failed and will be retried
    GatewayRetry,
    /// Gateway call gave up
    GatewayCallFailed,

    // Server
    /// Binary request body refused
    AvroRequestRejected,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::ServerStart => "SERVER_START",
            Event::SchemaCacheInsert => "SCHEMA_CACHE_INSERT",
            Event::SchemaCacheCollision => "SCHEMA_CACHE_COLLISION",
            Event::SchemaCacheRefused => "SCHEMA_CACHE_REFUSED",
            Event::SchemaFetch => "SCHEMA_FETCH",
            Event::SchemaFetchFailed => "SCHEMA_FETCH_FAILED",
            Event::SchemaRegistered => "SCHEMA_REGISTERED",
            Event::GatewayRetry => "GATEWAY_RETRY",
            Event::GatewayCallFailed => "GATEWAY_CALL_FAILED",
            Event::AvroRequestRejected => "AVRO_REQUEST_REJECTED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::SchemaCacheCollision)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
