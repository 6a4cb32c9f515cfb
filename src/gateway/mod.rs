//! Client side of the negotiation protocol
//!
//! A [`Gateway`] calls one operation with a typed request and response.
//! Requests go out as single-object frames; responses are decoded with the
//! writer schema named by their fingerprint, fetched from the peer when the
//! shared [`SchemaCache`](crate::fingerprint::SchemaCache) does not have it.
//!
//! Suspension points are the network waits only. Dropping a call future
//! abandons any pending schema fetch; cached entries are unaffected.

mod client;
mod config;
mod errors;
mod transport;

pub use client::{CallState, CallTrace, Gateway};
pub use config::GatewayConfig;
pub use errors::{GatewayError, GatewayResult};
pub use transport::{HttpMethod, HttpTransport, Transport, TransportRequest, TransportResponse};
