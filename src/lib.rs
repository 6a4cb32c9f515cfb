//! avrogate - schema-negotiated Avro single-object encoding over HTTP
//!
//! - `schema`: schema model, parsing, canonical form and derivation from types
//! - `codec`: binary and JSON encoding with schema resolution
//! - `fingerprint`: CRC-64-AVRO fingerprints and the schema cache
//! - `envelope`: single-object framing and content negotiation
//! - `gateway`: client side of the negotiation
//! - `http_server`: server side of the negotiation

pub mod cli;
pub mod codec;
pub mod envelope;
pub mod fingerprint;
pub mod gateway;
pub mod http_server;
pub mod observability;
pub mod schema;
