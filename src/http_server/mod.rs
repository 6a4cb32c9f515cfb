//! # HTTP Server Module
//!
//! Server side of the negotiation protocol.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/schemas/:fingerprint`, `POST /schemas` - Schema exchange
//! - `/operations/:operation/schema` - Schemas of one operation
//! - operation routes added with [`avro_route`]
//! - `/observability/*` - Health and metrics

mod avro_route;
pub mod config;
mod errors;
mod exchange;
mod exchange_routes;
mod observability_routes;
pub mod server;

pub use avro_route::{avro_route, avro_value_route};
pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use exchange::{KnownSchema, OperationSchemas, SchemaDocument, SchemaExchange};
pub use exchange_routes::exchange_routes;
pub use observability_routes::{health_routes, observability_routes};
pub use server::HttpServer;
