//! Schema subsystem
//!
//! Schemas are immutable trees derived ahead of time from record type
//! definitions, or parsed from schema text received from a peer.
//!
//! # Design Principles
//!
//! - Derivation is explicit; no runtime introspection
//! - Field order and union branch order are part of a schema's identity
//! - Optional fields are always `[null, T]`
//! - Canonical text strips everything that does not affect the encoding

mod canonical;
mod errors;
mod loader;
mod mapper;
mod parser;
mod types;

pub use canonical::canonical_form;
pub use errors::{SchemaError, SchemaResult, Severity};
pub use loader::SchemaLoader;
pub use mapper::{derive_schema, validate_name, validate_namespace, EnumDef, FieldDef, RecordDef, TypeDef};
pub use parser::{parse_schema, parse_schema_json};
pub use types::{EnumSchema, FieldNode, FixedSchema, LogicalType, Name, RecordSchema, SchemaNode};
