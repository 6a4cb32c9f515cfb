//! Binary codec
//!
//! Encodes values to the compact binary form and decodes them back,
//! resolving a writer schema against a reader schema. Everything here is
//! pure and CPU-only; no I/O, no logging.
//!
//! Modules:
//! - `value`: in-memory record values
//! - `binary`: varints and primitive encodings
//! - `encoder` / `decoder`: schema-driven traversal
//! - `json`: schema-directed JSON bridge
//! - `record`: typed `AvroRecord` surface

pub mod binary;
mod decoder;
mod encoder;
mod errors;
pub mod json;
mod record;
mod value;

pub use decoder::{check_resolution, decode, decode_with_reader, MAX_ZERO_WIDTH_ITEMS};
pub use encoder::{encode, encode_into};
pub use errors::{CodecError, CodecResult};
pub use json::{from_json, to_json, JsonStyle};
pub use record::{AvroRecord, FromValue, Null, RecordFields};
pub use value::{Decimal, NotBytes, Value};
