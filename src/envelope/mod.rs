//! Single-object wire framing
//!
//! ```text
//! [0..2)   marker 0xC3 0x01
//! [2..10)  fingerprint of the writer schema, little-endian
//! [10..)   binary payload, no length prefix
//! ```
//!
//! The payload is consumed exactly as the writer schema dictates. Bytes
//! left over after decoding are an error.

use crate::codec::{decode_with_reader, encode_into, CodecError, CodecResult, Value};
use crate::fingerprint::Fingerprint;
use crate::schema::SchemaNode;

/// Two-byte marker of single-object encoding
pub const MARKER: [u8; 2] = [0xC3, 0x01];

/// Marker plus fingerprint
pub const HEADER_LEN: usize = 10;

/// Content type of framed binary bodies
pub const AVRO_BINARY: &str = "avro/binary";

/// Content type of plain textual bodies
pub const APPLICATION_JSON: &str = "application/json";

/// `accept` value sent by the gateway
pub const ACCEPT_HEADER_VALUE: &str = "avro/binary, application/json";

/// Response header pointing at the writer schema of the body
pub const SCHEMA_LOCATION_HEADER: &str = "avro-schema-location";

const PATH: &str = "envelope";

/// A parsed frame borrowing its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEnvelope<'a> {
    pub fingerprint: Fingerprint,
    pub payload: &'a [u8],
}

impl<'a> WireEnvelope<'a> {
    /// Split a frame into fingerprint and payload
    pub fn parse(bytes: &'a [u8]) -> CodecResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::decode(
                PATH,
                format!("frame of {} bytes is shorter than the {} byte header", bytes.len(), HEADER_LEN),
            ));
        }
        if bytes[..2] != MARKER {
            return Err(CodecError::decode(
                PATH,
                format!("bad marker {:02x} {:02x}", bytes[0], bytes[1]),
            ));
        }
        let mut fp = [0u8; 8];
        fp.copy_from_slice(&bytes[2..HEADER_LEN]);
        Ok(Self {
            fingerprint: Fingerprint::from_bytes(fp),
            payload: &bytes[HEADER_LEN..],
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        frame(self.fingerprint, self.payload)
    }
}

/// Whether `bytes` start with the single-object marker
pub fn is_framed(bytes: &[u8]) -> bool {
    bytes.starts_with(&MARKER)
}

/// Frame an already encoded payload
pub fn frame(fingerprint: Fingerprint, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&MARKER);
    out.extend_from_slice(fingerprint.as_bytes());
    out.extend_from_slice(payload);
    out
}

/// Encode `value` and frame it with the fingerprint of `schema`
pub fn encode_message(value: &Value, schema: &SchemaNode) -> CodecResult<Vec<u8>> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&MARKER);
    out.extend_from_slice(Fingerprint::of(schema).as_bytes());
    encode_into(&mut out, value, schema)?;
    Ok(out)
}

/// Decode a whole frame written with `writer` into the shape of `reader`.
///
/// The frame's fingerprint must be the writer's, and the payload must be
/// consumed exactly.
pub fn decode_message(bytes: &[u8], writer: &SchemaNode, reader: &SchemaNode) -> CodecResult<Value> {
    let envelope = WireEnvelope::parse(bytes)?;
    let expected = Fingerprint::of(writer);
    if envelope.fingerprint != expected {
        return Err(CodecError::decode(
            PATH,
            format!(
                "frame fingerprint {} does not match writer schema {}",
                envelope.fingerprint, expected
            ),
        ));
    }
    decode_payload(envelope.payload, writer, reader)
}

/// Decode an unframed payload, requiring every byte to be consumed
pub fn decode_payload(payload: &[u8], writer: &SchemaNode, reader: &SchemaNode) -> CodecResult<Value> {
    let (value, consumed) = decode_with_reader(payload, writer, reader)?;
    if consumed != payload.len() {
        return Err(CodecError::decode(
            PATH,
            format!("{} trailing bytes after payload", payload.len() - consumed),
        ));
    }
    Ok(value)
}

/// Body format named by a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    AvroBinary,
    Json,
}

impl ContentKind {
    /// Classify a `content-type` value, ignoring parameters and case
    pub fn from_content_type(value: &str) -> Option<Self> {
        match media_type(value).as_str() {
            AVRO_BINARY => Some(ContentKind::AvroBinary),
            APPLICATION_JSON => Some(ContentKind::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::AvroBinary => AVRO_BINARY,
            ContentKind::Json => APPLICATION_JSON,
        }
    }
}

/// Whether an `accept` header admits framed binary bodies
pub fn accepts_avro(accept: &str) -> bool {
    accept.split(',').any(|item| media_type(item) == AVRO_BINARY)
}

fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::schema::{FieldNode, Name, RecordSchema};

    fn request_schema() -> SchemaNode {
        SchemaNode::Record(RecordSchema {
            name: Name::new("Request"),
            doc: None,
            aliases: Vec::new(),
            fields: vec![
                FieldNode::new("A", SchemaNode::String),
                FieldNode::new("B", SchemaNode::Long),
                FieldNode::new("C", SchemaNode::timestamp_micros()),
            ],
        })
    }

    fn request_value() -> Value {
        Value::record([
            ("A", Value::String("ayy".into())),
            ("B", Value::Long(1337)),
            ("C", Value::TimestampMicros(DateTime::from_timestamp_micros(1_000_000).unwrap())),
        ])
    }

    #[test]
    fn test_message_layout() {
        let schema = request_schema();
        let bytes = encode_message(&request_value(), &schema).unwrap();
        assert_eq!(&bytes[..2], &MARKER);
        assert_eq!(&bytes[2..10], Fingerprint::of(&schema).as_bytes());
        assert_eq!(&bytes[10..], &[0x06, b'a', b'y', b'y', 0xf2, 0x14, 0x80, 0x89, 0x7a]);
    }

    #[test]
    fn test_message_roundtrip() {
        let schema = request_schema();
        let bytes = encode_message(&request_value(), &schema).unwrap();
        assert_eq!(decode_message(&bytes, &schema, &schema).unwrap(), request_value());
    }

    #[test]
    fn test_parse_rejects_short_and_bad_marker() {
        assert!(matches!(WireEnvelope::parse(&[0xC3, 0x01, 0]), Err(CodecError::Decode { .. })));
        let mut bytes = frame(Fingerprint::from_u64(7), &[1, 2]);
        bytes[0] = 0x00;
        assert!(matches!(WireEnvelope::parse(&bytes), Err(CodecError::Decode { .. })));
    }

    #[test]
    fn test_parse_splits_payload() {
        let bytes = frame(Fingerprint::from_u64(7), &[1, 2, 3]);
        let envelope = WireEnvelope::parse(&bytes).unwrap();
        assert_eq!(envelope.fingerprint, Fingerprint::from_u64(7));
        assert_eq!(envelope.payload, &[1, 2, 3]);
        assert_eq!(envelope.to_bytes(), bytes);
    }

    #[test]
    fn test_wrong_fingerprint_rejected() {
        let schema = request_schema();
        let mut bytes = encode_message(&request_value(), &schema).unwrap();
        bytes[2] ^= 0xff;
        assert!(matches!(decode_message(&bytes, &schema, &schema), Err(CodecError::Decode { .. })));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let schema = request_schema();
        let mut bytes = encode_message(&request_value(), &schema).unwrap();
        bytes.push(0);
        let err = decode_message(&bytes, &schema, &schema).unwrap_err();
        assert_eq!(err.code(), "AVRO_DECODE_ERROR");
    }

    #[test]
    fn test_content_kind() {
        assert_eq!(ContentKind::from_content_type("avro/binary"), Some(ContentKind::AvroBinary));
        assert_eq!(
            ContentKind::from_content_type("Application/JSON; charset=utf-8"),
            Some(ContentKind::Json)
        );
        assert_eq!(ContentKind::from_content_type("text/plain"), None);
    }

    #[test]
    fn test_accepts_avro() {
        assert!(accepts_avro(ACCEPT_HEADER_VALUE));
        assert!(accepts_avro("application/json, avro/binary;q=0.5"));
        assert!(!accepts_avro("application/json"));
    }
}
