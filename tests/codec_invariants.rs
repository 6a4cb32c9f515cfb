//! Codec Invariant Tests
//!
//! - Values survive encode then decode under the same schema
//! - Optional fields always use branch 0 for null and branch 1 for a value
//! - Single-object framing produces the documented byte layout
//! - Malformed input fails with a decode error

use std::collections::BTreeMap;

use avrogate::codec::{decode, encode, AvroRecord, CodecError, CodecResult, Decimal, RecordFields, Value};
use avrogate::envelope::{decode_message, encode_message, WireEnvelope, HEADER_LEN, MARKER};
use avrogate::fingerprint::Fingerprint;
use avrogate::schema::{derive_schema, parse_schema, EnumDef, FieldDef, RecordDef, SchemaNode, TypeDef};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

// =============================================================================
// Helper Functions
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Request {
    a: String,
    b: i64,
    c: DateTime<Utc>,
}

impl AvroRecord for Request {
    fn record_def() -> RecordDef {
        RecordDef::new(
            "Request",
            vec![
                FieldDef::required("A", TypeDef::Text),
                FieldDef::required("B", TypeDef::integer(64)),
                FieldDef::required("C", TypeDef::Timestamp),
            ],
        )
    }

    fn to_value(&self) -> Value {
        Value::record([
            ("A", Value::from(self.a.clone())),
            ("B", Value::from(self.b)),
            ("C", Value::from(self.c)),
        ])
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut fields = RecordFields::new(value, "Request")?;
        Ok(Self {
            a: fields.take("A")?,
            b: fields.take("B")?,
            c: fields.take("C")?,
        })
    }
}

fn known_instant() -> DateTime<Utc> {
    DateTime::from_timestamp_micros(1_000_000).unwrap()
}

fn everything_schema() -> SchemaNode {
    derive_schema(&RecordDef::new(
        "Everything",
        vec![
            FieldDef::required("flag", TypeDef::Boolean),
            FieldDef::required("small", TypeDef::integer(32)),
            FieldDef::required("big", TypeDef::integer(64)),
            FieldDef::required("ratio", TypeDef::Float64),
            FieldDef::required("name", TypeDef::Text),
            FieldDef::required("raw", TypeDef::Bytes),
            FieldDef::required("tag", TypeDef::FixedBytes(4)),
            FieldDef::required("color", TypeDef::Enum(EnumDef::new("Color", ["RED", "GREEN", "BLUE"]))),
            FieldDef::required("items", TypeDef::sequence(TypeDef::Text)),
            FieldDef::required("counts", TypeDef::mapping(TypeDef::Text, TypeDef::integer(64))),
            FieldDef::optional("note", TypeDef::Text),
            FieldDef::required("day", TypeDef::Date),
            FieldDef::required("at", TypeDef::Time),
            FieldDef::required("when", TypeDef::Timestamp),
            FieldDef::required("id", TypeDef::Uuid),
            FieldDef::required("price", TypeDef::decimal(10, 2)),
        ],
    ))
    .unwrap()
}

fn everything_value(note: Option<&str>) -> Value {
    let mut counts = BTreeMap::new();
    counts.insert("x".to_string(), Value::Long(-3));
    counts.insert("y".to_string(), Value::Long(1 << 40));

    Value::record([
        ("flag", Value::Boolean(true)),
        ("small", Value::Int(-42)),
        ("big", Value::Long(i64::MAX)),
        ("ratio", Value::Double(0.25)),
        ("name", Value::from("héllo")),
        ("raw", Value::Bytes(vec![0, 1, 2, 255])),
        ("tag", Value::Fixed(vec![9, 8, 7, 6])),
        ("color", Value::Enum("BLUE".to_string())),
        ("items", Value::Array(vec![Value::from("a"), Value::from("")])),
        ("counts", Value::Map(counts)),
        ("note", note.map(Value::from).unwrap_or(Value::Null)),
        ("day", Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())),
        ("at", Value::TimeMicros(NaiveTime::from_hms_micro_opt(23, 59, 58, 123_456).unwrap())),
        ("when", Value::TimestampMicros(known_instant())),
        ("id", Value::Uuid(Uuid::new_v4())),
        ("price", Value::Decimal(Decimal::new(-12_345, 2))),
    ])
}

// =============================================================================
// Round-trip Tests
// =============================================================================

/// A value covering every mapped type decodes back to itself.
#[test]
fn test_roundtrip_every_type() {
    let schema = everything_schema();
    for note in [None, Some("present")] {
        let value = everything_value(note);
        let bytes = encode(&value, &schema).unwrap();
        let (decoded, consumed) = decode(&bytes, &schema).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, bytes.len());
    }
}

/// Encoding is deterministic for the same value and schema.
#[test]
fn test_encoding_is_deterministic() {
    let schema = everything_schema();
    let value = everything_value(Some("n"));
    let first = encode(&value, &schema).unwrap();
    for _ in 0..50 {
        assert_eq!(encode(&value, &schema).unwrap(), first);
    }
}

/// Typed records travel through `Value` without loss.
#[test]
fn test_typed_record_roundtrip() {
    let request = Request {
        a: "ayy".into(),
        b: 1337,
        c: known_instant(),
    };
    let schema = Request::schema().unwrap();
    let bytes = encode_message(&request.to_value(), &schema).unwrap();
    let decoded = decode_message(&bytes, &schema, &schema).unwrap();
    assert_eq!(Request::from_value(decoded).unwrap(), request);
}

// =============================================================================
// Optional-field Convention Tests
// =============================================================================

/// Null selects branch 0, any present value selects branch 1.
#[test]
fn test_optional_branch_positions() {
    let schema = derive_schema(&RecordDef::new(
        "Maybe",
        vec![FieldDef::optional("v", TypeDef::integer(64))],
    ))
    .unwrap();

    assert_eq!(encode(&Value::record([("v", Value::Null)]), &schema).unwrap(), vec![0x00]);
    assert_eq!(encode(&Value::record([("v", Value::Long(5))]), &schema).unwrap(), vec![0x02, 0x0a]);
    assert_eq!(encode(&Value::record([("v", Value::Long(0))]), &schema).unwrap(), vec![0x02, 0x00]);
}

/// An empty string is still a present value.
#[test]
fn test_optional_empty_string_is_present() {
    let schema = derive_schema(&RecordDef::new(
        "Maybe",
        vec![FieldDef::optional("v", TypeDef::Text)],
    ))
    .unwrap();

    assert_eq!(encode(&Value::record([("v", Value::from(""))]), &schema).unwrap(), vec![0x02, 0x00]);
}

// =============================================================================
// Envelope Layout Tests
// =============================================================================

/// The documented request encodes to marker, fingerprint, then payload.
#[test]
fn test_end_to_end_envelope_bytes() {
    let schema = Request::schema().unwrap();
    let request = Request {
        a: "ayy".into(),
        b: 1337,
        c: known_instant(),
    };
    let bytes = encode_message(&request.to_value(), &schema).unwrap();

    let mut expected = MARKER.to_vec();
    expected.extend_from_slice(Fingerprint::of(&schema).as_bytes());
    expected.extend_from_slice(&[0x06, b'a', b'y', b'y', 0xf2, 0x14, 0x80, 0x89, 0x7a]);
    assert_eq!(bytes, expected);
    assert_eq!(HEADER_LEN, 10);

    let envelope = WireEnvelope::parse(&bytes).unwrap();
    assert_eq!(envelope.fingerprint, Fingerprint::of(&schema));
    assert_eq!(envelope.payload, &bytes[HEADER_LEN..]);
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

/// A wrong marker fails before any payload is read.
#[test]
fn test_wrong_marker_is_decode_error() {
    let schema = Request::schema().unwrap();
    let request = Request {
        a: "x".into(),
        b: 1,
        c: known_instant(),
    };
    let mut bytes = encode_message(&request.to_value(), &schema).unwrap();
    bytes[0] = 0xC2;

    let err = decode_message(&bytes, &schema, &schema).unwrap_err();
    assert!(matches!(err, CodecError::Decode { .. }));
}

/// A header shorter than ten bytes is rejected.
#[test]
fn test_truncated_header_is_decode_error() {
    let err = WireEnvelope::parse(&[0xC3, 0x01, 0x00]).unwrap_err();
    assert!(matches!(err, CodecError::Decode { .. }));
}

/// A union index beyond the writer's branches is rejected.
#[test]
fn test_union_index_out_of_range() {
    let writer = parse_schema(r#"["null", "string"]"#).unwrap();
    let err = decode(&[0x04], &writer).unwrap_err();
    assert!(matches!(err, CodecError::Decode { .. }));
}

/// A payload cut short inside a string fails instead of returning a partial value.
#[test]
fn test_truncated_payload_is_decode_error() {
    let schema = Request::schema().unwrap();
    let err = decode(&[0x06, b'a'], &schema).unwrap_err();
    assert!(matches!(err, CodecError::Decode { .. }));
}

/// Bytes left over after the value are an error for a whole message.
#[test]
fn test_trailing_bytes_rejected() {
    let schema = parse_schema(r#""long""#).unwrap();
    let mut bytes = encode_message(&Value::Long(1), &schema).unwrap();
    bytes.push(0x00);
    assert!(decode_message(&bytes, &schema, &schema).is_err());
}

/// A value that does not match its schema is refused at encode time.
#[test]
fn test_encode_schema_mismatch() {
    let schema = Request::schema().unwrap();
    let value = Value::record([("A", Value::Long(1)), ("B", Value::Long(1)), ("C", Value::Long(1))]);
    let err = encode(&value, &schema).unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }));
}
