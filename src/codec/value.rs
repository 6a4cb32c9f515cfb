//! In-memory record values
//!
//! A [`Value`] is the schema-agnostic form every record type converts to
//! and from. Optional fields hold either [`Value::Null`] or the inner value
//! directly; union branch indices never appear in values, they are chosen
//! by the encoder from the schema.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// Fixed-point decimal: `unscaled * 10^-scale`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    pub unscaled: i128,
    pub scale: u32,
}

impl Decimal {
    pub fn new(unscaled: i128, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    /// Number of significant decimal digits in the unscaled value
    pub fn digits(&self) -> u32 {
        let mut n = self.unscaled.unsigned_abs();
        let mut digits = 1;
        while n >= 10 {
            n /= 10;
            digits += 1;
        }
        digits
    }

    /// Minimal big-endian two's complement form of the unscaled value
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let bytes = self.unscaled.to_be_bytes();
        let negative = self.unscaled < 0;
        let fill = if negative { 0xff } else { 0x00 };
        let mut start = 0;
        // drop redundant sign bytes while keeping the sign bit intact
        while start < bytes.len() - 1
            && bytes[start] == fill
            && ((bytes[start + 1] & 0x80 != 0) == negative)
        {
            start += 1;
        }
        bytes[start..].to_vec()
    }

    /// Parse a big-endian two's complement unscaled value
    pub fn from_be_bytes(bytes: &[u8], scale: u32) -> Option<Self> {
        if bytes.len() > 16 {
            // wider encodings are fine as long as the extra bytes are sign fill
            let (extra, rest) = bytes.split_at(bytes.len() - 16);
            let fill = if rest[0] & 0x80 != 0 { 0xff } else { 0x00 };
            if extra.iter().any(|b| *b != fill) {
                return None;
            }
            return Self::from_be_bytes(rest, scale);
        }
        if bytes.is_empty() {
            return Some(Self::new(0, scale));
        }
        let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - bytes.len()..].copy_from_slice(bytes);
        Some(Self::new(i128::from_be_bytes(buf), scale))
    }

    /// Parse the plain textual form (`-12.345`)
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return None;
        }
        let combined = format!("{}{}", int_part, frac_part);
        let magnitude: i128 = if combined.is_empty() { 0 } else { combined.parse().ok()? };
        let unscaled = if negative { -magnitude } else { magnitude };
        Some(Self::new(unscaled, frac_part.len() as u32))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.unscaled < 0 { "-" } else { "" };
        let magnitude = self.unscaled.unsigned_abs().to_string();
        if self.scale == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        let scale = self.scale as usize;
        let padded = format!("{:0>width$}", magnitude, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

/// A record value, or any part of one
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Fixed(Vec<u8>),
    /// Enum symbol
    Enum(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Named fields; order is not significant for encoding
    Record(Vec<(String, Value)>),
    Date(NaiveDate),
    TimeMicros(NaiveTime),
    TimestampMicros(DateTime<Utc>),
    Uuid(Uuid),
    Decimal(Decimal),
}

impl Value {
    /// Build a record value from `(name, value)` pairs
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a record field by name
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Kind name used in mismatch messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Fixed(_) => "fixed",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Date(_) => "date",
            Value::TimeMicros(_) => "time-micros",
            Value::TimestampMicros(_) => "timestamp-micros",
            Value::Uuid(_) => "uuid",
            Value::Decimal(_) => "decimal",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::TimeMicros(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampMicros(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value
where
    T: NotBytes,
{
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(v: BTreeMap<String, T>) -> Self {
        Value::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Marker keeping `Vec<u8>` mapped to `bytes` rather than an array of ints
pub trait NotBytes {}

impl NotBytes for bool {}
impl NotBytes for i32 {}
impl NotBytes for i64 {}
impl NotBytes for f32 {}
impl NotBytes for f64 {}
impl NotBytes for String {}
impl NotBytes for Value {}
impl NotBytes for Decimal {}
impl NotBytes for Uuid {}
impl NotBytes for DateTime<Utc> {}
impl NotBytes for NaiveDate {}
impl<T> NotBytes for Vec<T> {}
impl<T> NotBytes for Option<T> {}
