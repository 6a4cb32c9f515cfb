//! Typed record surface
//!
//! [`AvroRecord`] ties a Rust type to its type definition and to the
//! [`Value`] form the codec works on. Implementations are written by hand;
//! nothing is discovered at runtime.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use super::errors::{make_path, CodecError, CodecResult};
use super::value::{Decimal, NotBytes, Value};
use crate::schema::{derive_schema, RecordDef, SchemaNode, SchemaResult};

/// A record type that can travel over the wire
pub trait AvroRecord: Sized {
    /// The type definition the schema is derived from
    fn record_def() -> RecordDef;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> CodecResult<Self>;

    /// Derive the record schema
    fn schema() -> SchemaResult<SchemaNode> {
        derive_schema(&Self::record_def())
    }
}

/// Record with no fields, for operations without a body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Null;

impl AvroRecord for Null {
    fn record_def() -> RecordDef {
        RecordDef::new("Null", Vec::new())
    }

    fn to_value(&self) -> Value {
        Value::Record(Vec::new())
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        match value {
            Value::Record(_) | Value::Null => Ok(Null),
            other => Err(CodecError::mismatch("Null", "record", other.kind())),
        }
    }
}

/// Conversion from a decoded value into a field type
pub trait FromValue: Sized {
    fn from_value(value: Value, path: &str) -> CodecResult<Self>;
}

macro_rules! from_value {
    ($ty:ty, $expected:literal, $($pattern:pat => $out:expr),+) => {
        impl FromValue for $ty {
            fn from_value(value: Value, path: &str) -> CodecResult<Self> {
                match value {
                    $($pattern => Ok($out),)+
                    other => Err(CodecError::mismatch(path, $expected, other.kind())),
                }
            }
        }
    };
}

from_value!(bool, "boolean", Value::Boolean(b) => b);
from_value!(i32, "int", Value::Int(n) => n);
from_value!(i64, "long", Value::Long(n) => n, Value::Int(n) => n as i64);
from_value!(f32, "float", Value::Float(f) => f);
from_value!(f64, "double", Value::Double(f) => f, Value::Float(f) => f as f64);
from_value!(String, "string", Value::String(s) => s, Value::Enum(s) => s);
from_value!(Vec<u8>, "bytes", Value::Bytes(b) => b, Value::Fixed(b) => b);
from_value!(DateTime<Utc>, "timestamp-micros", Value::TimestampMicros(ts) => ts);
from_value!(NaiveDate, "date", Value::Date(d) => d);
from_value!(NaiveTime, "time-micros", Value::TimeMicros(t) => t);
from_value!(Uuid, "uuid", Value::Uuid(u) => u);
from_value!(Decimal, "decimal", Value::Decimal(d) => d);

impl FromValue for Value {
    fn from_value(value: Value, _path: &str) -> CodecResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, path: &str) -> CodecResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, path).map(Some),
        }
    }
}

impl<T: FromValue + NotBytes> FromValue for Vec<T> {
    fn from_value(value: Value, path: &str) -> CodecResult<Self> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item, &format!("{}[{}]", path, i)))
                .collect(),
            other => Err(CodecError::mismatch(path, "array", other.kind())),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value, path: &str) -> CodecResult<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, item)| {
                    let item = T::from_value(item, &format!("{}[{}]", path, key))?;
                    Ok((key, item))
                })
                .collect(),
            other => Err(CodecError::mismatch(path, "map", other.kind())),
        }
    }
}

/// Fields of a decoded record, taken out one at a time
#[derive(Debug)]
pub struct RecordFields {
    record: String,
    fields: Vec<(String, Value)>,
}

impl RecordFields {
    pub fn new(value: Value, record: &str) -> CodecResult<Self> {
        match value {
            Value::Record(fields) => Ok(Self {
                record: record.to_string(),
                fields,
            }),
            other => Err(CodecError::mismatch(record, "record", other.kind())),
        }
    }

    /// Take a field; an absent field reads as null
    pub fn take<T: FromValue>(&mut self, name: &str) -> CodecResult<T> {
        let value = match self.fields.iter().position(|(k, _)| k == name) {
            Some(pos) => self.fields.swap_remove(pos).1,
            None => Value::Null,
        };
        T::from_value(value, &make_path(&self.record, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, TypeDef};

    #[derive(Debug, PartialEq)]
    struct Sample {
        a: String,
        b: i64,
        c: Option<i64>,
        tags: Vec<String>,
    }

    impl AvroRecord for Sample {
        fn record_def() -> RecordDef {
            RecordDef::new(
                "Sample",
                vec![
                    FieldDef::required("a", TypeDef::Text),
                    FieldDef::required("b", TypeDef::Integer { bits: None }),
                    FieldDef::optional("c", TypeDef::Integer { bits: None }),
                    FieldDef::required("tags", TypeDef::sequence(TypeDef::Text)),
                ],
            )
        }

        fn to_value(&self) -> Value {
            Value::record([
                ("a", Value::from(self.a.as_str())),
                ("b", Value::from(self.b)),
                ("c", Value::from(self.c)),
                ("tags", Value::from(self.tags.clone())),
            ])
        }

        fn from_value(value: Value) -> CodecResult<Self> {
            let mut fields = RecordFields::new(value, "Sample")?;
            Ok(Self {
                a: fields.take("a")?,
                b: fields.take("b")?,
                c: fields.take("c")?,
                tags: fields.take("tags")?,
            })
        }
    }

    #[test]
    fn test_typed_roundtrip_through_codec() {
        let sample = Sample {
            a: "ayy".into(),
            b: 1337,
            c: None,
            tags: vec!["x".into()],
        };
        let schema = Sample::schema().unwrap();
        let bytes = crate::codec::encode(&sample.to_value(), &schema).unwrap();
        let (value, _) = crate::codec::decode(&bytes, &schema).unwrap();
        assert_eq!(Sample::from_value(value).unwrap(), sample);
    }

    #[test]
    fn test_take_reports_path() {
        let mut fields = RecordFields::new(Value::record([("b", Value::from("x"))]), "Sample").unwrap();
        let err = fields.take::<i64>("b").unwrap_err();
        assert_eq!(err.path(), "Sample.b");
        assert!(fields.take::<String>("missing").is_err());
        assert_eq!(fields.take::<Option<String>>("missing").unwrap(), None);
    }

    #[test]
    fn test_null_record() {
        let schema = Null::schema().unwrap();
        assert!(schema.as_record().unwrap().fields.is_empty());
        assert_eq!(crate::codec::encode(&Null.to_value(), &schema).unwrap(), Vec::<u8>::new());
    }
}
