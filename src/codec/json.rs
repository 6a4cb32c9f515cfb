//! Schema-directed JSON bridge
//!
//! Two renderings share one traversal:
//! - `JsonStyle::Avro` is the JSON encoding used for field defaults in
//!   schema text. Logical values are written as their physical form and
//!   bytes as a string of code points 0-255.
//! - `JsonStyle::Plain` is the textual body format used when a peer does not
//!   speak the binary framing. Timestamps are RFC 3339 strings, dates and
//!   times ISO 8601, decimals plain numeric strings.
//!
//! Union values are written unwrapped in both styles.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as Json};

use super::encoder::{encode, select_branch};
use super::errors::{index_path, make_path, CodecError, CodecResult};
use super::value::{Decimal, Value};
use super::decoder::decode;
use crate::schema::{LogicalType, SchemaNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    Avro,
    Plain,
}

/// Render a value as JSON against its schema
pub fn to_json(value: &Value, schema: &SchemaNode, style: JsonStyle) -> CodecResult<Json> {
    let root = schema.name().map(|n| n.name.clone()).unwrap_or_default();
    write_json(value, schema, style, &root)
}

/// Read a value from JSON against a schema
///
/// Object keys unknown to a record schema are ignored.
pub fn from_json(json: &Json, schema: &SchemaNode, style: JsonStyle) -> CodecResult<Value> {
    let root = schema.name().map(|n| n.name.clone()).unwrap_or_default();
    read_json(json, schema, style, &root)
}

fn write_json(value: &Value, schema: &SchemaNode, style: JsonStyle, path: &str) -> CodecResult<Json> {
    if let SchemaNode::Union(branches) = schema {
        let index = select_branch(value, branches).ok_or_else(|| CodecError::mismatch(path, "union", value.kind()))?;
        return write_json(value, &branches[index], style, path);
    }

    if let SchemaNode::Logical(logical, physical) = schema {
        if style == JsonStyle::Plain {
            if let Some(text) = plain_logical(value, *logical) {
                return Ok(Json::String(text));
            }
        }
        // physical form, via the binary codec's own conversions
        let bytes = encode(value, schema)?;
        let (raw, _) = decode(&bytes, physical)?;
        return write_json(&raw, physical, style, path);
    }

    let json = match (schema, value) {
        (SchemaNode::Null, Value::Null) => Json::Null,
        (SchemaNode::Boolean, Value::Boolean(b)) => Json::Bool(*b),
        (SchemaNode::Int | SchemaNode::Long, Value::Int(n)) => Json::from(*n),
        (SchemaNode::Long, Value::Long(n)) => Json::from(*n),
        (SchemaNode::Int, Value::Long(n)) if i32::try_from(*n).is_ok() => Json::from(*n),
        (SchemaNode::Float | SchemaNode::Double, _) => {
            let f = match value {
                Value::Float(f) => *f as f64,
                Value::Double(f) => *f,
                Value::Int(n) => *n as f64,
                Value::Long(n) => *n as f64,
                other => return Err(CodecError::mismatch(path, schema.type_name(), other.kind())),
            };
            Number::from_f64(f)
                .map(Json::Number)
                .ok_or_else(|| CodecError::mismatch(path, "finite number", f.to_string()))?
        }
        (SchemaNode::Bytes, Value::Bytes(b)) => Json::String(bytes_to_text(b)),
        (SchemaNode::Fixed(f), Value::Fixed(b) | Value::Bytes(b)) if b.len() == f.size => Json::String(bytes_to_text(b)),
        (SchemaNode::String, Value::String(s)) => Json::String(s.clone()),
        (SchemaNode::Enum(e), Value::Enum(s) | Value::String(s)) if e.symbols.contains(s) => Json::String(s.clone()),
        (SchemaNode::Array(items), Value::Array(values)) => Json::Array(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| write_json(v, items, style, &index_path(path, i)))
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        (SchemaNode::Map(values), Value::Map(entries)) => {
            let mut object = Map::new();
            for (key, item) in entries {
                object.insert(key.clone(), write_json(item, values, style, &index_path(path, key))?);
            }
            Json::Object(object)
        }
        (SchemaNode::Record(record), Value::Record(fields)) => {
            let mut object = Map::new();
            for field in &record.fields {
                let field_path = make_path(path, &field.name);
                let item = match fields.iter().find(|(name, _)| *name == field.name) {
                    Some((_, item)) => item,
                    None => match &field.default {
                        Some(default) => default,
                        None if field.schema.is_nullable() => &Value::Null,
                        None => return Err(CodecError::mismatch(&field_path, field.schema.type_name(), "missing required field")),
                    },
                };
                object.insert(field.name.clone(), write_json(item, &field.schema, style, &field_path)?);
            }
            Json::Object(object)
        }
        (schema, value) => return Err(CodecError::mismatch(path, schema.type_name(), value.kind())),
    };
    Ok(json)
}

fn plain_logical(value: &Value, logical: LogicalType) -> Option<String> {
    match (logical, value) {
        (LogicalType::TimestampMicros, Value::TimestampMicros(ts)) => Some(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        (LogicalType::Date, Value::Date(date)) => Some(date.format("%Y-%m-%d").to_string()),
        (LogicalType::TimeMicros, Value::TimeMicros(time)) => Some(time.format("%H:%M:%S%.f").to_string()),
        (LogicalType::Uuid, Value::Uuid(uuid)) => Some(uuid.hyphenated().to_string()),
        (LogicalType::Decimal { .. }, Value::Decimal(decimal)) => Some(decimal.to_string()),
        _ => None,
    }
}

fn read_json(json: &Json, schema: &SchemaNode, style: JsonStyle, path: &str) -> CodecResult<Value> {
    let found = || json_kind(json).to_string();

    let value = match schema {
        SchemaNode::Union(branches) => {
            if json.is_null() && branches.contains(&SchemaNode::Null) {
                return Ok(Value::Null);
            }
            return branches
                .iter()
                .filter(|b| **b != SchemaNode::Null)
                .find_map(|b| read_json(json, b, style, path).ok())
                .ok_or_else(|| CodecError::mismatch(path, "union", found()));
        }
        SchemaNode::Logical(logical, physical) => return read_logical(json, *logical, physical, style, path),
        SchemaNode::Null => match json {
            Json::Null => Value::Null,
            _ => return Err(CodecError::mismatch(path, "null", found())),
        },
        SchemaNode::Boolean => Value::Boolean(json.as_bool().ok_or_else(|| CodecError::mismatch(path, "boolean", found()))?),
        SchemaNode::Int => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int)
            .ok_or_else(|| CodecError::mismatch(path, "int", found()))?,
        SchemaNode::Long => Value::Long(json.as_i64().ok_or_else(|| CodecError::mismatch(path, "long", found()))?),
        SchemaNode::Float => Value::Float(json.as_f64().ok_or_else(|| CodecError::mismatch(path, "float", found()))? as f32),
        SchemaNode::Double => Value::Double(json.as_f64().ok_or_else(|| CodecError::mismatch(path, "double", found()))?),
        SchemaNode::String => Value::String(
            json.as_str()
                .ok_or_else(|| CodecError::mismatch(path, "string", found()))?
                .to_string(),
        ),
        SchemaNode::Bytes => Value::Bytes(text_to_bytes(json, path)?),
        SchemaNode::Fixed(f) => {
            let bytes = text_to_bytes(json, path)?;
            if bytes.len() != f.size {
                return Err(CodecError::mismatch(path, format!("fixed({})", f.size), format!("{} bytes", bytes.len())));
            }
            Value::Fixed(bytes)
        }
        SchemaNode::Enum(e) => match json.as_str() {
            Some(symbol) if e.symbols.iter().any(|s| s == symbol) => Value::Enum(symbol.to_string()),
            _ => return Err(CodecError::mismatch(path, format!("one of {:?}", e.symbols), found())),
        },
        SchemaNode::Array(items) => {
            let array = json.as_array().ok_or_else(|| CodecError::mismatch(path, "array", found()))?;
            Value::Array(
                array
                    .iter()
                    .enumerate()
                    .map(|(i, item)| read_json(item, items, style, &index_path(path, i)))
                    .collect::<CodecResult<Vec<_>>>()?,
            )
        }
        SchemaNode::Map(values) => {
            let object = json.as_object().ok_or_else(|| CodecError::mismatch(path, "map", found()))?;
            let mut entries = std::collections::BTreeMap::new();
            for (key, item) in object {
                entries.insert(key.clone(), read_json(item, values, style, &index_path(path, key))?);
            }
            Value::Map(entries)
        }
        SchemaNode::Record(record) => {
            let object = json.as_object().ok_or_else(|| CodecError::mismatch(path, "record", found()))?;
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let field_path = make_path(path, &field.name);
                let value = match object.get(&field.name) {
                    Some(item) => read_json(item, &field.schema, style, &field_path)?,
                    None => match &field.default {
                        Some(default) => default.clone(),
                        None if field.schema.is_nullable() => Value::Null,
                        None => return Err(CodecError::mismatch(&field_path, field.schema.type_name(), "missing field")),
                    },
                };
                fields.push((field.name.clone(), value));
            }
            Value::Record(fields)
        }
    };
    Ok(value)
}

fn read_logical(json: &Json, logical: LogicalType, physical: &SchemaNode, style: JsonStyle, path: &str) -> CodecResult<Value> {
    if let (JsonStyle::Plain, Some(text)) = (style, json.as_str()) {
        let mismatch = || CodecError::mismatch(path, logical.as_str(), format!("'{}'", text));
        let value = match logical {
            LogicalType::TimestampMicros => DateTime::parse_from_rfc3339(text)
                .map(|ts| Value::TimestampMicros(ts.with_timezone(&Utc)))
                .map_err(|_| mismatch())?,
            LogicalType::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| mismatch())?,
            LogicalType::TimeMicros => NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
                .map(Value::TimeMicros)
                .map_err(|_| mismatch())?,
            LogicalType::Uuid => uuid::Uuid::parse_str(text).map(Value::Uuid).map_err(|_| mismatch())?,
            LogicalType::Decimal { scale, .. } => Decimal::parse(text)
                .and_then(|d| rescale(d, scale))
                .map(Value::Decimal)
                .ok_or_else(mismatch)?,
        };
        return Ok(value);
    }

    if let (LogicalType::Decimal { scale, .. }, JsonStyle::Plain, Json::Number(n)) = (logical, style, json) {
        return Decimal::parse(&n.to_string())
            .and_then(|d| rescale(d, scale))
            .map(Value::Decimal)
            .ok_or_else(|| CodecError::mismatch(path, "decimal", n.to_string()));
    }

    // physical form; round trip through the binary codec to apply the logical type
    let raw = read_json(json, physical, style, path)?;
    let bytes = encode(&raw, physical)?;
    let logical_schema = SchemaNode::Logical(logical, Box::new(physical.clone()));
    let (value, _) = decode(&bytes, &logical_schema)?;
    Ok(value)
}

/// Widen a decimal to `scale` fractional digits; narrowing is refused
fn rescale(decimal: Decimal, scale: u32) -> Option<Decimal> {
    if decimal.scale > scale {
        return None;
    }
    let factor = 10i128.checked_pow(scale - decimal.scale)?;
    Some(Decimal::new(decimal.unscaled.checked_mul(factor)?, scale))
}

fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

fn text_to_bytes(json: &Json, path: &str) -> CodecResult<Vec<u8>> {
    let text = json
        .as_str()
        .ok_or_else(|| CodecError::mismatch(path, "bytes", json_kind(json)))?;
    text.chars()
        .map(|c| u8::try_from(c).map_err(|_| CodecError::mismatch(path, "bytes", format!("code point {:?}", c))))
        .collect()
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
