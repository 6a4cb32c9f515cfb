//! Schema-driven encoder
//!
//! Traversal follows the schema, never the value: record fields are written
//! in schema order, union branches are chosen against the schema's fixed
//! branch order, and arrays and maps are written as a single block followed
//! by a zero terminator.

use chrono::{Datelike, Timelike};

use super::binary::{write_bool, write_bytes, write_double, write_float, write_int, write_long, write_string};
use super::errors::{index_path, make_path, CodecError, CodecResult};
use super::value::{Decimal, Value};
use crate::schema::{FieldNode, LogicalType, RecordSchema, SchemaNode};

/// `NaiveDate::num_days_from_ce` of 1970-01-01
pub(crate) const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Encode a value against its schema
pub fn encode(value: &Value, schema: &SchemaNode) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(&mut buf, value, schema)?;
    Ok(buf)
}

/// Encode a value, appending to `buf`
///
/// On error `buf` may hold a partial encoding and should be discarded.
pub fn encode_into(buf: &mut Vec<u8>, value: &Value, schema: &SchemaNode) -> CodecResult<()> {
    let root = schema.name().map(|n| n.name.clone()).unwrap_or_default();
    encode_node(buf, value, schema, &root)
}

fn encode_node(buf: &mut Vec<u8>, value: &Value, schema: &SchemaNode, path: &str) -> CodecResult<()> {
    match (schema, value) {
        (SchemaNode::Null, Value::Null) => Ok(()),
        (SchemaNode::Boolean, Value::Boolean(b)) => {
            write_bool(buf, *b);
            Ok(())
        }
        (SchemaNode::Int, _) => {
            let n = match value {
                Value::Int(n) => *n,
                Value::Long(n) => i32::try_from(*n)
                    .map_err(|_| CodecError::mismatch(path, "int", format!("long {} out of int range", n)))?,
                other => return Err(CodecError::mismatch(path, "int", other.kind())),
            };
            write_int(buf, n);
            Ok(())
        }
        (SchemaNode::Long, Value::Long(n)) => {
            write_long(buf, *n);
            Ok(())
        }
        (SchemaNode::Long, Value::Int(n)) => {
            write_long(buf, *n as i64);
            Ok(())
        }
        (SchemaNode::Float, _) => {
            let f = match value {
                Value::Float(f) => *f,
                Value::Double(f) => *f as f32,
                Value::Int(n) => *n as f32,
                Value::Long(n) => *n as f32,
                other => return Err(CodecError::mismatch(path, "float", other.kind())),
            };
            write_float(buf, f);
            Ok(())
        }
        (SchemaNode::Double, _) => {
            let f = match value {
                Value::Double(f) => *f,
                Value::Float(f) => *f as f64,
                Value::Int(n) => *n as f64,
                Value::Long(n) => *n as f64,
                other => return Err(CodecError::mismatch(path, "double", other.kind())),
            };
            write_double(buf, f);
            Ok(())
        }
        (SchemaNode::Bytes, Value::Bytes(b)) => {
            write_bytes(buf, b);
            Ok(())
        }
        (SchemaNode::String, Value::String(s)) => {
            write_string(buf, s);
            Ok(())
        }
        (SchemaNode::Record(record), Value::Record(fields)) => encode_record(buf, fields, record, path),
        (SchemaNode::Enum(e), Value::Enum(symbol) | Value::String(symbol)) => {
            let index = e.symbols.iter().position(|s| s == symbol).ok_or_else(|| {
                CodecError::mismatch(path, format!("one of {:?}", e.symbols), format!("symbol '{}'", symbol))
            })?;
            write_int(buf, index as i32);
            Ok(())
        }
        (SchemaNode::Fixed(f), Value::Fixed(bytes) | Value::Bytes(bytes)) => {
            if bytes.len() != f.size {
                return Err(CodecError::mismatch(
                    path,
                    format!("fixed({})", f.size),
                    format!("{} bytes", bytes.len()),
                ));
            }
            buf.extend_from_slice(bytes);
            Ok(())
        }
        (SchemaNode::Array(items), Value::Array(values)) => {
            if !values.is_empty() {
                write_long(buf, values.len() as i64);
                for (i, item) in values.iter().enumerate() {
                    encode_node(buf, item, items, &index_path(path, i))?;
                }
            }
            write_long(buf, 0);
            Ok(())
        }
        (SchemaNode::Map(values_schema), Value::Map(entries)) => {
            if !entries.is_empty() {
                write_long(buf, entries.len() as i64);
                for (key, item) in entries {
                    write_string(buf, key);
                    encode_node(buf, item, values_schema, &index_path(path, key))?;
                }
            }
            write_long(buf, 0);
            Ok(())
        }
        (SchemaNode::Union(branches), _) => {
            let index = select_branch(value, branches).ok_or_else(|| {
                let names: Vec<_> = branches.iter().map(|b| b.type_name()).collect();
                CodecError::mismatch(path, format!("one of {:?}", names), value.kind())
            })?;
            write_long(buf, index as i64);
            encode_node(buf, value, &branches[index], path)
        }
        (SchemaNode::Logical(logical, physical), _) => encode_logical(buf, value, *logical, physical, path),
        (schema, value) => Err(CodecError::mismatch(path, schema.type_name(), value.kind())),
    }
}

fn encode_record(buf: &mut Vec<u8>, fields: &[(String, Value)], record: &RecordSchema, path: &str) -> CodecResult<()> {
    if let Some((unknown, _)) = fields.iter().find(|(name, _)| record.field(name).is_none()) {
        return Err(CodecError::mismatch(
            path,
            format!("fields of record '{}'", record.name.fullname()),
            format!("unknown field '{}'", unknown),
        ));
    }

    for field in &record.fields {
        let field_path = make_path(path, &field.name);
        match fields.iter().find(|(name, _)| *name == field.name) {
            Some((_, value)) => encode_node(buf, value, &field.schema, &field_path)?,
            None => encode_absent(buf, field, &field_path)?,
        }
    }
    Ok(())
}

/// A field left out of the value takes its default, or null when nullable
fn encode_absent(buf: &mut Vec<u8>, field: &FieldNode, path: &str) -> CodecResult<()> {
    match &field.default {
        Some(default) => encode_node(buf, default, &field.schema, path),
        None if field.schema.is_nullable() => encode_node(buf, &Value::Null, &field.schema, path),
        None => Err(CodecError::mismatch(path, field.schema.type_name(), "missing required field")),
    }
}

fn encode_logical(
    buf: &mut Vec<u8>,
    value: &Value,
    logical: LogicalType,
    physical: &SchemaNode,
    path: &str,
) -> CodecResult<()> {
    match (logical, value) {
        (LogicalType::Date, Value::Date(date)) => {
            let days = date.num_days_from_ce() - EPOCH_DAYS_FROM_CE;
            encode_node(buf, &Value::Int(days), physical, path)
        }
        (LogicalType::TimeMicros, Value::TimeMicros(time)) => {
            let micros = time.num_seconds_from_midnight() as i64 * 1_000_000 + (time.nanosecond() / 1_000) as i64;
            encode_node(buf, &Value::Long(micros), physical, path)
        }
        (LogicalType::TimestampMicros, Value::TimestampMicros(ts)) => {
            encode_node(buf, &Value::Long(ts.timestamp_micros()), physical, path)
        }
        (LogicalType::Uuid, Value::Uuid(uuid)) => {
            encode_node(buf, &Value::String(uuid.hyphenated().to_string()), physical, path)
        }
        (LogicalType::Uuid, Value::String(text)) => {
            let uuid = uuid::Uuid::parse_str(text)
                .map_err(|_| CodecError::mismatch(path, "uuid", format!("string '{}'", text)))?;
            encode_node(buf, &Value::String(uuid.hyphenated().to_string()), physical, path)
        }
        (LogicalType::Decimal { precision, scale }, Value::Decimal(decimal)) => {
            let bytes = decimal_bytes(decimal, precision, scale, physical, path)?;
            match physical {
                SchemaNode::Fixed(_) => encode_node(buf, &Value::Fixed(bytes), physical, path),
                _ => encode_node(buf, &Value::Bytes(bytes), physical, path),
            }
        }
        // the raw physical representation is accepted as-is
        (_, value) => encode_node(buf, value, physical, path),
    }
}

fn decimal_bytes(
    decimal: &Decimal,
    precision: u32,
    scale: u32,
    physical: &SchemaNode,
    path: &str,
) -> CodecResult<Vec<u8>> {
    let expected = format!("decimal({}, {})", precision, scale);
    if decimal.scale != scale {
        return Err(CodecError::mismatch(path, expected, format!("decimal with scale {}", decimal.scale)));
    }
    if decimal.digits() > precision {
        return Err(CodecError::mismatch(path, expected, format!("{} digits", decimal.digits())));
    }

    let bytes = decimal.to_be_bytes();
    match physical {
        SchemaNode::Fixed(fixed) => {
            if bytes.len() > fixed.size {
                return Err(CodecError::mismatch(
                    path,
                    format!("fixed({})", fixed.size),
                    format!("{} bytes", bytes.len()),
                ));
            }
            let fill = if decimal.unscaled < 0 { 0xff } else { 0x00 };
            let mut padded = vec![fill; fixed.size - bytes.len()];
            padded.extend_from_slice(&bytes);
            Ok(padded)
        }
        _ => Ok(bytes),
    }
}

/// Pick the union branch a value is written with
///
/// `Null` always takes the null branch. Otherwise the first branch whose
/// type matches the value exactly wins, then the first branch the value
/// converts to.
pub(crate) fn select_branch(value: &Value, branches: &[SchemaNode]) -> Option<usize> {
    if value.is_null() {
        return branches.iter().position(|b| *b == SchemaNode::Null);
    }
    branches
        .iter()
        .position(|b| accepts(value, b, true))
        .or_else(|| branches.iter().position(|b| accepts(value, b, false)))
}

fn accepts(value: &Value, schema: &SchemaNode, exact: bool) -> bool {
    let direct = match (value, schema) {
        (Value::Boolean(_), SchemaNode::Boolean)
        | (Value::Int(_), SchemaNode::Int)
        | (Value::Long(_), SchemaNode::Long)
        | (Value::Float(_), SchemaNode::Float)
        | (Value::Double(_), SchemaNode::Double)
        | (Value::Bytes(_), SchemaNode::Bytes)
        | (Value::String(_), SchemaNode::String)
        | (Value::Array(_), SchemaNode::Array(_))
        | (Value::Map(_), SchemaNode::Map(_)) => true,
        (Value::Fixed(bytes), SchemaNode::Fixed(f)) => bytes.len() == f.size,
        (Value::Enum(symbol), SchemaNode::Enum(e)) => e.symbols.contains(symbol),
        (Value::Record(fields), SchemaNode::Record(r)) => fields.iter().all(|(name, _)| r.field(name).is_some()),
        (Value::Date(_), SchemaNode::Logical(LogicalType::Date, _))
        | (Value::TimeMicros(_), SchemaNode::Logical(LogicalType::TimeMicros, _))
        | (Value::TimestampMicros(_), SchemaNode::Logical(LogicalType::TimestampMicros, _))
        | (Value::Uuid(_), SchemaNode::Logical(LogicalType::Uuid, _)) => true,
        (Value::Decimal(d), SchemaNode::Logical(LogicalType::Decimal { scale, .. }, _)) => d.scale == *scale,
        _ => false,
    };
    if direct || exact {
        return direct;
    }

    match (value, schema) {
        (Value::Int(_), SchemaNode::Long | SchemaNode::Float | SchemaNode::Double) => true,
        (Value::Long(n), SchemaNode::Int) => i32::try_from(*n).is_ok(),
        (Value::Long(_), SchemaNode::Float | SchemaNode::Double) => true,
        (Value::Float(_), SchemaNode::Double) | (Value::Double(_), SchemaNode::Float) => true,
        (Value::String(symbol), SchemaNode::Enum(e)) => e.symbols.contains(symbol),
        (Value::Bytes(bytes), SchemaNode::Fixed(f)) => bytes.len() == f.size,
        (Value::String(text), SchemaNode::Logical(LogicalType::Uuid, _)) => uuid::Uuid::parse_str(text).is_ok(),
        (_, SchemaNode::Logical(_, physical)) => accepts(value, physical, true),
        _ => false,
    }
}
