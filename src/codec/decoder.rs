//! Schema-resolving decoder
//!
//! The writer schema decides how many bytes are consumed; the reader schema
//! decides the shape of the result. Resolution rules:
//!
//! - record fields are matched by name (or reader alias), not position
//! - reader-only fields take the reader default, or null when nullable
//! - writer-only fields are consumed and discarded
//! - the writer's union branch is picked by index, the reader's by type
//! - numeric promotions int -> long -> float -> double, and string <-> bytes
//!
//! A reader logical type is applied after the physical value is read.

use chrono::{DateTime, NaiveDate, NaiveTime};

use super::binary::ByteCursor;
use super::encoder::EPOCH_DAYS_FROM_CE;
use super::errors::{index_path, make_path, CodecError, CodecResult};
use super::value::{Decimal, Value};
use crate::schema::{LogicalType, RecordSchema, SchemaNode};

/// Upper bound on items in a block whose items occupy no bytes
pub const MAX_ZERO_WIDTH_ITEMS: usize = 1_000_000;

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Decode a value written with `writer`, read back with the same schema
///
/// Returns the value and the number of bytes consumed.
pub fn decode(bytes: &[u8], writer: &SchemaNode) -> CodecResult<(Value, usize)> {
    decode_with_reader(bytes, writer, writer)
}

/// Decode a value written with `writer` into the shape of `reader`
pub fn decode_with_reader(bytes: &[u8], writer: &SchemaNode, reader: &SchemaNode) -> CodecResult<(Value, usize)> {
    let mut cursor = ByteCursor::new(bytes);
    let root = reader.name().map(|n| n.name.clone()).unwrap_or_default();
    let value = read(&mut cursor, writer, reader, &root)?;
    Ok((value, cursor.position()))
}

fn read(cursor: &mut ByteCursor<'_>, writer: &SchemaNode, reader: &SchemaNode, path: &str) -> CodecResult<Value> {
    if let SchemaNode::Union(branches) = writer {
        let index = cursor.read_long(path)?;
        let branch = usize::try_from(index)
            .ok()
            .and_then(|i| branches.get(i))
            .ok_or_else(|| {
                CodecError::decode(
                    path,
                    format!("union index {} out of range for {} branches", index, branches.len()),
                )
            })?;
        let target = reader_branch(branch, reader, path)?;
        return read(cursor, branch, target, path);
    }

    if let SchemaNode::Union(_) = reader {
        let target = reader_branch(writer, reader, path)?;
        return read(cursor, writer, target, path);
    }

    if let (Some(LogicalType::Decimal { scale: w, .. }), Some(LogicalType::Decimal { scale: r, .. })) =
        (writer.logical(), reader.logical())
    {
        if w != r {
            return Err(CodecError::incompatible(
                path,
                format!("decimal scale {}", w),
                format!("decimal scale {}", r),
            ));
        }
    }

    let physical = read_physical(cursor, writer.physical(), reader.physical(), path)?;
    match reader.logical() {
        Some(logical) => apply_logical(physical, logical, path),
        None => Ok(physical),
    }
}

/// The reader branch a writer schema resolves to
///
/// A non-union reader is treated as a single branch.
fn reader_branch<'r>(writer: &SchemaNode, reader: &'r SchemaNode, path: &str) -> CodecResult<&'r SchemaNode> {
    let found = match reader {
        SchemaNode::Union(branches) => branches
            .iter()
            .find(|b| same_type(writer, b))
            .or_else(|| branches.iter().find(|b| resolvable(writer, b))),
        single => Some(single).filter(|r| resolvable(writer, r)),
    };
    found.ok_or_else(|| CodecError::IncompatibleUnion {
        path: path.to_string(),
        writer_branch: writer.type_name().to_string(),
    })
}

fn same_name(writer: &SchemaNode, reader: &SchemaNode) -> bool {
    match (writer.name(), reader.name()) {
        (Some(w), Some(r)) => {
            let aliases = match reader.physical() {
                SchemaNode::Record(rec) => &rec.aliases,
                SchemaNode::Enum(e) => &e.aliases,
                SchemaNode::Fixed(f) => &f.aliases,
                _ => return false,
            };
            w.name == r.name || aliases.iter().any(|a| *a == w.name || *a == w.fullname())
        }
        _ => false,
    }
}

/// Identical type, including logical refinement and name
fn same_type(writer: &SchemaNode, reader: &SchemaNode) -> bool {
    writer.logical() == reader.logical() && physical_match(writer.physical(), reader.physical())
}

fn physical_match(writer: &SchemaNode, reader: &SchemaNode) -> bool {
    match (writer, reader) {
        (SchemaNode::Record(_), SchemaNode::Record(_)) | (SchemaNode::Enum(_), SchemaNode::Enum(_)) => {
            same_name(writer, reader)
        }
        (SchemaNode::Fixed(w), SchemaNode::Fixed(r)) => w.size == r.size && same_name(writer, reader),
        (SchemaNode::Array(_), SchemaNode::Array(_)) | (SchemaNode::Map(_), SchemaNode::Map(_)) => true,
        (SchemaNode::Union(_), _) | (_, SchemaNode::Union(_)) => false,
        _ => std::mem::discriminant(writer) == std::mem::discriminant(reader),
    }
}

/// Whether writer data can be read as the reader type, promotions included
fn resolvable(writer: &SchemaNode, reader: &SchemaNode) -> bool {
    let (w, r) = (writer.physical(), reader.physical());
    physical_match(w, r)
        || matches!(
            (w, r),
            (SchemaNode::Int, SchemaNode::Long | SchemaNode::Float | SchemaNode::Double)
                | (SchemaNode::Long, SchemaNode::Float | SchemaNode::Double)
                | (SchemaNode::Float, SchemaNode::Double)
                | (SchemaNode::String, SchemaNode::Bytes)
                | (SchemaNode::Bytes, SchemaNode::String)
        )
}

fn read_physical(cursor: &mut ByteCursor<'_>, writer: &SchemaNode, reader: &SchemaNode, path: &str) -> CodecResult<Value> {
    let value = match (writer, reader) {
        (SchemaNode::Null, SchemaNode::Null) => Value::Null,
        (SchemaNode::Boolean, SchemaNode::Boolean) => Value::Boolean(cursor.read_bool(path)?),
        (SchemaNode::Int, SchemaNode::Int) => Value::Int(cursor.read_int(path)?),
        (SchemaNode::Int, SchemaNode::Long) => Value::Long(cursor.read_int(path)? as i64),
        (SchemaNode::Int, SchemaNode::Float) => Value::Float(cursor.read_int(path)? as f32),
        (SchemaNode::Int, SchemaNode::Double) => Value::Double(cursor.read_int(path)? as f64),
        (SchemaNode::Long, SchemaNode::Long) => Value::Long(cursor.read_long(path)?),
        (SchemaNode::Long, SchemaNode::Float) => Value::Float(cursor.read_long(path)? as f32),
        (SchemaNode::Long, SchemaNode::Double) => Value::Double(cursor.read_long(path)? as f64),
        (SchemaNode::Float, SchemaNode::Float) => Value::Float(cursor.read_float(path)?),
        (SchemaNode::Float, SchemaNode::Double) => Value::Double(cursor.read_float(path)? as f64),
        (SchemaNode::Double, SchemaNode::Double) => Value::Double(cursor.read_double(path)?),
        (SchemaNode::Bytes | SchemaNode::String, SchemaNode::Bytes) => Value::Bytes(cursor.read_bytes(path)?.to_vec()),
        (SchemaNode::Bytes | SchemaNode::String, SchemaNode::String) => Value::String(cursor.read_string(path)?),
        (SchemaNode::Record(w), SchemaNode::Record(r)) if same_name(writer, reader) => read_record(cursor, w, r, path)?,
        (SchemaNode::Enum(w), SchemaNode::Enum(r)) if same_name(writer, reader) => {
            let index = cursor.read_int(path)?;
            let symbol = usize::try_from(index)
                .ok()
                .and_then(|i| w.symbols.get(i))
                .ok_or_else(|| {
                    CodecError::decode(path, format!("enum index {} out of range for {} symbols", index, w.symbols.len()))
                })?;
            if !r.symbols.contains(symbol) {
                return Err(CodecError::incompatible(
                    path,
                    format!("symbol '{}'", symbol),
                    format!("enum '{}'", r.name.fullname()),
                ));
            }
            Value::Enum(symbol.clone())
        }
        (SchemaNode::Fixed(w), SchemaNode::Fixed(r)) if w.size == r.size && same_name(writer, reader) => {
            Value::Fixed(cursor.read_exact(w.size, path)?.to_vec())
        }
        (SchemaNode::Array(w), SchemaNode::Array(r)) => {
            let mut items = Vec::new();
            read_blocks(cursor, w, path, |cursor, i| {
                items.push(read(cursor, w, r, &index_path(path, i))?);
                Ok(())
            })?;
            Value::Array(items)
        }
        (SchemaNode::Map(w), SchemaNode::Map(r)) => {
            let mut entries = std::collections::BTreeMap::new();
            read_blocks(cursor, w, path, |cursor, _| {
                let key = cursor.read_string(path)?;
                let item = read(cursor, w, r, &index_path(path, &key))?;
                entries.insert(key, item);
                Ok(())
            })?;
            Value::Map(entries)
        }
        (writer, reader) => return Err(CodecError::incompatible(path, describe(writer), describe(reader))),
    };
    Ok(value)
}

fn describe(schema: &SchemaNode) -> String {
    match schema.name() {
        Some(name) => format!("{} '{}'", schema.type_name(), name.fullname()),
        None => schema.type_name().to_string(),
    }
}

/// Check without any data that every value written with `writer` can be
/// read as `reader`.
///
/// Fails with the first incompatibility found, the same error decoding
/// would raise for it.
pub fn check_resolution(writer: &SchemaNode, reader: &SchemaNode) -> CodecResult<()> {
    let root = reader.name().map(|n| n.name.clone()).unwrap_or_default();
    check(writer, reader, &root)
}

fn check(writer: &SchemaNode, reader: &SchemaNode, path: &str) -> CodecResult<()> {
    if let SchemaNode::Union(branches) = writer {
        for branch in branches {
            check(branch, reader_branch(branch, reader, path)?, path)?;
        }
        return Ok(());
    }
    if let SchemaNode::Union(_) = reader {
        return check(writer, reader_branch(writer, reader, path)?, path);
    }

    if let (Some(LogicalType::Decimal { scale: w, .. }), Some(LogicalType::Decimal { scale: r, .. })) =
        (writer.logical(), reader.logical())
    {
        if w != r {
            return Err(CodecError::incompatible(
                path,
                format!("decimal scale {}", w),
                format!("decimal scale {}", r),
            ));
        }
    }

    let (w, r) = (writer.physical(), reader.physical());
    match (w, r) {
        (SchemaNode::Record(wr), SchemaNode::Record(rr)) if same_name(w, r) => {
            let mut covered = vec![false; rr.fields.len()];
            for field in &wr.fields {
                if let Some(pos) = rr.position_of(&field.name) {
                    covered[pos] = true;
                    check(&field.schema, &rr.fields[pos].schema, &make_path(path, &field.name))?;
                }
            }
            for (field, covered) in rr.fields.iter().zip(covered) {
                if !covered && field.default.is_none() && !field.schema.is_nullable() {
                    return Err(CodecError::MissingDefault {
                        path: make_path(path, &field.name),
                        field: field.name.clone(),
                    });
                }
            }
            Ok(())
        }
        (SchemaNode::Enum(we), SchemaNode::Enum(re)) if same_name(w, r) => {
            match we.symbols.iter().find(|s| !re.symbols.contains(s)) {
                Some(symbol) => Err(CodecError::incompatible(
                    path,
                    format!("symbol '{}'", symbol),
                    format!("enum '{}'", re.name.fullname()),
                )),
                None => Ok(()),
            }
        }
        (SchemaNode::Array(wi), SchemaNode::Array(ri)) | (SchemaNode::Map(wi), SchemaNode::Map(ri)) => check(wi, ri, path),
        (SchemaNode::Record(_) | SchemaNode::Enum(_), _) => Err(CodecError::incompatible(path, describe(w), describe(r))),
        _ if resolvable(w, r) => Ok(()),
        _ => Err(CodecError::incompatible(path, describe(w), describe(r))),
    }
}

fn read_record(cursor: &mut ByteCursor<'_>, writer: &RecordSchema, reader: &RecordSchema, path: &str) -> CodecResult<Value> {
    let mut slots: Vec<Option<Value>> = vec![None; reader.fields.len()];

    for field in &writer.fields {
        let field_path = make_path(path, &field.name);
        match reader.position_of(&field.name) {
            Some(pos) => slots[pos] = Some(read(cursor, &field.schema, &reader.fields[pos].schema, &field_path)?),
            None => skip(cursor, &field.schema, &field_path)?,
        }
    }

    let mut fields = Vec::with_capacity(reader.fields.len());
    for (field, slot) in reader.fields.iter().zip(slots) {
        let value = match (slot, &field.default) {
            (Some(value), _) => value,
            (None, Some(default)) => default.clone(),
            (None, None) if field.schema.is_nullable() => Value::Null,
            (None, None) => {
                return Err(CodecError::MissingDefault {
                    path: make_path(path, &field.name),
                    field: field.name.clone(),
                });
            }
        };
        fields.push((field.name.clone(), value));
    }
    Ok(Value::Record(fields))
}

/// Iterate the items of an array or map, block by block
fn read_blocks<F>(cursor: &mut ByteCursor<'_>, items: &SchemaNode, path: &str, mut each: F) -> CodecResult<()>
where
    F: FnMut(&mut ByteCursor<'_>, usize) -> CodecResult<()>,
{
    let zero_width = min_width(items) == 0;
    let mut index = 0;
    loop {
        let count = block_count(cursor, items, path)?;
        if count == 0 {
            return Ok(());
        }
        // the per-block cap alone lets chained blocks grow without bound
        if zero_width && index + count > MAX_ZERO_WIDTH_ITEMS {
            return Err(CodecError::decode(
                path,
                format!("more than {} zero-width items across blocks", MAX_ZERO_WIDTH_ITEMS),
            ));
        }
        for _ in 0..count {
            each(cursor, index)?;
            index += 1;
        }
    }
}

/// Read a block header and check the count against the remaining input
fn block_count(cursor: &mut ByteCursor<'_>, items: &SchemaNode, path: &str) -> CodecResult<usize> {
    let mut count = cursor.read_long(path)?;
    if count < 0 {
        count = count
            .checked_neg()
            .ok_or_else(|| CodecError::decode(path, "block count overflow"))?;
        // byte size of the block, unused when reading item by item
        cursor.read_long(path)?;
    }

    let count = usize::try_from(count).map_err(|_| CodecError::decode(path, "block count overflow"))?;
    let width = min_width(items);
    let fits = if width == 0 {
        count <= MAX_ZERO_WIDTH_ITEMS
    } else {
        count.checked_mul(width).is_some_and(|needed| needed <= cursor.remaining())
    };
    if !fits {
        return Err(CodecError::decode(
            path,
            format!("block count {} exceeds remaining {} bytes", count, cursor.remaining()),
        ));
    }
    Ok(count)
}

/// Fewest bytes one value of this schema can occupy
fn min_width(schema: &SchemaNode) -> usize {
    match schema.physical() {
        SchemaNode::Null => 0,
        SchemaNode::Float => 4,
        SchemaNode::Double => 8,
        SchemaNode::Fixed(f) => f.size,
        SchemaNode::Record(r) => r.fields.iter().map(|f| min_width(&f.schema)).sum(),
        _ => 1,
    }
}

/// Consume a value without materializing it
fn skip(cursor: &mut ByteCursor<'_>, schema: &SchemaNode, path: &str) -> CodecResult<()> {
    match schema.physical() {
        SchemaNode::Null => {}
        SchemaNode::Boolean => {
            cursor.read_bool(path)?;
        }
        SchemaNode::Int | SchemaNode::Long | SchemaNode::Enum(_) => {
            cursor.read_long(path)?;
        }
        SchemaNode::Float => {
            cursor.read_exact(4, path)?;
        }
        SchemaNode::Double => {
            cursor.read_exact(8, path)?;
        }
        SchemaNode::Bytes | SchemaNode::String => {
            cursor.read_bytes(path)?;
        }
        SchemaNode::Fixed(f) => {
            cursor.read_exact(f.size, path)?;
        }
        SchemaNode::Record(r) => {
            for field in &r.fields {
                skip(cursor, &field.schema, &make_path(path, &field.name))?;
            }
        }
        SchemaNode::Array(items) => read_blocks(cursor, items, path, |cursor, _| skip(cursor, items, path))?,
        SchemaNode::Map(values) => read_blocks(cursor, values, path, |cursor, _| {
            cursor.read_bytes(path)?;
            skip(cursor, values, path)
        })?,
        SchemaNode::Union(branches) => {
            let index = cursor.read_long(path)?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| branches.get(i))
                .ok_or_else(|| CodecError::decode(path, format!("union index {} out of range", index)))?;
            skip(cursor, branch, path)?;
        }
        SchemaNode::Logical(_, inner) => skip(cursor, inner, path)?,
    }
    Ok(())
}

fn apply_logical(value: Value, logical: LogicalType, path: &str) -> CodecResult<Value> {
    let converted = match (logical, value) {
        (LogicalType::Date, Value::Int(days)) => days
            .checked_add(EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date)
            .ok_or_else(|| CodecError::decode(path, format!("date {} days out of range", days)))?,
        (LogicalType::TimeMicros, Value::Long(micros)) => {
            if !(0..MICROS_PER_DAY).contains(&micros) {
                return Err(CodecError::decode(path, format!("time-micros {} out of range", micros)));
            }
            let secs = (micros / 1_000_000) as u32;
            let nanos = ((micros % 1_000_000) * 1_000) as u32;
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .map(Value::TimeMicros)
                .ok_or_else(|| CodecError::decode(path, format!("time-micros {} out of range", micros)))?
        }
        (LogicalType::TimestampMicros, Value::Long(micros)) => DateTime::from_timestamp_micros(micros)
            .map(Value::TimestampMicros)
            .ok_or_else(|| CodecError::decode(path, format!("timestamp-micros {} out of range", micros)))?,
        (LogicalType::Uuid, Value::String(text)) => uuid::Uuid::parse_str(&text)
            .map(Value::Uuid)
            .map_err(|e| CodecError::decode(path, format!("invalid uuid '{}': {}", text, e)))?,
        (LogicalType::Decimal { scale, .. }, Value::Bytes(bytes) | Value::Fixed(bytes)) => {
            Decimal::from_be_bytes(&bytes, scale)
                .map(Value::Decimal)
                .ok_or_else(|| CodecError::decode(path, "decimal wider than 128 bits"))?
        }
        // physical value the logical type does not apply to; leave as read
        (_, value) => value,
    };
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::schema::{EnumSchema, FieldNode, Name};

    fn record(name: &str, fields: Vec<FieldNode>) -> SchemaNode {
        SchemaNode::Record(RecordSchema {
            name: Name::new(name),
            doc: None,
            aliases: Vec::new(),
            fields,
        })
    }

    #[test]
    fn test_roundtrip_consumes_exactly() {
        let schema = record(
            "Request",
            vec![
                FieldNode::new("A", SchemaNode::String),
                FieldNode::new("B", SchemaNode::Long),
            ],
        );
        let value = Value::record([("A", Value::from("ayy")), ("B", Value::Long(1337))]);
        let mut bytes = encode(&value, &schema).unwrap();
        let len = bytes.len();
        bytes.push(0xaa);
        let (decoded, consumed) = decode(&bytes, &schema).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, len);
    }

    #[test]
    fn test_union_index_out_of_range() {
        let schema = SchemaNode::optional(SchemaNode::Long);
        // index 2 zigzagged
        let err = decode(&[0x04, 0x02], &schema).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
        let err = decode(&[0x01], &schema).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }

    #[test]
    fn test_union_reader_branch_by_type() {
        let writer = SchemaNode::Union(vec![SchemaNode::Null, SchemaNode::String]);
        let reader = SchemaNode::Union(vec![SchemaNode::Long, SchemaNode::String, SchemaNode::Null]);
        let bytes = encode(&Value::from("x"), &writer).unwrap();
        let (value, _) = decode_with_reader(&bytes, &writer, &reader).unwrap();
        assert_eq!(value, Value::from("x"));
    }

    #[test]
    fn test_union_without_compatible_branch() {
        let writer = SchemaNode::Union(vec![SchemaNode::Null, SchemaNode::String]);
        let reader = SchemaNode::Union(vec![SchemaNode::Null, SchemaNode::Long]);
        let bytes = encode(&Value::from("x"), &writer).unwrap();
        let err = decode_with_reader(&bytes, &writer, &reader).unwrap_err();
        assert!(matches!(err, CodecError::IncompatibleUnion { .. }));
    }

    #[test]
    fn test_promotions() {
        let bytes = encode(&Value::Int(7), &SchemaNode::Int).unwrap();
        let (value, _) = decode_with_reader(&bytes, &SchemaNode::Int, &SchemaNode::Double).unwrap();
        assert_eq!(value, Value::Double(7.0));

        let bytes = encode(&Value::from("hi"), &SchemaNode::String).unwrap();
        let (value, _) = decode_with_reader(&bytes, &SchemaNode::String, &SchemaNode::Bytes).unwrap();
        assert_eq!(value, Value::Bytes(b"hi".to_vec()));
    }

    #[test]
    fn test_non_union_mismatch_is_incompatible_schema() {
        let bytes = encode(&Value::Long(7), &SchemaNode::Long).unwrap();
        let err = decode_with_reader(&bytes, &SchemaNode::Long, &SchemaNode::Int).unwrap_err();
        assert!(matches!(err, CodecError::IncompatibleSchema { .. }));
    }

    #[test]
    fn test_record_names_must_match() {
        let writer = record("A", vec![]);
        let reader = record("B", vec![]);
        let err = decode_with_reader(&[], &writer, &reader).unwrap_err();
        assert!(matches!(err, CodecError::IncompatibleSchema { .. }));
    }

    #[test]
    fn test_writer_only_field_skipped() {
        let writer = record(
            "R",
            vec![
                FieldNode::new("A", SchemaNode::String),
                FieldNode::new("X", SchemaNode::Array(Box::new(SchemaNode::String))),
                FieldNode::new("B", SchemaNode::Long),
            ],
        );
        let reader = record(
            "R",
            vec![FieldNode::new("B", SchemaNode::Long), FieldNode::new("A", SchemaNode::String)],
        );
        let value = Value::record([
            ("A", Value::from("a")),
            ("X", Value::from(vec!["p".to_string(), "q".to_string()])),
            ("B", Value::Long(5)),
        ]);
        let bytes = encode(&value, &writer).unwrap();
        let (decoded, consumed) = decode_with_reader(&bytes, &writer, &reader).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, Value::record([("B", Value::Long(5)), ("A", Value::from("a"))]));
    }

    #[test]
    fn test_reader_only_field_defaults() {
        let writer = record("R", vec![FieldNode::new("A", SchemaNode::String)]);
        let reader = record(
            "R",
            vec![
                FieldNode::new("A", SchemaNode::String),
                FieldNode::new("B", SchemaNode::Long).with_default(Value::Long(2)),
                FieldNode::new("C", SchemaNode::optional(SchemaNode::Long)),
            ],
        );
        let bytes = encode(&Value::record([("A", Value::from("a"))]), &writer).unwrap();
        let (decoded, _) = decode_with_reader(&bytes, &writer, &reader).unwrap();
        assert_eq!(decoded.field("B"), Some(&Value::Long(2)));
        assert_eq!(decoded.field("C"), Some(&Value::Null));

        let strict = record(
            "R",
            vec![FieldNode::new("A", SchemaNode::String), FieldNode::new("D", SchemaNode::Long)],
        );
        let err = decode_with_reader(&bytes, &writer, &strict).unwrap_err();
        assert!(matches!(err, CodecError::MissingDefault { ref field, .. } if field == "D"));
    }

    #[test]
    fn test_field_alias_matches_writer_name() {
        let writer = record("R", vec![FieldNode::new("old", SchemaNode::Long)]);
        let mut renamed = FieldNode::new("new", SchemaNode::Long);
        renamed.aliases.push("old".into());
        let reader = record("R", vec![renamed]);
        let bytes = encode(&Value::record([("old", Value::Long(9))]), &writer).unwrap();
        let (decoded, _) = decode_with_reader(&bytes, &writer, &reader).unwrap();
        assert_eq!(decoded.field("new"), Some(&Value::Long(9)));
    }

    #[test]
    fn test_negative_block_count_tolerated() {
        let schema = SchemaNode::Array(Box::new(SchemaNode::Long));
        // count -2, byte size 2, items 1 and 2, terminator
        let bytes = [0x03, 0x04, 0x02, 0x04, 0x00];
        let (value, consumed) = decode(&bytes, &schema).unwrap();
        assert_eq!(value, Value::from(vec![1i64, 2]));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_huge_block_count_rejected() {
        let schema = SchemaNode::Array(Box::new(SchemaNode::Long));
        let mut bytes = Vec::new();
        crate::codec::binary::write_long(&mut bytes, 1 << 40);
        let err = decode(&bytes, &schema).unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));

        let nulls = SchemaNode::Array(Box::new(SchemaNode::Null));
        let mut bytes = Vec::new();
        crate::codec::binary::write_long(&mut bytes, (MAX_ZERO_WIDTH_ITEMS + 1) as i64);
        assert!(decode(&bytes, &nulls).is_err());
    }

    #[test]
    fn test_zero_width_items_capped_across_blocks() {
        let nulls = SchemaNode::Array(Box::new(SchemaNode::Null));
        let half = (MAX_ZERO_WIDTH_ITEMS / 2 + 1) as i64;
        let mut bytes = Vec::new();
        for _ in 0..8 {
            crate::codec::binary::write_long(&mut bytes, half);
        }
        bytes.push(0x00);
        let err = decode(&bytes, &nulls).unwrap_err();
        assert!(matches!(err, CodecError::Decode { ref reason, .. } if reason.contains("across blocks")));

        // small chained blocks stay fine
        let (value, _) = decode(&[0x06, 0x06, 0x00], &nulls).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Null; 6]));
    }

    #[test]
    fn test_check_resolution() {
        let v1 = record("User", vec![FieldNode::new("id", SchemaNode::Int)]);
        let v2 = record(
            "User",
            vec![
                FieldNode::new("id", SchemaNode::Long),
                FieldNode::new("email", SchemaNode::optional(SchemaNode::String)),
            ],
        );
        assert!(check_resolution(&v1, &v2).is_ok());
        assert!(check_resolution(&v2, &v1).is_err());

        let strict = record(
            "User",
            vec![FieldNode::new("id", SchemaNode::Long), FieldNode::new("age", SchemaNode::Int)],
        );
        let err = check_resolution(&v1, &strict).unwrap_err();
        assert!(matches!(err, CodecError::MissingDefault { ref field, .. } if field == "age"));

        let other = record("Account", vec![FieldNode::new("id", SchemaNode::Long)]);
        assert!(matches!(check_resolution(&v1, &other), Err(CodecError::IncompatibleSchema { .. })));
    }

    #[test]
    fn test_enum_index_out_of_range() {
        let schema = SchemaNode::Enum(EnumSchema {
            name: Name::new("E"),
            doc: None,
            aliases: Vec::new(),
            symbols: vec!["A".into()],
        });
        assert!(matches!(decode(&[0x02], &schema), Err(CodecError::Decode { .. })));
    }

    #[test]
    fn test_logical_applied_from_reader() {
        let ts = SchemaNode::timestamp_micros();
        let (value, _) = decode_with_reader(&[0x02], &SchemaNode::Long, &ts).unwrap();
        assert_eq!(value, Value::TimestampMicros(DateTime::from_timestamp_micros(1).unwrap()));

        // writer logical, reader plain long
        let (value, _) = decode_with_reader(&[0x02], &ts, &SchemaNode::Long).unwrap();
        assert_eq!(value, Value::Long(1));
    }

    #[test]
    fn test_time_micros_out_of_range() {
        let time = SchemaNode::Logical(LogicalType::TimeMicros, Box::new(SchemaNode::Long));
        let mut bytes = Vec::new();
        crate::codec::binary::write_long(&mut bytes, MICROS_PER_DAY);
        assert!(decode(&bytes, &time).is_err());
    }
}
