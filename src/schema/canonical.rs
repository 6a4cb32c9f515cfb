//! Schema text: canonical form and full JSON form
//!
//! The canonical form is Avro Parsing Canonical Form:
//! - primitives are bare strings (`"long"`)
//! - only `name`, `type`, `fields`, `symbols`, `items`, `values`, `size` are
//!   kept, in that order
//! - names are full names; `namespace`, `doc`, `aliases`, `default` and
//!   logical type attributes are dropped
//! - no whitespace
//! - a named type seen a second time is written as its full name
//!
//! The full form keeps everything needed to rebuild the tree with
//! [`parse_schema`](super::parse_schema).

use std::collections::HashSet;

use serde_json::{json, Map, Value as Json};

use super::errors::{SchemaError, SchemaResult};
use super::types::{LogicalType, SchemaNode};
use crate::codec::{to_json, JsonStyle};

/// Canonical text of a schema; the fingerprint input
pub fn canonical_form(schema: &SchemaNode) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    write_canonical(&mut out, schema, &mut seen);
    out
}

fn quote(out: &mut String, text: &str) {
    // serde_json escaping matches JSON string rules
    out.push_str(&Json::String(text.to_string()).to_string());
}

fn write_canonical(out: &mut String, schema: &SchemaNode, seen: &mut HashSet<String>) {
    match schema {
        SchemaNode::Logical(_, physical) => write_canonical(out, physical, seen),
        SchemaNode::Union(branches) => {
            out.push('[');
            for (i, branch) in branches.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, branch, seen);
            }
            out.push(']');
        }
        SchemaNode::Array(items) => {
            out.push_str(r#"{"type":"array","items":"#);
            write_canonical(out, items, seen);
            out.push('}');
        }
        SchemaNode::Map(values) => {
            out.push_str(r#"{"type":"map","values":"#);
            write_canonical(out, values, seen);
            out.push('}');
        }
        SchemaNode::Record(record) => {
            let fullname = record.name.fullname();
            if !seen.insert(fullname.clone()) {
                quote(out, &fullname);
                return;
            }
            out.push_str(r#"{"name":"#);
            quote(out, &fullname);
            out.push_str(r#","type":"record","fields":["#);
            for (i, field) in record.fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(r#"{"name":"#);
                quote(out, &field.name);
                out.push_str(r#","type":"#);
                write_canonical(out, &field.schema, seen);
                out.push('}');
            }
            out.push_str("]}");
        }
        SchemaNode::Enum(e) => {
            let fullname = e.name.fullname();
            if !seen.insert(fullname.clone()) {
                quote(out, &fullname);
                return;
            }
            out.push_str(r#"{"name":"#);
            quote(out, &fullname);
            out.push_str(r#","type":"enum","symbols":["#);
            for (i, symbol) in e.symbols.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                quote(out, symbol);
            }
            out.push_str("]}");
        }
        SchemaNode::Fixed(f) => {
            let fullname = f.name.fullname();
            if !seen.insert(fullname.clone()) {
                quote(out, &fullname);
                return;
            }
            out.push_str(r#"{"name":"#);
            quote(out, &fullname);
            out.push_str(&format!(r#","type":"fixed","size":{}}}"#, f.size));
        }
        primitive => quote(out, primitive.type_name()),
    }
}

impl SchemaNode {
    /// Canonical text of this schema
    pub fn canonical_form(&self) -> String {
        canonical_form(self)
    }

    /// Full JSON form, including namespaces, docs, aliases, defaults and
    /// logical types.
    ///
    /// Fails when a field default does not convert to JSON under its field
    /// schema; the default is never dropped from the text.
    pub fn to_json(&self) -> SchemaResult<Json> {
        let mut seen = HashSet::new();
        full_json(self, &mut seen)
    }
}

fn full_json(schema: &SchemaNode, seen: &mut HashSet<String>) -> SchemaResult<Json> {
    if let Some(name) = schema.name().filter(|_| schema.logical().is_none()) {
        let fullname = name.fullname();
        if seen.contains(&fullname) {
            return Ok(Json::String(fullname));
        }
    }

    let json = match schema {
        SchemaNode::Logical(logical, physical) => {
            let mut object = match full_json(physical, seen)? {
                Json::Object(object) => object,
                primitive => {
                    let mut object = Map::new();
                    object.insert("type".into(), primitive);
                    object
                }
            };
            object.insert("logicalType".into(), json!(logical.as_str()));
            if let LogicalType::Decimal { precision, scale } = logical {
                object.insert("precision".into(), json!(precision));
                object.insert("scale".into(), json!(scale));
            }
            Json::Object(object)
        }
        SchemaNode::Union(branches) => Json::Array(
            branches
                .iter()
                .map(|b| full_json(b, seen))
                .collect::<SchemaResult<_>>()?,
        ),
        SchemaNode::Array(items) => json!({"type": "array", "items": full_json(items, seen)?}),
        SchemaNode::Map(values) => json!({"type": "map", "values": full_json(values, seen)?}),
        SchemaNode::Record(record) => {
            seen.insert(record.name.fullname());
            let mut object = named_object("record", &record.name);
            if let Some(doc) = &record.doc {
                object.insert("doc".into(), json!(doc));
            }
            if !record.aliases.is_empty() {
                object.insert("aliases".into(), json!(record.aliases));
            }
            let mut fields = Vec::with_capacity(record.fields.len());
            for field in &record.fields {
                let mut entry = Map::new();
                entry.insert("name".into(), json!(field.name));
                entry.insert("type".into(), full_json(&field.schema, seen)?);
                if let Some(doc) = &field.doc {
                    entry.insert("doc".into(), json!(doc));
                }
                if !field.aliases.is_empty() {
                    entry.insert("aliases".into(), json!(field.aliases));
                }
                if let Some(default) = &field.default {
                    let json = default_json(default, &field.schema).map_err(|e| SchemaError::InvalidDefault {
                        field: field.name.clone(),
                        reason: e.to_string(),
                    })?;
                    entry.insert("default".into(), json);
                }
                fields.push(Json::Object(entry));
            }
            object.insert("fields".into(), Json::Array(fields));
            Json::Object(object)
        }
        SchemaNode::Enum(e) => {
            seen.insert(e.name.fullname());
            let mut object = named_object("enum", &e.name);
            if let Some(doc) = &e.doc {
                object.insert("doc".into(), json!(doc));
            }
            if !e.aliases.is_empty() {
                object.insert("aliases".into(), json!(e.aliases));
            }
            object.insert("symbols".into(), json!(e.symbols));
            Json::Object(object)
        }
        SchemaNode::Fixed(f) => {
            seen.insert(f.name.fullname());
            let mut object = named_object("fixed", &f.name);
            if !f.aliases.is_empty() {
                object.insert("aliases".into(), json!(f.aliases));
            }
            object.insert("size".into(), json!(f.size));
            Json::Object(object)
        }
        primitive => json!(primitive.type_name()),
    };
    Ok(json)
}

fn named_object(kind: &str, name: &super::types::Name) -> Map<String, Json> {
    let mut object = Map::new();
    object.insert("type".into(), json!(kind));
    object.insert("name".into(), json!(name.name));
    if let Some(ns) = &name.namespace {
        object.insert("namespace".into(), json!(ns));
    }
    object
}

/// A union default is written against its first branch
fn default_json(value: &crate::codec::Value, schema: &SchemaNode) -> crate::codec::CodecResult<Json> {
    match schema {
        SchemaNode::Union(branches) if !branches.is_empty() => to_json(value, &branches[0], JsonStyle::Avro),
        _ => to_json(value, schema, JsonStyle::Avro),
    }
}
