//! Schema text parser
//!
//! Reads JSON schema text, in full or canonical form, back into a
//! [`SchemaNode`] tree. A reference to an already defined named type is
//! replaced by a copy of its definition. Recursive schemas cannot be
//! expressed as a tree and are rejected.
//!
//! Unknown logical types, and logical types on a physical type they do not
//! apply to, are ignored and the physical type is kept.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value as Json};

use super::errors::{SchemaError, SchemaResult};
use super::mapper::{check_branches, validate_name, validate_namespace};
use super::types::{EnumSchema, FieldNode, FixedSchema, LogicalType, Name, RecordSchema, SchemaNode};
use crate::codec::{encode, from_json, JsonStyle, Value};

/// Parse schema text
pub fn parse_schema(text: &str) -> SchemaResult<SchemaNode> {
    let json: Json = serde_json::from_str(text)?;
    parse_schema_json(&json)
}

/// Parse an already decoded JSON schema
pub fn parse_schema_json(json: &Json) -> SchemaResult<SchemaNode> {
    SchemaParser::default().parse(json, None)
}

#[derive(Default)]
struct SchemaParser {
    names: HashMap<String, SchemaNode>,
    defining: HashSet<String>,
}

impl SchemaParser {
    fn parse(&mut self, json: &Json, namespace: Option<&str>) -> SchemaResult<SchemaNode> {
        match json {
            Json::String(name) => self.parse_reference(name, namespace),
            Json::Array(branches) => {
                let mut nodes = Vec::with_capacity(branches.len());
                for branch in branches {
                    match self.parse(branch, namespace)? {
                        SchemaNode::Union(_) => {
                            return Err(SchemaError::unsupported("union", "unions may not contain unions"));
                        }
                        node => nodes.push(node),
                    }
                }
                if nodes.is_empty() {
                    return Err(SchemaError::unsupported("union", "empty union"));
                }
                check_branches(&nodes, "union")?;
                Ok(SchemaNode::Union(nodes))
            }
            Json::Object(object) => self.parse_object(object, namespace),
            other => Err(SchemaError::parse(format!("unexpected schema value {}", other))),
        }
    }

    fn parse_reference(&mut self, name: &str, namespace: Option<&str>) -> SchemaResult<SchemaNode> {
        if let Some(node) = primitive(name) {
            return Ok(node);
        }

        let qualified = match namespace {
            Some(ns) if !name.contains('.') => format!("{}.{}", ns, name),
            _ => name.to_string(),
        };
        for candidate in [qualified.as_str(), name] {
            if self.defining.contains(candidate) {
                return Err(SchemaError::unsupported(candidate, "recursive schemas are not supported"));
            }
            if let Some(node) = self.names.get(candidate) {
                return Ok(node.clone());
            }
        }
        Err(SchemaError::parse(format!("unknown type '{}'", name)))
    }

    fn parse_object(&mut self, object: &Map<String, Json>, namespace: Option<&str>) -> SchemaResult<SchemaNode> {
        let kind = object
            .get("type")
            .ok_or_else(|| SchemaError::parse("schema object without 'type'"))?;

        let physical = match kind {
            Json::String(kind) => match kind.as_str() {
                "record" | "error" => self.parse_record(object, namespace)?,
                "enum" => self.parse_enum(object, namespace)?,
                "fixed" => self.parse_fixed(object, namespace)?,
                "array" => {
                    let items = object
                        .get("items")
                        .ok_or_else(|| SchemaError::parse("array without 'items'"))?;
                    SchemaNode::Array(Box::new(self.parse(items, namespace)?))
                }
                "map" => {
                    let values = object
                        .get("values")
                        .ok_or_else(|| SchemaError::parse("map without 'values'"))?;
                    SchemaNode::Map(Box::new(self.parse(values, namespace)?))
                }
                other => self.parse_reference(other, namespace)?,
            },
            nested => self.parse(nested, namespace)?,
        };

        Ok(match object.get("logicalType").and_then(Json::as_str) {
            Some(logical) => apply_logical(physical, logical, object),
            None => physical,
        })
    }

    fn parse_name(&self, object: &Map<String, Json>, namespace: Option<&str>) -> SchemaResult<Name> {
        let raw = str_attr(object, "name")?.ok_or_else(|| SchemaError::parse("named type without 'name'"))?;

        let (ns, name) = match raw.rsplit_once('.') {
            Some((ns, name)) => (Some(ns.to_string()), name.to_string()),
            None => {
                let ns = match str_attr(object, "namespace")? {
                    Some(ns) => Some(ns.to_string()),
                    None => namespace.map(String::from),
                };
                (ns, raw.to_string())
            }
        };

        validate_name(&name)?;
        let name = Name::with_namespace(name, ns);
        if let Some(ns) = &name.namespace {
            validate_namespace(ns, None)?;
        }

        let fullname = name.fullname();
        if self.names.contains_key(&fullname) || self.defining.contains(&fullname) {
            return Err(SchemaError::ConflictingDefinition { name: fullname });
        }
        Ok(name)
    }

    fn parse_record(&mut self, object: &Map<String, Json>, namespace: Option<&str>) -> SchemaResult<SchemaNode> {
        let name = self.parse_name(object, namespace)?;
        let fullname = name.fullname();
        let inner_ns = name.namespace.clone();

        let fields_json = object
            .get("fields")
            .and_then(Json::as_array)
            .ok_or_else(|| SchemaError::parse(format!("record '{}' without 'fields' array", fullname)))?;

        self.defining.insert(fullname.clone());
        let fields = self.parse_fields(fields_json, &fullname, inner_ns.as_deref());
        self.defining.remove(&fullname);

        let node = SchemaNode::Record(RecordSchema {
            name,
            doc: str_attr(object, "doc")?.map(String::from),
            aliases: aliases(object)?,
            fields: fields?,
        });
        self.names.insert(fullname, node.clone());
        Ok(node)
    }

    fn parse_fields(&mut self, fields_json: &[Json], record: &str, namespace: Option<&str>) -> SchemaResult<Vec<FieldNode>> {
        let mut fields: Vec<FieldNode> = Vec::with_capacity(fields_json.len());
        for field in fields_json {
            let field = field
                .as_object()
                .ok_or_else(|| SchemaError::parse(format!("field of '{}' is not an object", record)))?;
            let name = str_attr(field, "name")?
                .ok_or_else(|| SchemaError::parse(format!("field of '{}' without 'name'", record)))?;
            validate_name(name)?;
            if fields.iter().any(|f| f.name == name) {
                return Err(SchemaError::DuplicateField {
                    record: record.to_string(),
                    field: name.to_string(),
                });
            }

            let schema_json = field
                .get("type")
                .ok_or_else(|| SchemaError::parse(format!("field '{}' without 'type'", name)))?;
            let schema = self.parse(schema_json, namespace)?;

            let default = match field.get("default") {
                Some(json) => Some(parse_default(name, json, &schema)?),
                None => None,
            };

            fields.push(FieldNode {
                name: name.to_string(),
                schema,
                default,
                doc: str_attr(field, "doc")?.map(String::from),
                aliases: aliases(field)?,
            });
        }
        Ok(fields)
    }

    fn parse_enum(&mut self, object: &Map<String, Json>, namespace: Option<&str>) -> SchemaResult<SchemaNode> {
        let name = self.parse_name(object, namespace)?;
        let symbols_json = object
            .get("symbols")
            .and_then(Json::as_array)
            .ok_or_else(|| SchemaError::parse(format!("enum '{}' without 'symbols' array", name.fullname())))?;

        let mut symbols: Vec<String> = Vec::with_capacity(symbols_json.len());
        for symbol in symbols_json {
            let symbol = symbol
                .as_str()
                .ok_or_else(|| SchemaError::parse("enum symbols must be strings"))?;
            validate_name(symbol)?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(SchemaError::DuplicateSymbol {
                    name: name.fullname(),
                    symbol: symbol.to_string(),
                });
            }
            symbols.push(symbol.to_string());
        }

        let node = SchemaNode::Enum(EnumSchema {
            name,
            doc: str_attr(object, "doc")?.map(String::from),
            aliases: aliases(object)?,
            symbols,
        });
        self.register(node)
    }

    fn parse_fixed(&mut self, object: &Map<String, Json>, namespace: Option<&str>) -> SchemaResult<SchemaNode> {
        let name = self.parse_name(object, namespace)?;
        let size = object
            .get("size")
            .and_then(Json::as_u64)
            .ok_or_else(|| SchemaError::parse(format!("fixed '{}' without integer 'size'", name.fullname())))?;

        let node = SchemaNode::Fixed(FixedSchema {
            name,
            aliases: aliases(object)?,
            size: size as usize,
        });
        self.register(node)
    }

    fn register(&mut self, node: SchemaNode) -> SchemaResult<SchemaNode> {
        if let Some(name) = node.name() {
            self.names.insert(name.fullname(), node.clone());
        }
        Ok(node)
    }
}

fn primitive(name: &str) -> Option<SchemaNode> {
    let node = match name {
        "null" => SchemaNode::Null,
        "boolean" => SchemaNode::Boolean,
        "int" => SchemaNode::Int,
        "long" => SchemaNode::Long,
        "float" => SchemaNode::Float,
        "double" => SchemaNode::Double,
        "bytes" => SchemaNode::Bytes,
        "string" => SchemaNode::String,
        _ => return None,
    };
    Some(node)
}

fn apply_logical(physical: SchemaNode, logical: &str, object: &Map<String, Json>) -> SchemaNode {
    let logical = match logical {
        "date" => LogicalType::Date,
        "time-micros" => LogicalType::TimeMicros,
        "timestamp-micros" => LogicalType::TimestampMicros,
        "uuid" => LogicalType::Uuid,
        "decimal" => {
            let precision = object.get("precision").and_then(Json::as_u64);
            let scale = object.get("scale").and_then(Json::as_u64).unwrap_or(0);
            match precision {
                Some(p) if p > 0 && p <= 38 && scale <= p => LogicalType::Decimal {
                    precision: p as u32,
                    scale: scale as u32,
                },
                _ => return physical,
            }
        }
        _ => return physical,
    };

    if logical.applies_to(&physical) {
        SchemaNode::Logical(logical, Box::new(physical))
    } else {
        physical
    }
}

/// A default is read against the first branch of a union, then checked by
/// encoding it with the field schema
fn parse_default(field: &str, json: &Json, schema: &SchemaNode) -> SchemaResult<Value> {
    let target = match schema {
        SchemaNode::Union(branches) => &branches[0],
        other => other,
    };
    let invalid = |reason: String| SchemaError::InvalidDefault {
        field: field.to_string(),
        reason,
    };
    let value = from_json(json, target, JsonStyle::Avro).map_err(|e| invalid(e.to_string()))?;
    encode(&value, schema).map_err(|e| invalid(e.to_string()))?;
    Ok(value)
}

fn str_attr<'a>(object: &'a Map<String, Json>, key: &str) -> SchemaResult<Option<&'a str>> {
    match object.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(SchemaError::parse(format!("'{}' must be a string, found {}", key, other))),
    }
}

fn aliases(object: &Map<String, Json>) -> SchemaResult<Vec<String>> {
    match object.get("aliases") {
        None => Ok(Vec::new()),
        Some(Json::Array(items)) => items
            .iter()
            .map(|a| {
                a.as_str()
                    .map(String::from)
                    .ok_or_else(|| SchemaError::parse("aliases must be strings"))
            })
            .collect(),
        Some(other) => Err(SchemaError::parse(format!("'aliases' must be an array, found {}", other))),
    }
}
