//! Type mapper: record type definitions to schema trees
//!
//! Derivation is an explicit, ahead-of-time pass over a [`RecordDef`].
//! Mapping rules are fixed because both sides of the wire depend on them:
//!
//! - text -> `string`, boolean -> `boolean`, raw bytes -> `bytes`
//! - signed integers of at most 32 bits -> `int`, wider or unbounded -> `long`
//! - single precision -> `float`, double precision -> `double`
//! - timestamp -> `long` + `timestamp-micros`
//! - optional `T` -> `[null, T]`, null always first
//! - sequence of `T` -> `array`, text-keyed mapping -> `map`
//! - nested record definitions -> named `record`

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::canonical::canonical_form;
use super::errors::{SchemaError, SchemaResult};
use super::types::{EnumSchema, FieldNode, FixedSchema, LogicalType, Name, RecordSchema, SchemaNode};
use crate::codec::{encode, Value};

/// Declared type of a field, as supplied by the surrounding type system
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Null,
    Text,
    Boolean,
    /// Signed integer; `None` bits means unbounded
    Integer { bits: Option<u32> },
    Float32,
    Float64,
    Bytes,
    /// Byte string of exactly this many bytes
    FixedBytes(usize),
    Timestamp,
    Date,
    Time,
    Uuid,
    /// Fixed-point decimal; both attributes are required for a mapping
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Enum(EnumDef),
    Record(RecordDef),
    Sequence(Box<TypeDef>),
    Mapping {
        key: Box<TypeDef>,
        value: Box<TypeDef>,
    },
    /// Alternatives in declaration order
    Union(Vec<TypeDef>),
    /// A type the type system knows but no rule maps
    Opaque(String),
}

impl TypeDef {
    pub fn integer(bits: u32) -> Self {
        TypeDef::Integer { bits: Some(bits) }
    }

    pub fn sequence(item: TypeDef) -> Self {
        TypeDef::Sequence(Box::new(item))
    }

    pub fn mapping(key: TypeDef, value: TypeDef) -> Self {
        TypeDef::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        TypeDef::Decimal {
            precision: Some(precision),
            scale: Some(scale),
        }
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDef,
    pub optional: bool,
    pub default: Option<Value>,
}

impl FieldDef {
    /// A required field without default
    pub fn required(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            default: None,
        }
    }

    /// An optional field; absent values encode as null
    pub fn optional(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
            default: None,
        }
    }

    /// Attach a default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A structured record type definition
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDef {
    pub name: String,
    pub namespace: Option<String>,
    pub doc: Option<String>,
    pub fields: Vec<FieldDef>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            doc: None,
            fields,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// An enumeration type definition
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub namespace: Option<String>,
    pub symbols: Vec<String>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            namespace: None,
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }
}

/// Derive the record schema for a type definition.
///
/// A root record without a namespace takes its own name as namespace, so
/// `Request` derives the fullname `Request.Request`. Nested definitions
/// inherit it.
pub fn derive_schema(def: &RecordDef) -> SchemaResult<SchemaNode> {
    let mut mapper = TypeMapper::new();
    if def.namespace.is_none() {
        mapper.namespace = Some(def.name.clone());
    }
    mapper.map_record(def, &def.name)
}

fn name_format() -> &'static Regex {
    static FORMAT: OnceLock<Regex> = OnceLock::new();
    FORMAT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// Validate a simple name
pub fn validate_name(name: &str) -> SchemaResult<()> {
    if name_format().is_match(name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidName { name: name.into() })
    }
}

/// Validate a namespace, and that it extends the enclosing one
pub fn validate_namespace(namespace: &str, parent: Option<&str>) -> SchemaResult<()> {
    if !namespace.split('.').all(|part| name_format().is_match(part)) {
        return Err(SchemaError::InvalidNamespace {
            namespace: namespace.into(),
            reason: "a namespace is a dot-separated sequence of names".into(),
        });
    }

    if let Some(parent) = parent.filter(|p| !p.is_empty() && *p != namespace) {
        let extends = namespace.len() > parent.len()
            && namespace.starts_with(parent)
            && namespace.as_bytes()[parent.len()] == b'.';
        if !extends {
            return Err(SchemaError::InvalidNamespace {
                namespace: namespace.into(),
                reason: format!("the enclosing namespace '{}' must be a subpath", parent),
            });
        }
    }

    Ok(())
}

/// Stateful mapper; tracks the enclosing namespace and every named type
/// produced so far so reused names stay self-consistent.
struct TypeMapper {
    namespace: Option<String>,
    named: HashMap<String, SchemaNode>,
}

impl TypeMapper {
    fn new() -> Self {
        Self {
            namespace: None,
            named: HashMap::new(),
        }
    }

    fn map_record(&mut self, def: &RecordDef, path: &str) -> SchemaResult<SchemaNode> {
        validate_name(&def.name)?;

        let parent = self.namespace.clone();
        if let Some(ns) = &def.namespace {
            validate_namespace(ns, parent.as_deref())?;
            self.namespace = Some(ns.clone());
        }
        let name = Name::with_namespace(def.name.clone(), self.namespace.clone());

        let fields = self.map_fields(def, path, &name);
        self.namespace = parent;

        let node = SchemaNode::Record(RecordSchema {
            name,
            doc: def.doc.clone(),
            aliases: Vec::new(),
            fields: fields?,
        });
        self.remember(node)
    }

    fn map_fields(&mut self, def: &RecordDef, path: &str, name: &Name) -> SchemaResult<Vec<FieldNode>> {
        let mut fields: Vec<FieldNode> = Vec::with_capacity(def.fields.len());

        for field in &def.fields {
            validate_name(&field.name)?;
            if fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    record: name.fullname(),
                    field: field.name.clone(),
                });
            }

            let field_path = format!("{}.{}", path, field.name);
            let schema = if field.optional {
                self.map_optional(&field.ty, &field_path)?
            } else {
                self.map_type(&field.ty, &field_path)?
            };

            let default = match &field.default {
                Some(value) => Some(validate_default(&field.name, value, &schema, field.optional)?),
                None => None,
            };

            fields.push(FieldNode {
                name: field.name.clone(),
                schema,
                default,
                doc: None,
                aliases: Vec::new(),
            });
        }

        Ok(fields)
    }

    fn map_optional(&mut self, ty: &TypeDef, path: &str) -> SchemaResult<SchemaNode> {
        let mut branches = vec![SchemaNode::Null];
        match self.map_type(ty, path)? {
            SchemaNode::Null => return Ok(SchemaNode::Null),
            SchemaNode::Union(inner) => {
                branches.extend(inner.into_iter().filter(|b| *b != SchemaNode::Null));
            }
            other => branches.push(other),
        }
        check_branches(&branches, path)?;
        Ok(SchemaNode::Union(branches))
    }

    fn map_type(&mut self, ty: &TypeDef, path: &str) -> SchemaResult<SchemaNode> {
        let node = match ty {
            TypeDef::Null => SchemaNode::Null,
            TypeDef::Text => SchemaNode::String,
            TypeDef::Boolean => SchemaNode::Boolean,
            TypeDef::Integer { bits: Some(0) } => {
                return Err(SchemaError::unsupported(path, "zero-width integer"));
            }
            TypeDef::Integer { bits: Some(bits) } if *bits <= 32 => SchemaNode::Int,
            TypeDef::Integer { .. } => SchemaNode::Long,
            TypeDef::Float32 => SchemaNode::Float,
            TypeDef::Float64 => SchemaNode::Double,
            TypeDef::Bytes => SchemaNode::Bytes,
            TypeDef::FixedBytes(size) => {
                if *size == 0 {
                    return Err(SchemaError::unsupported(path, "fixed byte strings need a non-zero size"));
                }
                self.remember(SchemaNode::Fixed(FixedSchema {
                    name: Name::with_namespace(format!("Bytes_{}", size), self.namespace.clone()),
                    aliases: Vec::new(),
                    size: *size,
                }))?
            }
            TypeDef::Timestamp => SchemaNode::timestamp_micros(),
            TypeDef::Date => SchemaNode::Logical(LogicalType::Date, Box::new(SchemaNode::Int)),
            TypeDef::Time => SchemaNode::Logical(LogicalType::TimeMicros, Box::new(SchemaNode::Long)),
            TypeDef::Uuid => SchemaNode::Logical(LogicalType::Uuid, Box::new(SchemaNode::String)),
            TypeDef::Decimal {
                precision: Some(precision),
                scale: Some(scale),
            } => {
                if *precision == 0 || scale > precision || *precision > 38 {
                    return Err(SchemaError::unsupported(
                        path,
                        format!("decimal({}, {}) is out of range", precision, scale),
                    ));
                }
                SchemaNode::Logical(
                    LogicalType::Decimal {
                        precision: *precision,
                        scale: *scale,
                    },
                    Box::new(SchemaNode::Bytes),
                )
            }
            TypeDef::Decimal { .. } => {
                return Err(SchemaError::unsupported(
                    path,
                    "decimal precision and scale must both be provided",
                ));
            }
            TypeDef::Enum(def) => self.map_enum(def)?,
            TypeDef::Record(def) => self.map_record(def, path)?,
            TypeDef::Sequence(item) => {
                SchemaNode::Array(Box::new(self.map_type(item, &format!("{}[]", path))?))
            }
            TypeDef::Mapping { key, value } => {
                if **key != TypeDef::Text {
                    return Err(SchemaError::unsupported(path, "maps must have string keys"));
                }
                SchemaNode::Map(Box::new(self.map_type(value, &format!("{}{{}}", path))?))
            }
            TypeDef::Union(alternatives) => {
                let mut branches = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    match self.map_type(alternative, path)? {
                        SchemaNode::Union(_) => {
                            return Err(SchemaError::unsupported(path, "unions may not contain unions"));
                        }
                        branch => branches.push(branch),
                    }
                }
                if branches.is_empty() {
                    return Err(SchemaError::unsupported(path, "empty union"));
                }
                check_branches(&branches, path)?;
                SchemaNode::Union(branches)
            }
            TypeDef::Opaque(name) => {
                return Err(SchemaError::unsupported(path, format!("{} missing from conversion map", name)));
            }
        };
        Ok(node)
    }

    fn map_enum(&mut self, def: &EnumDef) -> SchemaResult<SchemaNode> {
        validate_name(&def.name)?;
        if let Some(ns) = &def.namespace {
            validate_namespace(ns, self.namespace.as_deref())?;
        }
        let namespace = def.namespace.clone().or_else(|| self.namespace.clone());

        let mut symbols: Vec<String> = Vec::with_capacity(def.symbols.len());
        for symbol in &def.symbols {
            validate_name(symbol)?;
            if symbols.contains(symbol) {
                return Err(SchemaError::DuplicateSymbol {
                    name: def.name.clone(),
                    symbol: symbol.clone(),
                });
            }
            symbols.push(symbol.clone());
        }

        self.remember(SchemaNode::Enum(EnumSchema {
            name: Name::with_namespace(def.name.clone(), namespace),
            doc: None,
            aliases: Vec::new(),
            symbols,
        }))
    }

    /// Record a named node; a reused name must map to identical content
    fn remember(&mut self, node: SchemaNode) -> SchemaResult<SchemaNode> {
        if let Some(name) = node.name() {
            let fullname = name.fullname();
            match self.named.get(&fullname) {
                Some(existing) if *existing != node => {
                    return Err(SchemaError::ConflictingDefinition { name: fullname });
                }
                Some(_) => {}
                None => {
                    self.named.insert(fullname, node.clone());
                }
            }
        }
        Ok(node)
    }
}

/// No two branches may be structurally identical after canonicalization
pub(crate) fn check_branches(branches: &[SchemaNode], path: &str) -> SchemaResult<()> {
    let mut seen: Vec<String> = Vec::with_capacity(branches.len());
    for branch in branches {
        let canonical = canonical_form(branch);
        if seen.contains(&canonical) {
            return Err(SchemaError::DuplicateBranch {
                path: path.into(),
                branch: canonical,
            });
        }
        seen.push(canonical);
    }
    Ok(())
}

fn validate_default(field: &str, value: &Value, schema: &SchemaNode, optional: bool) -> SchemaResult<Value> {
    if optional && !value.is_null() {
        return Err(SchemaError::InvalidDefault {
            field: field.into(),
            reason: "optional fields may only default to null".into(),
        });
    }
    encode(value, schema).map_err(|e| SchemaError::InvalidDefault {
        field: field.into(),
        reason: e.to_string(),
    })?;
    Ok(value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_def() -> RecordDef {
        RecordDef::new(
            "Request",
            vec![
                FieldDef::required("A", TypeDef::Text),
                FieldDef::required("B", TypeDef::Integer { bits: None }),
                FieldDef::required("C", TypeDef::Timestamp),
            ],
        )
    }

    #[test]
    fn test_primitive_mapping() {
        let def = RecordDef::new(
            "BasicModelBaseTypes",
            vec![
                FieldDef::required("A", TypeDef::Text),
                FieldDef::required("B", TypeDef::integer(64)),
                FieldDef::required("C", TypeDef::Float64),
                FieldDef::required("D", TypeDef::Bytes),
                FieldDef::required("E", TypeDef::Boolean),
                FieldDef::required("F", TypeDef::integer(32)),
                FieldDef::required("G", TypeDef::Float32),
            ],
        );
        let schema = derive_schema(&def).unwrap();
        let record = schema.as_record().unwrap();
        let types: Vec<_> = record.fields.iter().map(|f| f.schema.type_name()).collect();
        assert_eq!(types, vec!["string", "long", "double", "bytes", "boolean", "int", "float"]);
    }

    #[test]
    fn test_integer_width_boundary() {
        let def = RecordDef::new(
            "Widths",
            vec![
                FieldDef::required("a", TypeDef::integer(8)),
                FieldDef::required("b", TypeDef::integer(32)),
                FieldDef::required("c", TypeDef::integer(33)),
            ],
        );
        let schema = derive_schema(&def).unwrap();
        let record = schema.as_record().unwrap();
        assert_eq!(record.fields[0].schema, SchemaNode::Int);
        assert_eq!(record.fields[1].schema, SchemaNode::Int);
        assert_eq!(record.fields[2].schema, SchemaNode::Long);
    }

    #[test]
    fn test_field_order_preserved() {
        let schema = derive_schema(&request_def()).unwrap();
        let names: Vec<_> = schema.as_record().unwrap().fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(schema.as_record().unwrap().fields[2].schema, SchemaNode::timestamp_micros());
    }

    #[test]
    fn test_optional_maps_to_null_first_union() {
        let def = RecordDef::new("Opt", vec![FieldDef::optional("C", TypeDef::Integer { bits: None })]);
        let schema = derive_schema(&def).unwrap();
        assert_eq!(
            schema.as_record().unwrap().fields[0].schema,
            SchemaNode::Union(vec![SchemaNode::Null, SchemaNode::Long])
        );
    }

    #[test]
    fn test_general_union_keeps_declaration_order() {
        let def = RecordDef::new(
            "U",
            vec![FieldDef::required(
                "D",
                TypeDef::Union(vec![TypeDef::Integer { bits: None }, TypeDef::Text]),
            )],
        );
        let schema = derive_schema(&def).unwrap();
        assert_eq!(
            schema.as_record().unwrap().fields[0].schema,
            SchemaNode::Union(vec![SchemaNode::Long, SchemaNode::String])
        );
    }

    #[test]
    fn test_duplicate_union_branch_rejected() {
        let def = RecordDef::new(
            "U",
            vec![FieldDef::required("D", TypeDef::Union(vec![TypeDef::integer(64), TypeDef::Integer { bits: None }]))],
        );
        assert!(matches!(derive_schema(&def), Err(SchemaError::DuplicateBranch { .. })));
    }

    #[test]
    fn test_nested_record_and_collections() {
        let inner = RecordDef::new("Inner", vec![FieldDef::required("x", TypeDef::Text)]);
        let def = RecordDef::new(
            "Outer",
            vec![
                FieldDef::required("inner", TypeDef::Record(inner.clone())),
                FieldDef::required("list", TypeDef::sequence(TypeDef::Integer { bits: None })),
                FieldDef::required("map", TypeDef::mapping(TypeDef::Text, TypeDef::Record(inner))),
            ],
        );
        let schema = derive_schema(&def).unwrap();
        let record = schema.as_record().unwrap();
        assert_eq!(record.fields[0].schema.name().unwrap().fullname(), "Outer.Inner");
        assert_eq!(record.fields[1].schema, SchemaNode::Array(Box::new(SchemaNode::Long)));
        match &record.fields[2].schema {
            SchemaNode::Map(values) => assert_eq!(**values, record.fields[0].schema),
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_record_inherits_namespace() {
        let inner = RecordDef::new("Inner", vec![FieldDef::required("x", TypeDef::Text)]);
        let def = RecordDef::new("Outer", vec![FieldDef::required("inner", TypeDef::Record(inner))])
            .with_namespace("custom");
        let schema = derive_schema(&def).unwrap();
        let inner = &schema.as_record().unwrap().fields[0].schema;
        assert_eq!(inner.name().unwrap().fullname(), "custom.Inner");
    }

    #[test]
    fn test_root_namespace_defaults_to_record_name() {
        let schema = derive_schema(&request_def()).unwrap();
        assert_eq!(schema.name().unwrap().fullname(), "Request.Request");
        assert!(canonical_form(&schema).starts_with(r#"{"name":"Request.Request""#));

        let declared = derive_schema(&request_def().with_namespace("api")).unwrap();
        assert_eq!(declared.name().unwrap().fullname(), "api.Request");
    }

    #[test]
    fn test_nested_namespace_must_extend_parent() {
        let inner = RecordDef::new("Inner", vec![]).with_namespace("other");
        let def = RecordDef::new("Outer", vec![FieldDef::required("inner", TypeDef::Record(inner))])
            .with_namespace("custom");
        assert!(matches!(derive_schema(&def), Err(SchemaError::InvalidNamespace { .. })));

        let inner = RecordDef::new("Inner", vec![]).with_namespace("custom.namespace");
        let def = RecordDef::new("Outer", vec![FieldDef::required("inner", TypeDef::Record(inner))])
            .with_namespace("custom");
        assert!(derive_schema(&def).is_ok());
    }

    #[test]
    fn test_conflicting_named_definitions_rejected() {
        let first = RecordDef::new("Inner", vec![FieldDef::required("x", TypeDef::Text)]);
        let second = RecordDef::new("Inner", vec![FieldDef::required("y", TypeDef::Text)]);
        let def = RecordDef::new(
            "Outer",
            vec![
                FieldDef::required("a", TypeDef::Record(first)),
                FieldDef::required("b", TypeDef::Record(second)),
            ],
        );
        assert!(matches!(derive_schema(&def), Err(SchemaError::ConflictingDefinition { .. })));
    }

    #[test]
    fn test_unsupported_types() {
        let cases = vec![
            TypeDef::Decimal { precision: None, scale: None },
            TypeDef::Decimal { precision: Some(10), scale: None },
            TypeDef::Decimal { precision: None, scale: Some(10) },
            TypeDef::mapping(TypeDef::integer(64), TypeDef::integer(64)),
            TypeDef::Opaque("dict".into()),
        ];
        for ty in cases {
            let def = RecordDef::new("Invalid", vec![FieldDef::required("A", ty.clone())]);
            let err = derive_schema(&def).unwrap_err();
            assert_eq!(err.code(), "AVRO_UNSUPPORTED_TYPE", "{:?}", ty);
        }
    }

    #[test]
    fn test_duplicate_enum_symbols_rejected() {
        let def = RecordDef::new(
            "E",
            vec![FieldDef::required("A", TypeDef::Enum(EnumDef::new("BasicEnum", ["TEST1", "TEST2", "TEST1"])))],
        );
        assert!(matches!(derive_schema(&def), Err(SchemaError::DuplicateSymbol { .. })));
    }

    #[test]
    fn test_advanced_types() {
        let def = RecordDef::new(
            "BasicModelAdvancedTypes",
            vec![
                FieldDef::required("A", TypeDef::Timestamp),
                FieldDef::required("B", TypeDef::FixedBytes(10)),
                FieldDef::required("C", TypeDef::decimal(5, 3)),
                FieldDef::required("D", TypeDef::Enum(EnumDef::new("BasicEnum", ["TEST1", "TEST2", "TEST3"]))),
                FieldDef::required("E", TypeDef::Date),
                FieldDef::required("F", TypeDef::Time),
                FieldDef::required("G", TypeDef::Uuid),
            ],
        );
        let schema = derive_schema(&def).unwrap();
        let fields = &schema.as_record().unwrap().fields;
        assert_eq!(fields[1].schema.name().unwrap().name, "Bytes_10");
        assert_eq!(
            fields[2].schema.logical(),
            Some(LogicalType::Decimal { precision: 5, scale: 3 })
        );
        assert_eq!(fields[4].schema.physical(), &SchemaNode::Int);
        assert_eq!(fields[5].schema.logical(), Some(LogicalType::TimeMicros));
        assert_eq!(fields[6].schema.physical(), &SchemaNode::String);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let def = RecordDef::new("1Bad", vec![]);
        assert!(matches!(derive_schema(&def), Err(SchemaError::InvalidName { .. })));

        let def = RecordDef::new("Good", vec![FieldDef::required("has-dash", TypeDef::Text)]);
        assert!(matches!(derive_schema(&def), Err(SchemaError::InvalidName { .. })));
    }

    #[test]
    fn test_defaults_validated() {
        let def = RecordDef::new(
            "Defaults",
            vec![
                FieldDef::required("A", TypeDef::Text).with_default(Value::from("1")),
                FieldDef::required("B", TypeDef::Integer { bits: None }).with_default(Value::Long(2)),
            ],
        );
        let schema = derive_schema(&def).unwrap();
        assert_eq!(schema.as_record().unwrap().fields[1].default, Some(Value::Long(2)));

        let bad = RecordDef::new(
            "Defaults",
            vec![FieldDef::required("B", TypeDef::Integer { bits: None }).with_default(Value::from("two"))],
        );
        assert!(matches!(derive_schema(&bad), Err(SchemaError::InvalidDefault { .. })));

        let bad_optional = RecordDef::new(
            "Defaults",
            vec![FieldDef::optional("B", TypeDef::Integer { bits: None }).with_default(Value::Long(2))],
        );
        assert!(matches!(derive_schema(&bad_optional), Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let def = RecordDef::new(
            "Dup",
            vec![FieldDef::required("A", TypeDef::Text), FieldDef::required("A", TypeDef::Boolean)],
        );
        assert!(matches!(derive_schema(&def), Err(SchemaError::DuplicateField { .. })));
    }
}
