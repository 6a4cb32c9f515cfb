//! Schema tree definitions
//!
//! A schema is an immutable tree of [`SchemaNode`]s. Named types (records,
//! enums, fixed) carry their full name inline; a named type reused in several
//! places is stored as several identical subtrees rather than by reference.
//!
//! Field order and union branch order are part of the schema's identity.

use crate::codec::Value;

/// Name of a named type (record, enum or fixed)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    /// Simple name
    pub name: String,
    /// Namespace, if any
    pub namespace: Option<String>,
}

impl Name {
    /// Create a name without a namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    /// Create a name inside a namespace. Empty namespaces are dropped.
    pub fn with_namespace(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()),
        }
    }

    /// Dotted full name (`namespace.name`)
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

/// Logical refinements attached to a physical type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    /// Days since epoch, on `int`
    Date,
    /// Microseconds since midnight, on `long`
    TimeMicros,
    /// Microseconds since epoch in UTC, on `long`
    TimestampMicros,
    /// Hyphenated textual UUID, on `string`
    Uuid,
    /// Two's complement unscaled integer, on `bytes` or `fixed`
    Decimal { precision: u32, scale: u32 },
}

impl LogicalType {
    /// The `logicalType` attribute value
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Date => "date",
            LogicalType::TimeMicros => "time-micros",
            LogicalType::TimestampMicros => "timestamp-micros",
            LogicalType::Uuid => "uuid",
            LogicalType::Decimal { .. } => "decimal",
        }
    }

    /// Whether this refinement may be attached to `physical`
    pub fn applies_to(&self, physical: &SchemaNode) -> bool {
        matches!(
            (self, physical),
            (LogicalType::Date, SchemaNode::Int)
                | (LogicalType::TimeMicros, SchemaNode::Long)
                | (LogicalType::TimestampMicros, SchemaNode::Long)
                | (LogicalType::Uuid, SchemaNode::String)
                | (LogicalType::Decimal { .. }, SchemaNode::Bytes)
                | (LogicalType::Decimal { .. }, SchemaNode::Fixed(_))
        )
    }
}

/// Record schema
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub fields: Vec<FieldNode>,
}

impl RecordSchema {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of the field matching `name` directly or through an alias
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .position(|f| f.aliases.iter().any(|a| a == name))
            })
    }
}

/// One field of a record
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub schema: SchemaNode,
    pub default: Option<Value>,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
}

impl FieldNode {
    /// Create a field without default, doc or aliases
    pub fn new(name: impl Into<String>, schema: SchemaNode) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            doc: None,
            aliases: Vec::new(),
        }
    }

    /// Attach a default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Enum schema
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub aliases: Vec<String>,
    pub symbols: Vec<String>,
}

/// Fixed-size byte string schema
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Name,
    pub aliases: Vec<String>,
    pub size: usize,
}

/// One node of a schema tree
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(RecordSchema),
    Enum(EnumSchema),
    /// Array of the boxed item schema
    Array(Box<SchemaNode>),
    /// String-keyed map of the boxed value schema
    Map(Box<SchemaNode>),
    /// Ordered branches; selection is by position
    Union(Vec<SchemaNode>),
    Fixed(FixedSchema),
    /// Logical refinement of the boxed physical type
    Logical(LogicalType, Box<SchemaNode>),
}

impl SchemaNode {
    /// Returns the type name used in schema text and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaNode::Null => "null",
            SchemaNode::Boolean => "boolean",
            SchemaNode::Int => "int",
            SchemaNode::Long => "long",
            SchemaNode::Float => "float",
            SchemaNode::Double => "double",
            SchemaNode::Bytes => "bytes",
            SchemaNode::String => "string",
            SchemaNode::Record(_) => "record",
            SchemaNode::Enum(_) => "enum",
            SchemaNode::Array(_) => "array",
            SchemaNode::Map(_) => "map",
            SchemaNode::Union(_) => "union",
            SchemaNode::Fixed(_) => "fixed",
            SchemaNode::Logical(logical, _) => logical.as_str(),
        }
    }

    /// The physical node underneath any logical refinement
    pub fn physical(&self) -> &SchemaNode {
        match self {
            SchemaNode::Logical(_, inner) => inner.physical(),
            other => other,
        }
    }

    /// The logical refinement, if any
    pub fn logical(&self) -> Option<LogicalType> {
        match self {
            SchemaNode::Logical(logical, _) => Some(*logical),
            _ => None,
        }
    }

    /// Name of a named type
    pub fn name(&self) -> Option<&Name> {
        match self.physical() {
            SchemaNode::Record(r) => Some(&r.name),
            SchemaNode::Enum(e) => Some(&e.name),
            SchemaNode::Fixed(f) => Some(&f.name),
            _ => None,
        }
    }

    /// Whether this is the `[null, T]` union produced for optional fields
    pub fn is_optional(&self) -> bool {
        matches!(self, SchemaNode::Union(branches)
            if branches.len() == 2 && branches[0] == SchemaNode::Null)
    }

    /// Whether this is a union containing a `null` branch
    pub fn is_nullable(&self) -> bool {
        matches!(self, SchemaNode::Union(branches)
            if branches.iter().any(|b| *b == SchemaNode::Null))
    }

    /// Convenience constructor for `[null, inner]`
    pub fn optional(inner: SchemaNode) -> Self {
        SchemaNode::Union(vec![SchemaNode::Null, inner])
    }

    /// Convenience constructor for `long` + `timestamp-micros`
    pub fn timestamp_micros() -> Self {
        SchemaNode::Logical(LogicalType::TimestampMicros, Box::new(SchemaNode::Long))
    }

    /// Record fields, when this is a record
    pub fn as_record(&self) -> Option<&RecordSchema> {
        match self.physical() {
            SchemaNode::Record(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SchemaNode {
        SchemaNode::Record(RecordSchema {
            name: Name::with_namespace("Request", Some("api".into())),
            doc: None,
            aliases: Vec::new(),
            fields: vec![
                FieldNode::new("A", SchemaNode::String),
                FieldNode::new("B", SchemaNode::Long),
                FieldNode::new("C", SchemaNode::timestamp_micros()),
            ],
        })
    }

    #[test]
    fn test_fullname() {
        assert_eq!(Name::new("A").fullname(), "A");
        assert_eq!(Name::with_namespace("A", Some("x.y".into())).fullname(), "x.y.A");
        assert_eq!(Name::with_namespace("A", Some(String::new())).fullname(), "A");
    }

    #[test]
    fn test_physical_strips_logical() {
        let ts = SchemaNode::timestamp_micros();
        assert_eq!(ts.physical(), &SchemaNode::Long);
        assert_eq!(ts.logical(), Some(LogicalType::TimestampMicros));
        assert_eq!(ts.type_name(), "timestamp-micros");
    }

    #[test]
    fn test_optional_union_detection() {
        assert!(SchemaNode::optional(SchemaNode::Long).is_optional());
        assert!(!SchemaNode::Union(vec![SchemaNode::Long, SchemaNode::Null]).is_optional());
        assert!(SchemaNode::Union(vec![SchemaNode::Long, SchemaNode::Null]).is_nullable());
    }

    #[test]
    fn test_record_field_lookup() {
        let schema = sample_record();
        let record = schema.as_record().unwrap();
        assert_eq!(record.field("B").unwrap().schema, SchemaNode::Long);
        assert_eq!(record.position_of("C"), Some(2));
        assert!(record.field("missing").is_none());
        assert_eq!(schema.name().unwrap().fullname(), "api.Request");
    }

    #[test]
    fn test_logical_applies_to() {
        assert!(LogicalType::Date.applies_to(&SchemaNode::Int));
        assert!(!LogicalType::Date.applies_to(&SchemaNode::Long));
        let decimal = LogicalType::Decimal { precision: 5, scale: 2 };
        assert!(decimal.applies_to(&SchemaNode::Bytes));
        assert!(!decimal.applies_to(&SchemaNode::String));
    }
}
