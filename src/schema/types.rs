//! Avro schema types and representations.
//!
//! This module defines the schema type system the builder constructs:
//! primitives (with optional logical-type annotations), records, enums,
//! fixed types, arrays, maps, unions, and resolved references to named
//! types.

use serde_json::Value;

use crate::error::BuilderError;

/// Compute the fully qualified name for a possibly namespaced name.
///
/// A name that already contains a dot is treated as a fullname and the
/// namespace argument is ignored.
pub fn make_fullname(name: &str, namespace: Option<&str>) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        match namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{name}"),
            _ => name.to_string(),
        }
    }
}

/// A schema under construction.
///
/// Named types (record, enum, fixed) have an identity (fullname) and are
/// registered in the session's definition cache; `Ref` is a resolved
/// reference to such a cached definition.
#[derive(Debug, Clone, PartialEq)]
pub enum AvroSchema {
    /// One of the eight Avro primitive types, possibly annotated with a
    /// logical type.
    Primitive(PrimitiveSchema),
    /// Record type with named fields.
    Record(RecordSchema),
    /// Enumeration type.
    Enum(EnumSchema),
    /// Fixed-size byte array.
    Fixed(FixedSchema),
    /// Array of items with a single schema.
    Array(ArraySchema),
    /// Map with string keys and values of a single schema.
    Map(MapSchema),
    /// Union of multiple schemas.
    Union(UnionSchema),
    /// Resolved reference to a cached named type, by fullname.
    Ref(String),
}

/// The Avro primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveKind {
    /// The Avro name of this primitive kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Null => "null",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::String => "string",
        }
    }

    /// Parse an Avro primitive type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(PrimitiveKind::Null),
            "boolean" => Some(PrimitiveKind::Boolean),
            "int" => Some(PrimitiveKind::Int),
            "long" => Some(PrimitiveKind::Long),
            "float" => Some(PrimitiveKind::Float),
            "double" => Some(PrimitiveKind::Double),
            "bytes" => Some(PrimitiveKind::Bytes),
            "string" => Some(PrimitiveKind::String),
            _ => None,
        }
    }
}

/// A primitive schema with optional logical-type annotation.
///
/// Decimal parameters (precision, scale) are only meaningful on bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSchema {
    pub kind: PrimitiveKind,
    pub logical_type: Option<String>,
    pub precision: Option<u64>,
    pub scale: Option<u64>,
}

impl PrimitiveSchema {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            logical_type: None,
            precision: None,
            scale: None,
        }
    }

    /// Set the logical type.
    pub fn with_logical_type(mut self, logical_type: impl Into<String>) -> Self {
        self.logical_type = Some(logical_type.into());
        self
    }
}

/// Schema for a record type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSchema {
    /// The name of the record. `None` only while the record is under
    /// construction; validation rejects a record that never received one.
    pub name: Option<String>,
    /// Optional namespace for the record.
    pub namespace: Option<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this record.
    pub aliases: Vec<String>,
    /// The fields of the record, in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Optional logical type annotation.
    pub logical_type: Option<String>,
}

impl RecordSchema {
    /// Create a new RecordSchema with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(|name| make_fullname(name, self.namespace.as_deref()))
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Add a field, replacing any existing field with the same name.
    /// A replaced field keeps its original declaration position.
    pub fn put_field(&mut self, field: FieldSchema) {
        match self.fields.iter().position(|f| f.name == field.name) {
            Some(pos) => self.fields[pos] = field,
            None => self.fields.push(field),
        }
    }

    fn validate(&self, field: Option<&str>) -> Result<(), BuilderError> {
        if self.name.is_none() && field.is_none() {
            return Err(BuilderError::required_attribute("record", "name", None, None));
        }
        Ok(())
    }
}

/// Schema for a field within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    /// The name of the field.
    pub name: String,
    /// The schema of the field's value.
    pub schema: AvroSchema,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Optional default value for the field.
    pub default: Option<Value>,
    /// Field ordering for record comparison.
    pub order: Option<FieldOrder>,
    /// Aliases for this field.
    pub aliases: Vec<String>,
    /// Whether the field is optional. An optional field serializes as a
    /// union with null first, and defaults to null when no explicit
    /// default is set.
    pub optional: bool,
}

impl FieldSchema {
    /// Create a new FieldSchema with the given name and schema.
    pub fn new(name: impl Into<String>, schema: AvroSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            doc: None,
            default: None,
            order: None,
            aliases: Vec::new(),
            optional: false,
        }
    }

    /// Mark the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Field ordering for record comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrder {
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOrder::Ascending => "ascending",
            FieldOrder::Descending => "descending",
            FieldOrder::Ignore => "ignore",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ascending" => Some(FieldOrder::Ascending),
            "descending" => Some(FieldOrder::Descending),
            "ignore" => Some(FieldOrder::Ignore),
            _ => None,
        }
    }
}

/// Schema for an enumeration type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumSchema {
    /// The name of the enum.
    pub name: Option<String>,
    /// Optional namespace for the enum.
    pub namespace: Option<String>,
    /// Optional documentation.
    pub doc: Option<String>,
    /// Aliases for this enum.
    pub aliases: Vec<String>,
    /// The symbols (variants) of the enum, in order.
    pub symbols: Vec<String>,
    /// Default symbol (for schema resolution).
    pub default: Option<String>,
}

impl EnumSchema {
    /// Create a new EnumSchema with the given name and symbols.
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: Some(name.into()),
            symbols,
            ..Self::default()
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(|name| make_fullname(name, self.namespace.as_deref()))
    }

    fn validate(&self, field: Option<&str>) -> Result<(), BuilderError> {
        if self.name.is_none() && field.is_none() {
            return Err(BuilderError::required_attribute("enum", "name", None, None));
        }
        if self.symbols.is_empty() {
            return Err(BuilderError::required_attribute(
                "enum",
                "symbols",
                field,
                self.name.as_deref(),
            ));
        }
        if let Some(default) = &self.default {
            if !self.symbols.iter().any(|s| s == default) {
                return Err(BuilderError::Attribute(format!(
                    "enum default '{}' must be one of the enum symbols: {:?}",
                    default, self.symbols
                )));
            }
        }
        Ok(())
    }
}

/// Schema for a fixed-size byte array.
///
/// Precision and scale are only meaningful with the decimal logical type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedSchema {
    /// The name of the fixed type.
    pub name: Option<String>,
    /// Optional namespace for the fixed type.
    pub namespace: Option<String>,
    /// Aliases for this fixed type.
    pub aliases: Vec<String>,
    /// The size in bytes.
    pub size: Option<u64>,
    /// Optional logical type annotation.
    pub logical_type: Option<String>,
    pub precision: Option<u64>,
    pub scale: Option<u64>,
}

impl FixedSchema {
    /// Create a new FixedSchema with the given name and size.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: Some(name.into()),
            size: Some(size),
            ..Self::default()
        }
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Get the fully qualified name.
    pub fn fullname(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(|name| make_fullname(name, self.namespace.as_deref()))
    }

    fn validate(&self, field: Option<&str>) -> Result<(), BuilderError> {
        if self.name.is_none() && field.is_none() {
            return Err(BuilderError::required_attribute("fixed", "name", None, None));
        }
        if self.size.is_none() {
            return Err(BuilderError::required_attribute(
                "fixed",
                "size",
                field,
                self.name.as_deref(),
            ));
        }
        Ok(())
    }
}

/// Schema for an array type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArraySchema {
    /// The schema of the array's items.
    pub items: Option<Box<AvroSchema>>,
}

impl ArraySchema {
    pub fn new(items: AvroSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
        }
    }

    fn validate(&self, field: Option<&str>) -> Result<(), BuilderError> {
        if self.items.is_none() {
            return Err(BuilderError::required_attribute("array", "items", field, None));
        }
        Ok(())
    }
}

/// Schema for a map type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapSchema {
    /// The schema of the map's values.
    pub values: Option<Box<AvroSchema>>,
}

impl MapSchema {
    pub fn new(values: AvroSchema) -> Self {
        Self {
            values: Some(Box::new(values)),
        }
    }

    fn validate(&self, field: Option<&str>) -> Result<(), BuilderError> {
        if self.values.is_none() {
            return Err(BuilderError::required_attribute("map", "values", field, None));
        }
        Ok(())
    }
}

/// Schema for a union type.
///
/// Unions never carry a logical type; the factory rejects the attribute at
/// configuration time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnionSchema {
    /// The branch schemas, in order.
    pub branches: Vec<AvroSchema>,
}

impl UnionSchema {
    pub fn new(branches: Vec<AvroSchema>) -> Self {
        Self { branches }
    }

    fn validate(&self, field: Option<&str>) -> Result<(), BuilderError> {
        if self.branches.is_empty() {
            return Err(BuilderError::required_attribute("union", "types", field, None));
        }
        Ok(())
    }
}

impl AvroSchema {
    /// Null primitive.
    pub fn null() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::Null))
    }

    /// Boolean primitive.
    pub fn boolean() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::Boolean))
    }

    /// 32-bit signed integer primitive.
    pub fn int() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::Int))
    }

    /// 64-bit signed integer primitive.
    pub fn long() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::Long))
    }

    /// 32-bit IEEE 754 floating-point primitive.
    pub fn float() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::Float))
    }

    /// 64-bit IEEE 754 floating-point primitive.
    pub fn double() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::Double))
    }

    /// Byte-sequence primitive.
    pub fn bytes() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::Bytes))
    }

    /// Unicode string primitive.
    pub fn string() -> Self {
        AvroSchema::Primitive(PrimitiveSchema::new(PrimitiveKind::String))
    }

    /// Bytes annotated with the decimal logical type.
    pub fn decimal(precision: u64, scale: u64) -> Self {
        AvroSchema::Primitive(PrimitiveSchema {
            kind: PrimitiveKind::Bytes,
            logical_type: Some("decimal".to_string()),
            precision: Some(precision),
            scale: Some(scale),
        })
    }

    /// The Avro kind name of this schema ("record", "int", ...).
    pub fn kind_name(&self) -> &'static str {
        match self {
            AvroSchema::Primitive(p) => p.kind.as_str(),
            AvroSchema::Record(_) => "record",
            AvroSchema::Enum(_) => "enum",
            AvroSchema::Fixed(_) => "fixed",
            AvroSchema::Array(_) => "array",
            AvroSchema::Map(_) => "map",
            AvroSchema::Union(_) => "union",
            AvroSchema::Ref(_) => "ref",
        }
    }

    /// Check if this schema is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(self, AvroSchema::Primitive(_))
    }

    /// Check if this schema is a named type (record, enum, or fixed).
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            AvroSchema::Record(_) | AvroSchema::Enum(_) | AvroSchema::Fixed(_)
        )
    }

    /// Get the name of a named type, if applicable.
    pub fn name(&self) -> Option<&str> {
        match self {
            AvroSchema::Record(r) => r.name.as_deref(),
            AvroSchema::Enum(e) => e.name.as_deref(),
            AvroSchema::Fixed(f) => f.name.as_deref(),
            AvroSchema::Ref(n) => Some(n),
            _ => None,
        }
    }

    /// Get the namespace of a named type, if applicable.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            AvroSchema::Record(r) => r.namespace.as_deref(),
            AvroSchema::Enum(e) => e.namespace.as_deref(),
            AvroSchema::Fixed(f) => f.namespace.as_deref(),
            _ => None,
        }
    }

    /// Get the fully qualified name of a named type, if applicable.
    pub fn fullname(&self) -> Option<String> {
        match self {
            AvroSchema::Record(r) => r.fullname(),
            AvroSchema::Enum(e) => e.fullname(),
            AvroSchema::Fixed(f) => f.fullname(),
            AvroSchema::Ref(n) => Some(n.clone()),
            _ => None,
        }
    }

    /// Check that all structurally mandatory attributes are present.
    ///
    /// `field` is the name of the enclosing field, when the schema is a
    /// field's type; it is included in error messages and relaxes the name
    /// requirement for inline named types (those receive synthesized
    /// names).
    pub fn validate(&self, field: Option<&str>) -> Result<(), BuilderError> {
        match self {
            AvroSchema::Record(r) => r.validate(field),
            AvroSchema::Enum(e) => e.validate(field),
            AvroSchema::Fixed(f) => f.validate(field),
            AvroSchema::Array(a) => a.validate(field),
            AvroSchema::Map(m) => m.validate(field),
            AvroSchema::Union(u) => u.validate(field),
            AvroSchema::Primitive(_) | AvroSchema::Ref(_) => Ok(()),
        }
    }
}
