//! Type construction from kind tags and configuration maps.
//!
//! The factory turns a builtin kind name into a blank schema node and then
//! applies configuration options through an explicit per-kind attribute
//! registry. Option keys that are not recognized for the kind pass through
//! silently; keys that violate an attribute-placement contract fail with
//! an attribute error.

use serde_json::Value;

use crate::builder::context::SchemaBuilder;
use crate::error::BuilderError;
use crate::schema::types::{
    ArraySchema, AvroSchema, EnumSchema, FixedSchema, MapSchema, PrimitiveKind, PrimitiveSchema,
    RecordSchema, UnionSchema,
};

/// The builtin complex type kind names.
pub const COMPLEX_TYPE_NAMES: [&str; 6] = ["array", "enum", "fixed", "map", "record", "union"];

/// Whether the name is a builtin primitive or complex kind.
pub fn is_builtin(kind: &str) -> bool {
    PrimitiveKind::from_name(kind).is_some() || COMPLEX_TYPE_NAMES.contains(&kind)
}

/// A type argument: either a kind/reference name to resolve, or a schema
/// value to use as-is.
#[derive(Debug, Clone)]
pub enum TypeInput {
    /// A builtin kind name or the name of a previously defined type.
    Name(String),
    /// A schema held by the caller, passed through unchanged.
    Node(AvroSchema),
}

impl From<&str> for TypeInput {
    fn from(name: &str) -> Self {
        TypeInput::Name(name.to_string())
    }
}

impl From<String> for TypeInput {
    fn from(name: String) -> Self {
        TypeInput::Name(name)
    }
}

impl From<AvroSchema> for TypeInput {
    fn from(node: AvroSchema) -> Self {
        TypeInput::Node(node)
    }
}

/// An ordered set of configuration options for a type or field.
///
/// Values are JSON values; each recognized key is applied through the
/// factory's typed setter for the kind being configured.
#[derive(Debug, Clone, Default)]
pub struct TypeConfig {
    entries: Vec<(String, Value)>,
}

impl TypeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option, chainable.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub(crate) fn push(&mut self, key: impl Into<String>, value: Value) {
        self.entries.push((key.into(), value));
    }

    pub(crate) fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// The last value set for a key, if any.
    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Where a type is being constructed. Inline construction carries the
/// naming context used to synthesize names for anonymous nested types.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Site<'a> {
    /// Defined at the top level of the build session.
    TopLevel,
    /// Defined inline as the type of a record field.
    Inline {
        /// Underscore-joined chain of ancestor names down to the
        /// enclosing record.
        fragment: &'a str,
        /// The name of the field this type belongs to.
        field_name: &'a str,
    },
}

/// Create a blank node for a builtin kind name.
pub(crate) fn create_builtin(kind: &str) -> Result<AvroSchema, BuilderError> {
    if let Some(primitive) = PrimitiveKind::from_name(kind) {
        return Ok(AvroSchema::Primitive(PrimitiveSchema::new(primitive)));
    }
    match kind {
        "record" => Ok(AvroSchema::Record(RecordSchema::default())),
        "enum" => Ok(AvroSchema::Enum(EnumSchema::default())),
        "fixed" => Ok(AvroSchema::Fixed(FixedSchema::default())),
        "array" => Ok(AvroSchema::Array(ArraySchema::default())),
        "map" => Ok(AvroSchema::Map(MapSchema::default())),
        "union" => Ok(AvroSchema::Union(UnionSchema::default())),
        _ => Err(BuilderError::InvalidType(kind.to_string())),
    }
}

/// Create a builtin type and configure it: internal attributes first
/// (name, default namespace), then caller options in order, then a
/// synthesized name if an inline named type is still anonymous.
pub(crate) fn create_and_configure(
    ctx: &mut SchemaBuilder,
    kind: &str,
    site: Site<'_>,
    name: Option<&str>,
    namespace: Option<&str>,
    config: &TypeConfig,
) -> Result<AvroSchema, BuilderError> {
    let mut node = create_builtin(kind)?;
    if let Some(name) = name {
        set_name(&mut node, name);
    }
    if let Some(namespace) = namespace {
        set_namespace(&mut node, namespace);
    }
    for (key, value) in config.entries() {
        apply_option(ctx, &mut node, key, value, site)?;
    }
    synthesize_name(&mut node, site, kind);
    Ok(node)
}

fn set_name(node: &mut AvroSchema, name: &str) {
    match node {
        AvroSchema::Record(r) => r.name = Some(name.to_string()),
        AvroSchema::Enum(e) => e.name = Some(name.to_string()),
        AvroSchema::Fixed(f) => f.name = Some(name.to_string()),
        _ => {}
    }
}

fn set_namespace(node: &mut AvroSchema, namespace: &str) {
    match node {
        AvroSchema::Record(r) => r.namespace = Some(namespace.to_string()),
        AvroSchema::Enum(e) => e.namespace = Some(namespace.to_string()),
        AvroSchema::Fixed(f) => f.namespace = Some(namespace.to_string()),
        _ => {}
    }
}

/// Anonymous inline named types get a deterministic synthesized name
/// derived from the chain of enclosing names.
fn synthesize_name(node: &mut AvroSchema, site: Site<'_>, kind: &str) {
    let Site::Inline {
        fragment,
        field_name,
    } = site
    else {
        return;
    };
    let slot = match node {
        AvroSchema::Record(r) => &mut r.name,
        AvroSchema::Enum(e) => &mut e.name,
        AvroSchema::Fixed(f) => &mut f.name,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(format!("__{fragment}_{field_name}_{kind}"));
    }
}

/// Apply one configuration option through the per-kind attribute registry.
fn apply_option(
    ctx: &mut SchemaBuilder,
    node: &mut AvroSchema,
    key: &str,
    value: &Value,
    site: Site<'_>,
) -> Result<(), BuilderError> {
    // Naming attributes are placement-sensitive and shared by all named
    // kinds, so they are handled before the kind registry.
    if node.is_named() {
        match (key, site) {
            ("name", Site::TopLevel) | ("type_name", Site::TopLevel) => {
                return Err(BuilderError::Attribute(format!(
                    "name must be specified as the first argument for {}",
                    node.kind_name()
                )));
            }
            ("type_namespace", Site::TopLevel) => {
                return Err(BuilderError::Attribute(
                    "'namespace' must be specified as an option instead of 'type_namespace'"
                        .to_string(),
                ));
            }
            ("type_aliases", Site::TopLevel) => {
                return Err(BuilderError::Attribute(
                    "'aliases' must be used instead of 'type_aliases'".to_string(),
                ));
            }
            ("namespace", Site::TopLevel) => {
                set_namespace(node, expect_str(key, value)?);
                return Ok(());
            }
            ("aliases", Site::TopLevel) => {
                return set_aliases(node, key, value);
            }
            ("name", Site::Inline { .. }) => {
                return Err(BuilderError::Attribute(
                    "'type_name' must be specified as an option instead of 'name'".to_string(),
                ));
            }
            ("namespace", Site::Inline { .. }) => {
                return Err(BuilderError::Attribute(
                    "'type_namespace' must be specified as an option instead of 'namespace'"
                        .to_string(),
                ));
            }
            ("type_name", Site::Inline { .. }) => {
                set_name(node, expect_str(key, value)?);
                return Ok(());
            }
            ("type_namespace", Site::Inline { .. }) => {
                set_namespace(node, expect_str(key, value)?);
                return Ok(());
            }
            ("type_aliases", Site::Inline { .. }) => {
                return set_aliases(node, key, value);
            }
            _ => {}
        }
    }

    match node {
        AvroSchema::Primitive(p) => match key {
            "logical_type" => p.logical_type = Some(expect_str(key, value)?.to_string()),
            "precision" if p.kind == PrimitiveKind::Bytes => {
                p.precision = Some(expect_u64(key, value)?)
            }
            "scale" if p.kind == PrimitiveKind::Bytes => p.scale = Some(expect_u64(key, value)?),
            _ => {}
        },
        AvroSchema::Record(r) => match key {
            "doc" => r.doc = Some(expect_str(key, value)?.to_string()),
            "logical_type" => r.logical_type = Some(expect_str(key, value)?.to_string()),
            _ => {}
        },
        AvroSchema::Enum(e) => match key {
            "doc" => e.doc = Some(expect_str(key, value)?.to_string()),
            "symbols" => e.symbols = expect_string_array(key, value)?,
            "default" => e.default = Some(expect_str(key, value)?.to_string()),
            _ => {}
        },
        AvroSchema::Fixed(f) => match key {
            "size" => f.size = Some(expect_u64(key, value)?),
            "precision" => f.precision = Some(expect_u64(key, value)?),
            "scale" => f.scale = Some(expect_u64(key, value)?),
            "logical_type" => f.logical_type = Some(expect_str(key, value)?.to_string()),
            _ => {}
        },
        AvroSchema::Array(a) => {
            if key == "items" {
                let items = ctx.resolve_type_ref(expect_str(key, value)?, None)?;
                a.items = Some(Box::new(items));
            }
        }
        AvroSchema::Map(m) => {
            if key == "values" {
                let values = ctx.resolve_type_ref(expect_str(key, value)?, None)?;
                m.values = Some(Box::new(values));
            }
        }
        AvroSchema::Union(u) => match key {
            "logical_type" => {
                return Err(BuilderError::Attribute(
                    "'logical_type' cannot be set on a union type".to_string(),
                ));
            }
            "types" => {
                let names = expect_string_array(key, value)?;
                let mut branches = Vec::with_capacity(names.len());
                for name in &names {
                    branches.push(ctx.resolve_type_ref(name, None)?);
                }
                u.branches = branches;
            }
            _ => {}
        },
        AvroSchema::Ref(_) => {}
    }
    Ok(())
}

fn set_aliases(node: &mut AvroSchema, key: &str, value: &Value) -> Result<(), BuilderError> {
    let aliases = expect_string_array(key, value)?;
    match node {
        AvroSchema::Record(r) => r.aliases = aliases,
        AvroSchema::Enum(e) => e.aliases = aliases,
        AvroSchema::Fixed(f) => f.aliases = aliases,
        _ => {}
    }
    Ok(())
}

pub(crate) fn expect_str<'v>(key: &str, value: &'v Value) -> Result<&'v str, BuilderError> {
    value
        .as_str()
        .ok_or_else(|| BuilderError::Attribute(format!("'{key}' must be a string")))
}

pub(crate) fn expect_u64(key: &str, value: &Value) -> Result<u64, BuilderError> {
    value
        .as_u64()
        .ok_or_else(|| BuilderError::Attribute(format!("'{key}' must be a non-negative integer")))
}

pub(crate) fn expect_string_array(key: &str, value: &Value) -> Result<Vec<String>, BuilderError> {
    let arr = value
        .as_array()
        .ok_or_else(|| BuilderError::Attribute(format!("'{key}' must be an array")))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(String::from)
                .ok_or_else(|| BuilderError::Attribute(format!("'{key}' entries must be strings")))
        })
        .collect()
}
