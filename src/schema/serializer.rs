//! Canonical schema document serialization.
//!
//! Walks a schema graph and produces the canonical JSON tree. Named types
//! are emitted as a full definition exactly once per serialization pass;
//! every later occurrence of the same fullname is emitted as the bare
//! fullname string. This is what makes recursive record types serializable
//! without infinite recursion.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::builder::DefinitionCache;
use crate::error::BuilderError;
use crate::schema::types::{
    ArraySchema, AvroSchema, EnumSchema, FieldSchema, FixedSchema, MapSchema, PrimitiveSchema,
    RecordSchema, UnionSchema,
};

/// Per-pass bookkeeping of which fullnames have already been emitted as
/// full definitions.
///
/// A fresh state must be used for every serialization pass; reusing one
/// across passes would turn first occurrences into bare references.
#[derive(Debug, Default)]
pub struct ReferenceState {
    references: HashSet<String>,
}

impl ReferenceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the fullname has already been emitted in this pass,
    /// marking it as emitted otherwise.
    fn seen(&mut self, fullname: &str) -> bool {
        !self.references.insert(fullname.to_string())
    }
}

/// Serialize a schema into its canonical JSON document.
///
/// `cache` supplies the definitions behind `Ref` nodes; `state` tracks
/// which named types have already been emitted in this pass.
pub fn serialize(
    node: &AvroSchema,
    cache: &DefinitionCache,
    state: &mut ReferenceState,
) -> Result<Value, BuilderError> {
    match node {
        AvroSchema::Primitive(p) => Ok(serialize_primitive(p)),
        AvroSchema::Record(r) => {
            let fullname = fullname_of(node)?;
            if state.seen(&fullname) {
                Ok(json!(fullname))
            } else {
                serialize_record(r, cache, state)
            }
        }
        AvroSchema::Enum(e) => {
            let fullname = fullname_of(node)?;
            if state.seen(&fullname) {
                Ok(json!(fullname))
            } else {
                Ok(serialize_enum(e))
            }
        }
        AvroSchema::Fixed(f) => {
            let fullname = fullname_of(node)?;
            if state.seen(&fullname) {
                Ok(json!(fullname))
            } else {
                serialize_fixed(f)
            }
        }
        AvroSchema::Array(a) => serialize_array(a, cache, state),
        AvroSchema::Map(m) => serialize_map(m, cache, state),
        AvroSchema::Union(u) => serialize_union(u, cache, state),
        AvroSchema::Ref(fullname) => {
            if state.seen(fullname) {
                return Ok(json!(fullname));
            }
            // First occurrence: inline the cached definition. `seen` has
            // already marked the fullname, so the definition arm below
            // must not re-check it.
            match cache.get(fullname) {
                Some(AvroSchema::Record(r)) => serialize_record(r, cache, state),
                Some(AvroSchema::Enum(e)) => Ok(serialize_enum(e)),
                Some(AvroSchema::Fixed(f)) => serialize_fixed(f),
                _ => Err(BuilderError::definition_not_found(fullname)),
            }
        }
    }
}

fn fullname_of(node: &AvroSchema) -> Result<String, BuilderError> {
    node.fullname().ok_or_else(|| {
        BuilderError::required_attribute(
            match node {
                AvroSchema::Enum(_) => "enum",
                AvroSchema::Fixed(_) => "fixed",
                _ => "record",
            },
            "name",
            None,
            None,
        )
    })
}

fn serialize_primitive(p: &PrimitiveSchema) -> Value {
    match &p.logical_type {
        None => json!(p.kind.as_str()),
        Some(logical_type) => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!(p.kind.as_str()));
            obj.insert("logicalType".to_string(), json!(logical_type));
            if let Some(precision) = p.precision {
                obj.insert("precision".to_string(), json!(precision));
            }
            if let Some(scale) = p.scale {
                obj.insert("scale".to_string(), json!(scale));
            }
            Value::Object(obj)
        }
    }
}

fn serialize_record(
    r: &RecordSchema,
    cache: &DefinitionCache,
    state: &mut ReferenceState,
) -> Result<Value, BuilderError> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!("record"));
    obj.insert("name".to_string(), json!(r.name));

    if let Some(ns) = &r.namespace {
        obj.insert("namespace".to_string(), json!(ns));
    }
    if let Some(doc) = &r.doc {
        obj.insert("doc".to_string(), json!(doc));
    }
    if !r.aliases.is_empty() {
        obj.insert("aliases".to_string(), json!(&r.aliases));
    }
    if let Some(logical_type) = &r.logical_type {
        obj.insert("logicalType".to_string(), json!(logical_type));
    }

    let mut fields = Vec::with_capacity(r.fields.len());
    for field in &r.fields {
        fields.push(serialize_field(field, cache, state)?);
    }
    obj.insert("fields".to_string(), Value::Array(fields));

    Ok(Value::Object(obj))
}

fn serialize_field(
    field: &FieldSchema,
    cache: &DefinitionCache,
    state: &mut ReferenceState,
) -> Result<Value, BuilderError> {
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(field.name));

    let mut serialized = serialize(&field.schema, cache, state)?;
    if field.optional {
        serialized = union_with_null(serialized);
    }
    obj.insert("type".to_string(), serialized);

    if !field.aliases.is_empty() {
        obj.insert("aliases".to_string(), json!(&field.aliases));
    }
    if let Some(doc) = &field.doc {
        obj.insert("doc".to_string(), json!(doc));
    }
    if let Some(default) = &field.default {
        obj.insert("default".to_string(), default.clone());
    } else if field.optional {
        // Optional fields always carry a default, even when the author
        // never set one.
        obj.insert("default".to_string(), Value::Null);
    }
    if let Some(order) = field.order {
        obj.insert("order".to_string(), json!(order.as_str()));
    }

    Ok(Value::Object(obj))
}

/// Wrap a serialized field type into a union with null first.
///
/// If the type is already a union, null is moved to the front and any
/// pre-existing null entry is dropped; otherwise the type is wrapped as a
/// two-branch union.
fn union_with_null(serialized: Value) -> Value {
    match serialized {
        Value::Array(branches) => {
            let mut out = vec![json!("null")];
            out.extend(branches.into_iter().filter(|b| b.as_str() != Some("null")));
            Value::Array(out)
        }
        other => json!(["null", other]),
    }
}

fn serialize_enum(e: &EnumSchema) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!("enum"));
    obj.insert("name".to_string(), json!(e.name));

    if let Some(ns) = &e.namespace {
        obj.insert("namespace".to_string(), json!(ns));
    }
    if let Some(doc) = &e.doc {
        obj.insert("doc".to_string(), json!(doc));
    }
    if !e.aliases.is_empty() {
        obj.insert("aliases".to_string(), json!(&e.aliases));
    }
    obj.insert("symbols".to_string(), json!(&e.symbols));
    if let Some(default) = &e.default {
        obj.insert("default".to_string(), json!(default));
    }

    Value::Object(obj)
}

fn serialize_fixed(f: &FixedSchema) -> Result<Value, BuilderError> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!("fixed"));
    obj.insert("name".to_string(), json!(f.name));

    if let Some(ns) = &f.namespace {
        obj.insert("namespace".to_string(), json!(ns));
    }
    if !f.aliases.is_empty() {
        obj.insert("aliases".to_string(), json!(&f.aliases));
    }
    if let Some(logical_type) = &f.logical_type {
        obj.insert("logicalType".to_string(), json!(logical_type));
    }
    let size = f
        .size
        .ok_or_else(|| {
            BuilderError::required_attribute("fixed", "size", None, f.name.as_deref())
        })?;
    obj.insert("size".to_string(), json!(size));
    if let Some(precision) = f.precision {
        obj.insert("precision".to_string(), json!(precision));
    }
    if let Some(scale) = f.scale {
        obj.insert("scale".to_string(), json!(scale));
    }

    Ok(Value::Object(obj))
}

fn serialize_array(
    a: &ArraySchema,
    cache: &DefinitionCache,
    state: &mut ReferenceState,
) -> Result<Value, BuilderError> {
    let items = a
        .items
        .as_deref()
        .ok_or_else(|| BuilderError::required_attribute("array", "items", None, None))?;
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!("array"));
    obj.insert("items".to_string(), serialize(items, cache, state)?);
    Ok(Value::Object(obj))
}

fn serialize_map(
    m: &MapSchema,
    cache: &DefinitionCache,
    state: &mut ReferenceState,
) -> Result<Value, BuilderError> {
    let values = m
        .values
        .as_deref()
        .ok_or_else(|| BuilderError::required_attribute("map", "values", None, None))?;
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!("map"));
    obj.insert("values".to_string(), serialize(values, cache, state)?);
    Ok(Value::Object(obj))
}

fn serialize_union(
    u: &UnionSchema,
    cache: &DefinitionCache,
    state: &mut ReferenceState,
) -> Result<Value, BuilderError> {
    let mut branches = Vec::with_capacity(u.branches.len());
    for branch in &u.branches {
        branches.push(serialize(branch, cache, state)?);
    }
    Ok(Value::Array(branches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::PrimitiveKind;

    fn empty_cache() -> DefinitionCache {
        DefinitionCache::new()
    }

    #[test]
    fn test_primitive_serializes_as_bare_name() {
        let mut state = ReferenceState::new();
        let value = serialize(&AvroSchema::long(), &empty_cache(), &mut state).unwrap();
        assert_eq!(value, json!("long"));
    }

    #[test]
    fn test_decimal_bytes_serializes_with_params() {
        let mut state = ReferenceState::new();
        let value = serialize(&AvroSchema::decimal(10, 2), &empty_cache(), &mut state).unwrap();
        assert_eq!(
            value,
            json!({"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2})
        );
    }

    #[test]
    fn test_uuid_string_serializes_with_logical_type() {
        let schema = AvroSchema::Primitive(
            PrimitiveSchema::new(PrimitiveKind::String).with_logical_type("uuid"),
        );
        let mut state = ReferenceState::new();
        let value = serialize(&schema, &empty_cache(), &mut state).unwrap();
        assert_eq!(value, json!({"type": "string", "logicalType": "uuid"}));
    }

    #[test]
    fn test_named_type_second_occurrence_is_reference() {
        let schema = AvroSchema::Fixed(FixedSchema::new("hash", 16).with_namespace("test"));
        let mut state = ReferenceState::new();
        let cache = empty_cache();
        assert_eq!(
            serialize(&schema, &cache, &mut state).unwrap(),
            json!({"type": "fixed", "name": "hash", "namespace": "test", "size": 16})
        );
        assert_eq!(serialize(&schema, &cache, &mut state).unwrap(), json!("test.hash"));
    }

    #[test]
    fn test_union_with_null_reorders_and_dedups() {
        assert_eq!(
            union_with_null(json!(["string", "null", "int"])),
            json!(["null", "string", "int"])
        );
        assert_eq!(union_with_null(json!("long")), json!(["null", "long"]));
    }

    #[test]
    fn test_dangling_reference_is_an_error() {
        let mut state = ReferenceState::new();
        let node = AvroSchema::Ref("missing.rec".to_string());
        let err = serialize(&node, &empty_cache(), &mut state).unwrap_err();
        assert!(err.to_string().contains("definition not found"));
    }
}
