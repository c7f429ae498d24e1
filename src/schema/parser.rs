//! Canonical schema document parser.
//!
//! Parses a canonical schema document (JSON) back into the schema type
//! hierarchy, validating it against the wire format's rules as it goes:
//! name legality, union composition, enum symbols and defaults, required
//! attributes, and decimal precision/scale math. This is the final
//! validation authority behind `as_schema` and `build_schema`, and the
//! parser used for externally loaded definition files.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::types::{
    make_fullname, ArraySchema, AvroSchema, EnumSchema, FieldOrder, FieldSchema, FixedSchema,
    MapSchema, PrimitiveKind, PrimitiveSchema, RecordSchema, UnionSchema,
};

/// Parse a canonical schema document from a JSON string.
///
/// # Example
/// ```
/// use lancaster::schema::parse_schema;
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// ```
pub fn parse_schema(json: &str) -> Result<AvroSchema, SchemaError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {e}")))?;
    let mut parser = SchemaParser::new();
    parser.parse(&value)
}

/// Schema document parser with named type resolution context.
///
/// Maintains a registry of named types (records, enums, fixed) so that
/// references and recursive definitions resolve while parsing.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Registry of named types by their fully qualified name
    named_types: HashMap<String, AvroSchema>,
    /// Current namespace for resolving unqualified names
    current_namespace: Option<String>,
}

impl SchemaParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the parser with fullnames that are known to be defined
    /// elsewhere (e.g. by earlier imports in the same build session), so
    /// that references to them resolve.
    pub fn with_known_types<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut parser = Self::default();
        for name in names {
            parser
                .named_types
                .insert(name.clone(), AvroSchema::Ref(name));
        }
        parser
    }

    /// Parse a JSON value into a schema.
    pub fn parse(&mut self, value: &Value) -> Result<AvroSchema, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            _ => Err(SchemaError::InvalidSchema(format!(
                "Expected string, object, or array, found: {value:?}"
            ))),
        }
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_string_schema(&self, s: &str) -> Result<AvroSchema, SchemaError> {
        if let Some(kind) = PrimitiveKind::from_name(s) {
            return Ok(AvroSchema::Primitive(PrimitiveSchema::new(kind)));
        }
        let qualified = make_fullname(s, self.current_namespace.as_deref());
        if self.named_types.contains_key(&qualified) {
            Ok(AvroSchema::Ref(qualified))
        } else if self.named_types.contains_key(s) {
            Ok(AvroSchema::Ref(s.to_string()))
        } else {
            Err(SchemaError::InvalidSchema(format!(
                "Unresolved named type reference: '{s}'"
            )))
        }
    }

    /// Parse a complex type from a JSON object.
    fn parse_object_schema(
        &mut self,
        obj: &serde_json::Map<String, Value>,
    ) -> Result<AvroSchema, SchemaError> {
        let type_str = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;

        // Primitive base types hand parsing over to the logical-type
        // path; fixed and record read their own logicalType attribute.
        if obj.get("logicalType").is_some() && PrimitiveKind::from_name(type_str).is_some() {
            return self.parse_logical_type(obj, type_str);
        }

        match type_str {
            "record" => self.parse_record_schema(obj),
            "enum" => self.parse_enum_schema(obj),
            "array" => self.parse_array_schema(obj),
            "map" => self.parse_map_schema(obj),
            "fixed" => self.parse_fixed_schema(obj),
            other => {
                if PrimitiveKind::from_name(other).is_some() {
                    self.parse_string_schema(other)
                } else {
                    // The type attribute may itself be a named reference.
                    self.parse_string_schema(other).map_err(|_| {
                        SchemaError::UnsupportedType(format!("Unknown type: {other}"))
                    })
                }
            }
        }
    }

    /// Parse a union from a JSON array.
    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<AvroSchema, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let mut branches = Vec::with_capacity(arr.len());
        for v in arr {
            branches.push(self.parse(v)?);
        }
        self.validate_union(&branches)?;

        Ok(AvroSchema::Union(UnionSchema::new(branches)))
    }

    fn parse_record_schema(
        &mut self,
        obj: &serde_json::Map<String, Value>,
    ) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_type_name(obj, "Record")?;
        let fullname = make_fullname(&name, namespace.as_deref());

        // Register before parsing fields so recursive references resolve.
        self.register(&fullname, AvroSchema::Ref(fullname.clone()))?;

        let prev_namespace = self.current_namespace.clone();
        if namespace.is_some() {
            self.current_namespace = namespace.clone();
        }

        let doc = obj.get("doc").and_then(|v| v.as_str()).map(String::from);
        let aliases = parse_aliases(obj);

        let fields_value = obj.get("fields").and_then(|v| v.as_array()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("Record '{fullname}' missing 'fields' array"))
        })?;

        let mut fields: Vec<FieldSchema> = Vec::with_capacity(fields_value.len());
        for value in fields_value {
            let field = self.parse_field_schema(value)?;
            if fields.iter().any(|f| f.name == field.name) {
                self.current_namespace = prev_namespace;
                return Err(SchemaError::InvalidSchema(format!(
                    "Record '{fullname}' has duplicate field '{}'",
                    field.name
                )));
            }
            fields.push(field);
        }

        self.current_namespace = prev_namespace;

        let record = RecordSchema {
            name: Some(name),
            namespace,
            doc,
            aliases,
            fields,
            logical_type: obj
                .get("logicalType")
                .and_then(|v| v.as_str())
                .map(String::from),
        };

        let schema = AvroSchema::Record(record);
        self.named_types.insert(fullname, schema.clone());

        Ok(schema)
    }

    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema("Field must be an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'name'".to_string()))?
            .to_string();
        validate_name(&name, "Field")?;

        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema(format!("Field '{name}' missing 'type'")))?;
        let schema = self.parse(type_value)?;

        let order = match obj.get("order").and_then(|v| v.as_str()) {
            Some(s) => Some(FieldOrder::from_name(s).ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Field '{name}' has invalid order '{s}'"))
            })?),
            None => None,
        };

        Ok(FieldSchema {
            name,
            schema,
            doc: obj.get("doc").and_then(|v| v.as_str()).map(String::from),
            default: obj.get("default").cloned(),
            order,
            aliases: parse_aliases(obj),
            optional: false,
        })
    }

    fn parse_enum_schema(
        &mut self,
        obj: &serde_json::Map<String, Value>,
    ) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_type_name(obj, "Enum")?;
        let fullname = make_fullname(&name, namespace.as_deref());

        let symbols = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Enum '{fullname}' missing 'symbols' array"))
            })?
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect::<Vec<_>>();

        if symbols.is_empty() {
            return Err(SchemaError::InvalidSchema(format!(
                "Enum '{fullname}' must have at least one symbol"
            )));
        }
        for symbol in &symbols {
            validate_name(symbol, "Enum symbol")?;
        }

        let default = obj
            .get("default")
            .and_then(|v| v.as_str())
            .map(String::from);
        if let Some(default) = &default {
            if !symbols.iter().any(|s| s == default) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{fullname}' default '{default}' is not one of its symbols"
                )));
            }
        }

        let schema = AvroSchema::Enum(EnumSchema {
            name: Some(name),
            namespace,
            doc: obj.get("doc").and_then(|v| v.as_str()).map(String::from),
            aliases: parse_aliases(obj),
            symbols,
            default,
        });
        self.register(&fullname, schema.clone())?;

        Ok(schema)
    }

    fn parse_array_schema(
        &mut self,
        obj: &serde_json::Map<String, Value>,
    ) -> Result<AvroSchema, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::InvalidSchema("Array missing 'items' field".to_string()))?;
        Ok(AvroSchema::Array(ArraySchema::new(self.parse(items)?)))
    }

    fn parse_map_schema(
        &mut self,
        obj: &serde_json::Map<String, Value>,
    ) -> Result<AvroSchema, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::InvalidSchema("Map missing 'values' field".to_string()))?;
        Ok(AvroSchema::Map(MapSchema::new(self.parse(values)?)))
    }

    fn parse_fixed_schema(
        &mut self,
        obj: &serde_json::Map<String, Value>,
    ) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_type_name(obj, "Fixed")?;
        let fullname = make_fullname(&name, namespace.as_deref());

        let size = obj.get("size").and_then(|v| v.as_u64()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("Fixed '{fullname}' missing 'size' field"))
        })?;

        let logical_type = obj
            .get("logicalType")
            .and_then(|v| v.as_str())
            .map(String::from);
        let precision = obj.get("precision").and_then(|v| v.as_u64());
        let scale = obj.get("scale").and_then(|v| v.as_u64());

        if logical_type.as_deref() == Some("decimal") {
            let precision = precision.ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Decimal '{fullname}' missing 'precision'"))
            })?;
            validate_decimal(precision, scale.unwrap_or(0), Some(size))?;
        }

        let schema = AvroSchema::Fixed(FixedSchema {
            name: Some(name),
            namespace,
            aliases: parse_aliases(obj),
            size: Some(size),
            logical_type,
            precision,
            scale,
        });
        self.register(&fullname, schema.clone())?;

        Ok(schema)
    }

    /// Parse a logical type annotation on a primitive base type.
    fn parse_logical_type(
        &mut self,
        obj: &serde_json::Map<String, Value>,
        type_str: &str,
    ) -> Result<AvroSchema, SchemaError> {
        let logical_type = obj
            .get("logicalType")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("logicalType must be a string".to_string()))?;

        let kind = PrimitiveKind::from_name(type_str).ok_or_else(|| {
            SchemaError::InvalidSchema(format!(
                "Invalid base type for logical type: {type_str}"
            ))
        })?;

        let mut schema = PrimitiveSchema::new(kind);

        match logical_type {
            "decimal" => {
                let precision = obj.get("precision").and_then(|v| v.as_u64()).ok_or_else(
                    || SchemaError::InvalidSchema("Decimal missing 'precision'".to_string()),
                )?;
                let scale = obj.get("scale").and_then(|v| v.as_u64()).unwrap_or(0);
                validate_decimal(precision, scale, None)?;
                schema.logical_type = Some("decimal".to_string());
                schema.precision = Some(precision);
                schema.scale = Some(scale);
            }
            "uuid" | "date" | "time-millis" | "time-micros" | "timestamp-millis"
            | "timestamp-micros" | "duration" | "local-timestamp-millis"
            | "local-timestamp-micros" => {
                schema.logical_type = Some(logical_type.to_string());
            }
            // Unknown logical types are ignored and the base type is used,
            // per the wire format's rules.
            _ => {}
        }

        Ok(AvroSchema::Primitive(schema))
    }

    /// Extract and validate the name/namespace of a named type definition.
    fn parse_type_name(
        &self,
        obj: &serde_json::Map<String, Value>,
        context: &str,
    ) -> Result<(String, Option<String>), SchemaError> {
        let raw = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("{context} missing 'name' field"))
            })?
            .to_string();

        let explicit_namespace = obj
            .get("namespace")
            .and_then(|v| v.as_str())
            .map(String::from);

        // A dotted name carries its own namespace.
        let (name, namespace) = match raw.rsplit_once('.') {
            Some((ns, n)) => (n.to_string(), Some(ns.to_string())),
            None => (
                raw,
                explicit_namespace.or_else(|| self.current_namespace.clone()),
            ),
        };

        validate_name(&name, context)?;
        Ok((name, namespace))
    }

    fn register(&mut self, fullname: &str, schema: AvroSchema) -> Result<(), SchemaError> {
        if self.named_types.contains_key(fullname) {
            return Err(SchemaError::InvalidSchema(format!(
                "Type '{fullname}' is defined more than once"
            )));
        }
        self.named_types.insert(fullname.to_string(), schema);
        Ok(())
    }

    /// Validate union composition: non-empty, no nested unions, no
    /// duplicate branches.
    fn validate_union(&self, branches: &[AvroSchema]) -> Result<(), SchemaError> {
        let mut seen = std::collections::HashSet::new();
        for (i, branch) in branches.iter().enumerate() {
            if matches!(branch, AvroSchema::Union(_)) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Union contains nested union at position {i}"
                )));
            }
            let key = type_key(branch);
            if !seen.insert(key.clone()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Union contains duplicate type '{key}' at position {i}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_aliases(obj: &serde_json::Map<String, Value>) -> Vec<String> {
    obj.get("aliases")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Validate that a name follows the format's naming rules: it must start
/// with a letter or underscore and contain only alphanumerics and
/// underscores.
fn validate_name(name: &str, context: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let first = chars.next().ok_or_else(|| {
        SchemaError::InvalidSchema(format!("{context} name cannot be empty"))
    })?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(SchemaError::InvalidSchema(format!(
            "{context} name '{name}' must start with a letter or underscore"
        )));
    }
    for ch in chars {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(SchemaError::InvalidSchema(format!(
                "{context} name '{name}' contains invalid character '{ch}'"
            )));
        }
    }
    Ok(())
}

/// Validate decimal parameters. `size` is given for fixed-backed decimals
/// and bounds the representable precision.
fn validate_decimal(precision: u64, scale: u64, size: Option<u64>) -> Result<(), SchemaError> {
    if precision == 0 {
        return Err(SchemaError::InvalidSchema(
            "Decimal precision must be at least 1".to_string(),
        ));
    }
    if scale > precision {
        return Err(SchemaError::InvalidSchema(format!(
            "Decimal scale {scale} cannot exceed precision {precision}"
        )));
    }
    if let Some(size) = size {
        // A fixed of n bytes stores at most floor(log10(2^(8n-1) - 1))
        // decimal digits.
        let max_precision = ((8 * size - 1) as f64 * 2f64.log10()).floor() as u64;
        if precision > max_precision {
            return Err(SchemaError::InvalidSchema(format!(
                "Decimal precision {precision} does not fit in {size} bytes (max {max_precision})"
            )));
        }
    }
    Ok(())
}

/// A key identifying a branch type for union duplicate detection.
fn type_key(schema: &AvroSchema) -> String {
    match schema {
        AvroSchema::Primitive(p) => p.kind.as_str().to_string(),
        AvroSchema::Array(_) => "array".to_string(),
        AvroSchema::Map(_) => "map".to_string(),
        AvroSchema::Union(_) => "union".to_string(),
        AvroSchema::Record(r) => format!("record:{}", r.fullname().unwrap_or_default()),
        AvroSchema::Enum(e) => format!("enum:{}", e.fullname().unwrap_or_default()),
        AvroSchema::Fixed(f) => format!("fixed:{}", f.fullname().unwrap_or_default()),
        AvroSchema::Ref(n) => format!("named:{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitive_strings() {
        assert_eq!(parse_schema(r#""null""#).unwrap(), AvroSchema::null());
        assert_eq!(parse_schema(r#""long""#).unwrap(), AvroSchema::long());
        assert_eq!(parse_schema(r#""string""#).unwrap(), AvroSchema::string());
    }

    #[test]
    fn test_parse_record_with_recursive_reference() {
        let json = r#"{
            "type": "record",
            "name": "LinkedList",
            "fields": [
                {"name": "value", "type": "int"},
                {"name": "next", "type": ["null", "LinkedList"]}
            ]
        }"#;
        let schema = parse_schema(json).unwrap();
        match schema {
            AvroSchema::Record(r) => match &r.fields[1].schema {
                AvroSchema::Union(u) => {
                    assert_eq!(u.branches[1], AvroSchema::Ref("LinkedList".to_string()));
                }
                other => panic!("expected union, got {other:?}"),
            },
            other => panic!("expected record, got {other:?}"),
        }
    }

    #[test]
    fn test_unresolved_reference_is_an_error() {
        let json = r#"{
            "type": "record",
            "name": "r",
            "fields": [{"name": "x", "type": "Missing"}]
        }"#;
        assert!(parse_schema(json).is_err());
    }

    #[test]
    fn test_nested_union_rejected() {
        let json = r#"["int", ["null", "string"]]"#;
        let err = parse_schema(json).unwrap_err();
        assert!(err.to_string().contains("nested union"));
    }

    #[test]
    fn test_duplicate_union_branch_rejected() {
        let err = parse_schema(r#"["int", "int"]"#).unwrap_err();
        assert!(err.to_string().contains("duplicate type"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let json = r#"{"type": "record", "name": "1bad", "fields": []}"#;
        assert!(parse_schema(json).is_err());
    }

    #[test]
    fn test_decimal_scale_cannot_exceed_precision() {
        let json = r#"{"type": "bytes", "logicalType": "decimal", "precision": 4, "scale": 6}"#;
        let err = parse_schema(json).unwrap_err();
        assert!(err.to_string().contains("cannot exceed precision"));
    }

    #[test]
    fn test_fixed_decimal_capacity() {
        // 2 bytes hold at most 4 digits of precision.
        let ok = r#"{"type": "fixed", "name": "f", "size": 2,
                     "logicalType": "decimal", "precision": 4, "scale": 2}"#;
        assert!(parse_schema(ok).is_ok());

        let too_big = r#"{"type": "fixed", "name": "g", "size": 2,
                          "logicalType": "decimal", "precision": 6, "scale": 2}"#;
        let err = parse_schema(too_big).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn test_unknown_logical_type_falls_back_to_base() {
        let json = r#"{"type": "string", "logicalType": "homemade"}"#;
        assert_eq!(parse_schema(json).unwrap(), AvroSchema::string());
    }

    #[test]
    fn test_enum_default_checked() {
        let json = r#"{"type": "enum", "name": "e", "symbols": ["A", "B"], "default": "C"}"#;
        let err = parse_schema(json).unwrap_err();
        assert!(err.to_string().contains("not one of its symbols"));
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let json = r#"{
            "type": "record",
            "name": "outer",
            "fields": [
                {"name": "a", "type": {"type": "fixed", "name": "f", "size": 4}},
                {"name": "b", "type": {"type": "fixed", "name": "f", "size": 8}}
            ]
        }"#;
        let err = parse_schema(json).unwrap_err();
        assert!(err.to_string().contains("defined more than once"));
    }
}
