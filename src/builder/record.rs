//! Record and field construction.
//!
//! A `RecordBuilder` collects the fields of one record under
//! construction. Field options are split between attributes of the field
//! itself (doc, default, order, aliases) and attributes forwarded to the
//! field's type; the split is an explicit whitelist, not dynamic
//! forwarding.

use serde_json::Value;

use crate::builder::context::SchemaBuilder;
use crate::builder::factory::{
    self, expect_str, expect_string_array, Site, TypeConfig, TypeInput,
};
use crate::error::BuilderError;
use crate::schema::types::{AvroSchema, FieldOrder, FieldSchema, RecordSchema};

/// Builder for the fields and attributes of one record.
pub struct RecordBuilder<'a> {
    record: RecordSchema,
    /// Underscore-joined chain of enclosing names, used to synthesize
    /// names for anonymous nested types.
    fragment: String,
    ctx: &'a mut SchemaBuilder,
}

/// Field attributes recognized in a field's configuration options.
/// Everything else is forwarded to the field's type.
#[derive(Default)]
struct FieldAttributes {
    doc: Option<String>,
    default: Option<Value>,
    order: Option<FieldOrder>,
    aliases: Vec<String>,
}

impl<'a> RecordBuilder<'a> {
    pub(crate) fn new(record: RecordSchema, fragment: String, ctx: &'a mut SchemaBuilder) -> Self {
        Self {
            record,
            fragment,
            ctx,
        }
    }

    pub(crate) fn into_record(self) -> RecordSchema {
        self.record
    }

    /// The namespace of the record under construction.
    pub fn namespace(&self) -> Option<&str> {
        self.record.namespace.as_deref()
    }

    /// Set the record's documentation.
    pub fn doc(&mut self, doc: impl Into<String>) -> &mut Self {
        self.record.doc = Some(doc.into());
        self
    }

    /// Set the record's aliases.
    pub fn aliases(&mut self, aliases: &[&str]) -> &mut Self {
        self.record.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Add a required field.
    pub fn required(
        &mut self,
        name: &str,
        ty: impl Into<TypeInput>,
    ) -> Result<(), BuilderError> {
        self.add_field(name, ty.into(), TypeConfig::new(), false)
    }

    /// Add a required field with configuration options.
    pub fn required_with(
        &mut self,
        name: &str,
        ty: impl Into<TypeInput>,
        config: TypeConfig,
    ) -> Result<(), BuilderError> {
        self.add_field(name, ty.into(), config, false)
    }

    /// Add an optional field, serialized as a union of null and the type.
    pub fn optional(
        &mut self,
        name: &str,
        ty: impl Into<TypeInput>,
    ) -> Result<(), BuilderError> {
        self.add_field(name, ty.into(), TypeConfig::new(), true)
    }

    /// Add an optional field with configuration options.
    pub fn optional_with(
        &mut self,
        name: &str,
        ty: impl Into<TypeInput>,
        config: TypeConfig,
    ) -> Result<(), BuilderError> {
        self.add_field(name, ty.into(), config, true)
    }

    /// Add a required field whose type is a record defined inline.
    pub fn required_record<F>(
        &mut self,
        name: &str,
        config: TypeConfig,
        body: F,
    ) -> Result<(), BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        self.record_field(name, config, false, body)
    }

    /// Add an optional field whose type is a record defined inline.
    pub fn optional_record<F>(
        &mut self,
        name: &str,
        config: TypeConfig,
        body: F,
    ) -> Result<(), BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        self.record_field(name, config, true, body)
    }

    /// Copy the fields of a previously defined record into this one.
    ///
    /// Copied fields land before any fields declared after this call;
    /// re-declaring one of them later overrides it in place, keeping its
    /// original position.
    pub fn extends(&mut self, name: &str) -> Result<(), BuilderError> {
        let namespace = self.record.namespace.clone();
        self.extends_impl(name, namespace.as_deref())
    }

    /// Like `extends`, resolving the record in an explicit namespace.
    pub fn extends_from(&mut self, name: &str, namespace: &str) -> Result<(), BuilderError> {
        self.extends_impl(name, Some(namespace))
    }

    fn extends_impl(&mut self, name: &str, namespace: Option<&str>) -> Result<(), BuilderError> {
        let target = self.ctx.lookup_named_type(name, namespace)?;
        let AvroSchema::Record(source) = target else {
            return Err(BuilderError::Attribute(format!(
                "cannot extend '{name}': it is not a record"
            )));
        };
        // The copies are independent field values; changing one later
        // does not touch the original definition.
        for field in source.fields {
            self.record.put_field(field);
        }
        Ok(())
    }

    fn add_field(
        &mut self,
        name: &str,
        input: TypeInput,
        config: TypeConfig,
        optional: bool,
    ) -> Result<(), BuilderError> {
        let (attrs, type_config) = split_field_config(&config)?;
        let schema = self.resolve_field_type(name, input, &type_config)?;
        self.push_field(name, schema, attrs, optional);
        Ok(())
    }

    fn resolve_field_type(
        &mut self,
        field_name: &str,
        input: TypeInput,
        type_config: &TypeConfig,
    ) -> Result<AvroSchema, BuilderError> {
        match input {
            TypeInput::Node(node) => Ok(node),
            TypeInput::Name(kind) if factory::is_builtin(&kind) => {
                let site = Site::Inline {
                    fragment: &self.fragment,
                    field_name,
                };
                let node = factory::create_and_configure(
                    self.ctx,
                    &kind,
                    site,
                    None,
                    self.record.namespace.as_deref(),
                    type_config,
                )?;
                node.validate(Some(field_name))?;
                if node.is_named() {
                    self.ctx.cache_mut().add(&node)?;
                }
                Ok(node)
            }
            TypeInput::Name(name) => self
                .ctx
                .resolve_type_ref(&name, self.record.namespace.as_deref()),
        }
    }

    fn record_field<F>(
        &mut self,
        field_name: &str,
        config: TypeConfig,
        optional: bool,
        body: F,
    ) -> Result<(), BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        let (attrs, type_config) = split_field_config(&config)?;
        let site = Site::Inline {
            fragment: &self.fragment,
            field_name,
        };
        let node = factory::create_and_configure(
            self.ctx,
            "record",
            site,
            None,
            self.record.namespace.as_deref(),
            &type_config,
        )?;
        let AvroSchema::Record(record) = node else {
            return Err(BuilderError::InvalidType("record".to_string()));
        };

        let declared_name = match record.name.clone() {
            Some(name) => name,
            None => {
                return Err(BuilderError::required_attribute(
                    "record",
                    "name",
                    Some(field_name),
                    None,
                ))
            }
        };
        let fullname = self.ctx.cache_mut().declare(
            &declared_name,
            record.namespace.as_deref(),
            &AvroSchema::Record(record.clone()),
        )?;

        // Nested anonymous types chain through the explicit name when one
        // was given, otherwise through the field name.
        let base = type_config
            .get("type_name")
            .and_then(|v| v.as_str())
            .unwrap_or(field_name);
        let child_fragment = format!("{}_{}", self.fragment, base);

        let mut builder = RecordBuilder::new(record, child_fragment, &mut *self.ctx);
        body(&mut builder)?;
        let record = builder.into_record();

        let node = AvroSchema::Record(record);
        node.validate(Some(field_name))?;
        self.ctx.cache_mut().finalize(&fullname, node.clone());

        self.push_field(field_name, node, attrs, optional);
        Ok(())
    }

    fn push_field(
        &mut self,
        name: &str,
        schema: AvroSchema,
        attrs: FieldAttributes,
        optional: bool,
    ) {
        self.record.put_field(FieldSchema {
            name: name.to_string(),
            schema,
            doc: attrs.doc,
            default: attrs.default,
            order: attrs.order,
            aliases: attrs.aliases,
            optional,
        });
    }
}

/// Split field options into the field's own attributes and the options
/// forwarded to the field's type.
fn split_field_config(config: &TypeConfig) -> Result<(FieldAttributes, TypeConfig), BuilderError> {
    let mut attrs = FieldAttributes::default();
    let mut type_config = TypeConfig::new();
    for (key, value) in config.entries() {
        match key.as_str() {
            "doc" => attrs.doc = Some(expect_str(key, value)?.to_string()),
            "default" => attrs.default = Some(value.clone()),
            "order" => {
                let order = expect_str(key, value)?;
                attrs.order = Some(FieldOrder::from_name(order).ok_or_else(|| {
                    BuilderError::Attribute(format!(
                        "'order' must be one of ascending, descending, ignore; got '{order}'"
                    ))
                })?);
            }
            "aliases" => attrs.aliases = expect_string_array(key, value)?,
            _ => type_config.push(key.clone(), value.clone()),
        }
    }
    Ok((attrs, type_config))
}
