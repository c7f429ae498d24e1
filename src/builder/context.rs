//! The stateful build session.
//!
//! A `SchemaBuilder` owns one definition cache and drives one schema
//! build: type definitions, named-type resolution (including deferred
//! loads through the loader), namespace tracking, and the result
//! accessors. Each build should use its own `SchemaBuilder`; sharing one
//! across concurrent builds is not supported.

use std::collections::HashSet;
use std::path::PathBuf;

use serde_json::{json, Value};

use crate::builder::cache::DefinitionCache;
use crate::builder::factory::{self, Site, TypeConfig, TypeInput};
use crate::builder::record::RecordBuilder;
use crate::error::{BuilderError, LoaderError, SchemaError};
use crate::loader::{DirectoryLoader, Loader};
use crate::schema::parser::SchemaParser;
use crate::schema::serializer::{serialize, ReferenceState};
use crate::schema::types::{make_fullname, ArraySchema, AvroSchema, MapSchema, UnionSchema};

/// A schema build session.
///
/// # Example
/// ```
/// use lancaster::SchemaBuilder;
///
/// let mut builder = SchemaBuilder::new();
/// builder
///     .record("point", |r| {
///         r.required("x", "double")?;
///         r.required("y", "double")?;
///         Ok(())
///     })
///     .unwrap();
/// let json = builder.to_json().unwrap();
/// assert!(json.contains("\"point\""));
/// ```
pub struct SchemaBuilder {
    cache: DefinitionCache,
    namespace: Option<String>,
    last: Option<AvroSchema>,
    loader: Box<dyn Loader>,
    /// Names already handed to the loader during implicit resolution, so
    /// a name the loader could not produce is not searched again.
    import_attempts: HashSet<String>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Create a session with a directory loader and no search paths.
    pub fn new() -> Self {
        Self::with_loader(Box::new(DirectoryLoader::default()))
    }

    /// Create a session with the given loader.
    pub fn with_loader(loader: Box<dyn Loader>) -> Self {
        Self {
            cache: DefinitionCache::new(),
            namespace: None,
            last: None,
            loader,
            import_attempts: HashSet::new(),
        }
    }

    /// Add a root directory for the loader to scan when resolving
    /// external definitions.
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.loader.add_search_path(path.into());
        self
    }

    /// Set the namespace applied to definitions that do not specify one.
    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// The namespace currently in effect.
    pub fn current_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The last type produced by this session, i.e. the build result.
    pub fn last_type(&self) -> Option<&AvroSchema> {
        self.last.as_ref()
    }

    pub(crate) fn cache_mut(&mut self) -> &mut DefinitionCache {
        &mut self.cache
    }

    /// Define a record.
    pub fn record<F>(&mut self, name: &str, body: F) -> Result<&AvroSchema, BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        self.record_with(name, TypeConfig::new(), body)
    }

    /// Define a record with configuration options.
    ///
    /// The record is forward-declared in the cache before the body runs,
    /// so fields inside the body can reference the record itself;
    /// validation happens after the body and before the definition is
    /// finalized.
    pub fn record_with<F>(
        &mut self,
        name: &str,
        config: TypeConfig,
        body: F,
    ) -> Result<&AvroSchema, BuilderError>
    where
        F: FnOnce(&mut RecordBuilder<'_>) -> Result<(), BuilderError>,
    {
        let namespace = self.namespace.clone();
        let node = factory::create_and_configure(
            self,
            "record",
            Site::TopLevel,
            Some(name),
            namespace.as_deref(),
            &config,
        )?;
        let AvroSchema::Record(record) = node else {
            return Err(BuilderError::InvalidType("record".to_string()));
        };

        let fullname = self.cache.declare(
            name,
            record.namespace.as_deref(),
            &AvroSchema::Record(record.clone()),
        )?;
        let fragment = name.to_string();

        let mut builder = RecordBuilder::new(record, fragment, self);
        body(&mut builder)?;
        let record = builder.into_record();

        let node = AvroSchema::Record(record);
        node.validate(None)?;
        self.cache.finalize(&fullname, node.clone());
        Ok(self.last.insert(node))
    }

    /// Define an enum with the given symbols.
    pub fn enum_type(&mut self, name: &str, symbols: &[&str]) -> Result<&AvroSchema, BuilderError> {
        self.enum_with(name, symbols, TypeConfig::new())
    }

    /// Define an enum with configuration options. Symbols given as an
    /// argument may be overridden by a `symbols` option.
    pub fn enum_with(
        &mut self,
        name: &str,
        symbols: &[&str],
        config: TypeConfig,
    ) -> Result<&AvroSchema, BuilderError> {
        let mut merged = TypeConfig::new();
        if !symbols.is_empty() {
            merged.push("symbols", json!(symbols));
        }
        for (key, value) in config.entries() {
            merged.push(key.clone(), value.clone());
        }
        self.named_type(name, "enum", merged)
    }

    /// Define a fixed type of the given size.
    pub fn fixed(&mut self, name: &str, size: u64) -> Result<&AvroSchema, BuilderError> {
        self.fixed_with(name, TypeConfig::new().set("size", size))
    }

    /// Define a fixed type with configuration options.
    pub fn fixed_with(
        &mut self,
        name: &str,
        config: TypeConfig,
    ) -> Result<&AvroSchema, BuilderError> {
        self.named_type(name, "fixed", config)
    }

    fn named_type(
        &mut self,
        name: &str,
        kind: &str,
        config: TypeConfig,
    ) -> Result<&AvroSchema, BuilderError> {
        let namespace = self.namespace.clone();
        let node = factory::create_and_configure(
            self,
            kind,
            Site::TopLevel,
            Some(name),
            namespace.as_deref(),
            &config,
        )?;
        node.validate(None)?;
        self.cache.add(&node)?;
        Ok(self.last.insert(node))
    }

    /// Resolve and load an external definition by name.
    ///
    /// The definitions it contains join this session's cache, and the
    /// imported top-level type becomes the session's last type. The
    /// current namespace is restored afterwards, whether or not the
    /// import succeeds.
    pub fn import(&mut self, name: &str) -> Result<&AvroSchema, BuilderError> {
        let node = self.guarded_import(name)?;
        Ok(self.last.insert(node))
    }

    fn guarded_import(&mut self, name: &str) -> Result<AvroSchema, BuilderError> {
        let saved = self.namespace.clone();
        let result = self.import_inner(name);
        self.namespace = saved;
        result
    }

    fn import_inner(&mut self, name: &str) -> Result<AvroSchema, BuilderError> {
        let source = self.loader.find(name)?;
        self.loader.load(&source, &mut self.cache)
    }

    /// Resolve a name to a previously defined named type.
    ///
    /// Tries the namespace-qualified fullname first, then asks the loader
    /// for a definition if the short name has never been seen, then
    /// retries without the namespace. Fails if all of that comes up
    /// empty, or if the short name is ambiguous among this session's
    /// definitions.
    pub fn lookup_named_type(
        &mut self,
        key: &str,
        namespace: Option<&str>,
    ) -> Result<AvroSchema, BuilderError> {
        let key_str = make_fullname(key, namespace);
        if let Some(node) = self.cache.get(&key_str) {
            return Ok(node.clone());
        }

        if !self.cache.name_seen(key) && !self.import_attempts.contains(key) {
            self.import_attempts.insert(key.to_string());
            match self.guarded_import(key) {
                Ok(_) => {
                    if let Some(node) = self.cache.get(&key_str) {
                        return Ok(node.clone());
                    }
                }
                // A name the loader cannot produce is reported as an
                // unresolved definition below, not as a loader failure.
                Err(BuilderError::Loader(LoaderError::NotFound(_))) => {}
                Err(other) => return Err(other),
            }
        }

        if namespace.is_some() {
            return self.lookup_named_type(key, None);
        }
        Err(BuilderError::definition_not_found(key))
    }

    /// Resolve a type name: a builtin kind yields a fresh node, anything
    /// else must name a previously defined type and yields a reference.
    pub(crate) fn resolve_type_ref(
        &mut self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<AvroSchema, BuilderError> {
        if factory::is_builtin(name) {
            return factory::create_builtin(name);
        }
        let node = self.lookup_named_type(name, namespace)?;
        let fullname = node
            .fullname()
            .ok_or_else(|| BuilderError::definition_not_found(name))?;
        Ok(AvroSchema::Ref(fullname))
    }

    pub(crate) fn resolve_input(
        &mut self,
        input: TypeInput,
        namespace: Option<&str>,
    ) -> Result<AvroSchema, BuilderError> {
        match input {
            TypeInput::Node(node) => Ok(node),
            TypeInput::Name(name) => self.resolve_type_ref(&name, namespace),
        }
    }

    /// An anonymous array of the given item type.
    pub fn array_of(&mut self, items: impl Into<TypeInput>) -> Result<AvroSchema, BuilderError> {
        let items = self.resolve_input(items.into(), None)?;
        Ok(AvroSchema::Array(ArraySchema::new(items)))
    }

    /// An anonymous map with the given value type.
    pub fn map_of(&mut self, values: impl Into<TypeInput>) -> Result<AvroSchema, BuilderError> {
        let values = self.resolve_input(values.into(), None)?;
        Ok(AvroSchema::Map(MapSchema::new(values)))
    }

    /// An anonymous union of the given branch types.
    pub fn union_of<I>(&mut self, branches: Vec<I>) -> Result<AvroSchema, BuilderError>
    where
        I: Into<TypeInput>,
    {
        let mut resolved = Vec::with_capacity(branches.len());
        for branch in branches {
            resolved.push(self.resolve_input(branch.into(), None)?);
        }
        Ok(AvroSchema::Union(UnionSchema::new(resolved)))
    }

    /// Render the last type as a canonical document tree.
    ///
    /// Every call uses a fresh reference state, so repeated calls produce
    /// identical documents.
    pub fn to_value(&self) -> Result<Value, BuilderError> {
        let node = self.last.as_ref().ok_or(BuilderError::EmptyBuild)?;
        let mut state = ReferenceState::new();
        serialize(node, &self.cache, &mut state)
    }

    /// Render the last type as canonical JSON text.
    pub fn to_json(&self) -> Result<String, BuilderError> {
        Ok(self.to_value()?.to_string())
    }

    /// Render the last type as pretty-printed canonical JSON text.
    pub fn to_json_pretty(&self) -> Result<String, BuilderError> {
        serde_json::to_string_pretty(&self.to_value()?)
            .map_err(|e| SchemaError::ParseError(e.to_string()).into())
    }

    /// Run the canonical document through the full parser/validator and
    /// return the validated schema.
    pub fn as_schema(&self) -> Result<AvroSchema, BuilderError> {
        let value = self.to_value()?;
        let mut parser = SchemaParser::new();
        parser.parse(&value).map_err(Into::into)
    }
}
