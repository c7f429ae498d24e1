//! Declarative Avro schema construction.
//!
//! This library builds Avro schemas programmatically: records, enums,
//! fixed types, arrays, maps, and unions, with namespaces, aliases,
//! defaults, documentation, and references between named types. The
//! result renders as a canonical JSON schema document or as a validated
//! in-memory schema.
//!
//! Named types are registered in a per-session definition cache and can
//! be referenced by short name (while unique) or fullname; references to
//! types that are not defined locally can be satisfied by definition
//! files found under configured search paths. Serialization emits each
//! named type's full definition exactly once and bare fullname references
//! afterwards, which is what makes recursive record types expressible.
//!
//! # Example
//! ```
//! let json = lancaster::build(|b| {
//!     b.record("r", |r| {
//!         r.required("n", "null")?;
//!         r.optional("l", "long")?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })
//! .unwrap();
//! assert!(json.contains("\"name\": \"r\""));
//! ```

pub mod builder;
pub mod error;
pub mod loader;
pub mod schema;
pub mod store;

// Re-export main types
pub use builder::{DefinitionCache, RecordBuilder, SchemaBuilder, TypeConfig, TypeInput};
pub use error::{BuilderError, LoaderError, SchemaError};
pub use loader::{DirectoryLoader, Loader, LoaderConfig};
pub use schema::{
    parse_schema, serialize, ArraySchema, AvroSchema, EnumSchema, FieldOrder, FieldSchema,
    FixedSchema, MapSchema, PrimitiveKind, PrimitiveSchema, RecordSchema, ReferenceState,
    SchemaParser, UnionSchema,
};
pub use store::SchemaStore;

/// Build a schema and return its canonical JSON document, validated by
/// the full parser.
///
/// The closure drives a fresh, isolated build session; its last defined
/// type is the result.
pub fn build<F>(f: F) -> Result<String, BuilderError>
where
    F: FnOnce(&mut SchemaBuilder) -> Result<(), BuilderError>,
{
    let mut builder = SchemaBuilder::new();
    f(&mut builder)?;
    let json = builder.to_json_pretty()?;
    builder.as_schema()?;
    Ok(json)
}

/// Build a schema and return the validated in-memory schema object.
pub fn build_schema<F>(f: F) -> Result<AvroSchema, BuilderError>
where
    F: FnOnce(&mut SchemaBuilder) -> Result<(), BuilderError>,
{
    let mut builder = SchemaBuilder::new();
    f(&mut builder)?;
    builder.as_schema()
}
