//! Schema types, canonical serialization, and document parsing.
//!
//! This module defines the schema type system the builder constructs,
//! the serializer that renders a schema graph into its canonical JSON
//! document (with define-once/reference-after handling of named types),
//! and the strict parser that turns a canonical document back into a
//! validated schema.

pub mod parser;
pub mod serializer;
pub mod types;

pub use parser::{parse_schema, SchemaParser};
pub use serializer::{serialize, ReferenceState};
pub use types::*;
