//! The schema construction engine.
//!
//! `SchemaBuilder` is the stateful session a caller drives; the
//! definition cache is its symbol table, the type factory constructs
//! nodes from kind tags and configuration options, and `RecordBuilder`
//! handles field construction.

pub mod cache;
pub mod context;
pub mod factory;
pub mod record;

pub use cache::DefinitionCache;
pub use context::SchemaBuilder;
pub use factory::{is_builtin, TypeConfig, TypeInput, COMPLEX_TYPE_NAMES};
pub use record::RecordBuilder;
