//! Tests for external definition loading: imports, deferred resolution,
//! ambiguous files, and the schema store.

use serde_json::json;

use lancaster::{
    BuilderError, LoaderConfig, LoaderError, SchemaBuilder, SchemaError, SchemaStore,
};

const DEFINITIONS: &str = "tests/definitions";

fn builder_with_definitions() -> SchemaBuilder {
    let mut builder = SchemaBuilder::new();
    builder.add_search_path(DEFINITIONS);
    builder
}

// ============================================================================
// Explicit Imports
// ============================================================================

#[test]
fn test_import_by_name() {
    let mut builder = builder_with_definitions();
    builder.import("address").unwrap();

    assert_eq!(
        builder.to_value().unwrap(),
        json!({
            "type": "record",
            "name": "address",
            "fields": [
                {"name": "street", "type": "string"},
                {"name": "city", "type": "string"}
            ]
        })
    );
}

#[test]
fn test_import_by_fullname_maps_dots_to_directories() {
    let mut builder = builder_with_definitions();
    builder.import("com.example.user").unwrap();

    let value = builder.to_value().unwrap();
    assert_eq!(value["name"], json!("user"));
    assert_eq!(value["namespace"], json!("com.example"));
}

#[test]
fn test_import_missing_definition_fails() {
    let mut builder = builder_with_definitions();
    let err = builder.import("no_such_definition").unwrap_err();
    assert!(matches!(
        err,
        BuilderError::Loader(LoaderError::NotFound(_))
    ));
}

#[test]
fn test_imported_definition_is_referenceable() {
    let mut builder = builder_with_definitions();
    builder.import("address").unwrap();
    builder
        .record("person", |r| {
            r.required("name", "string")?;
            r.required("home", "address")
        })
        .unwrap();

    let value = builder.to_value().unwrap();
    assert_eq!(value["fields"][1]["type"]["name"], json!("address"));
}

// ============================================================================
// Namespace Save/Restore
// ============================================================================

#[test]
fn test_namespace_restored_after_import() {
    let mut builder = builder_with_definitions();
    builder.namespace("com.acme");
    builder.import("address").unwrap();
    assert_eq!(builder.current_namespace(), Some("com.acme"));
}

#[test]
fn test_namespace_restored_after_failed_import() {
    let mut builder = builder_with_definitions();
    builder.namespace("com.acme");
    builder.import("no_such_definition").unwrap_err();
    assert_eq!(builder.current_namespace(), Some("com.acme"));
}

// ============================================================================
// Deferred Resolution
// ============================================================================

#[test]
fn test_unknown_reference_loaded_on_demand() {
    let mut builder = builder_with_definitions();
    builder
        .record("person", |r| {
            r.required("name", "string")?;
            r.required("home", "address")
        })
        .unwrap();

    let value = builder.to_value().unwrap();
    assert_eq!(
        value["fields"][1]["type"],
        json!({
            "type": "record",
            "name": "address",
            "fields": [
                {"name": "street", "type": "string"},
                {"name": "city", "type": "string"}
            ]
        })
    );
}

#[test]
fn test_unknown_reference_without_search_paths_fails_cleanly() {
    let mut builder = SchemaBuilder::new();
    let err = builder
        .record("r", |r| r.required("home", "address"))
        .unwrap_err();
    assert!(matches!(err, BuilderError::DefinitionNotFound { .. }));
}

#[test]
fn test_ambiguous_definition_files_rejected() {
    let mut builder = builder_with_definitions();
    let err = builder
        .record("r", |r| r.required("d", "dup"))
        .unwrap_err();
    match err {
        BuilderError::Loader(LoaderError::Ambiguous { name, matches }) => {
            assert_eq!(name, "dup");
            assert_eq!(matches.len(), 2);
        }
        other => panic!("expected ambiguous loader error, got {other}"),
    }
}

// ============================================================================
// Schema Store
// ============================================================================

#[test]
fn test_store_builds_and_memoizes() {
    let mut store = SchemaStore::new(LoaderConfig::new().with_path(DEFINITIONS));
    let schema = store.find("user", Some("com.example")).unwrap();
    assert_eq!(schema.fullname().as_deref(), Some("com.example.user"));

    // Second lookup is served from the memo.
    let again = store.find("com.example.user", None).unwrap();
    assert_eq!(again.fullname().as_deref(), Some("com.example.user"));
}

#[test]
fn test_store_rejects_wrong_fullname() {
    let mut store = SchemaStore::new(LoaderConfig::new().with_path(DEFINITIONS));
    let err = store.find("misnamed", None).unwrap_err();
    match err {
        BuilderError::Schema(SchemaError::WrongType { actual, expected }) => {
            assert_eq!(actual, "other");
            assert_eq!(expected, "misnamed");
        }
        other => panic!("expected wrong-type error, got {other}"),
    }
}
