//! Error types for schema construction

use std::io;
use thiserror::Error;

/// Errors that can occur while constructing a schema.
///
/// All of these are authoring-time errors: they abort the current build and
/// propagate to the top-level entry point. There is no partial-result
/// recovery.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// Unknown builtin type name given to the type factory
    #[error("invalid builtin type: {0}")]
    InvalidType(String),

    /// A structurally mandatory attribute is missing
    #[error("attribute '{attribute}' missing for {location}type '{kind}'")]
    RequiredAttribute {
        kind: &'static str,
        attribute: &'static str,
        location: String,
    },

    /// Two definitions registered under the same fullname in one session
    #[error("definition for '{fullname}' already exists\nexisting definition:\n{existing}\nnew definition:\n{duplicate}")]
    DuplicateDefinition {
        fullname: String,
        existing: String,
        duplicate: String,
    },

    /// A named-type reference could not be resolved locally or via the loader
    #[error("definition not found for '{name}'.{hint}")]
    DefinitionNotFound { name: String, hint: &'static str },

    /// An attribute was set on the wrong kind or through the wrong call site
    #[error("{0}")]
    Attribute(String),

    /// No type has been defined yet in this build session
    #[error("no schema has been defined in this build")]
    EmptyBuild,

    /// Loader error
    #[error(transparent)]
    Loader(#[from] LoaderError),

    /// Canonical document parse/validation error
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl BuilderError {
    /// A required attribute is missing. The location names the enclosing
    /// field or type when one is known, so authoring errors are locatable.
    pub(crate) fn required_attribute(
        kind: &'static str,
        attribute: &'static str,
        field: Option<&str>,
        name: Option<&str>,
    ) -> Self {
        let location = match (field, name) {
            (Some(f), _) => format!("field '{f}' of "),
            (None, Some(n)) => format!("'{n}' of "),
            (None, None) => String::new(),
        };
        BuilderError::RequiredAttribute {
            kind,
            attribute,
            location,
        }
    }

    pub(crate) fn definition_not_found(name: &str) -> Self {
        let hint = if name.contains('.') {
            ""
        } else {
            " Try specifying the full namespace."
        };
        BuilderError::DefinitionNotFound {
            name: name.to_string(),
            hint,
        }
    }
}

/// Errors from the external-definition loader
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No definition file matched the requested name
    #[error("no definition file found for '{0}'")]
    NotFound(String),
    /// More than one definition file matched the requested name
    #[error("multiple definition files found for '{name}': {matches:?}")]
    Ambiguous { name: String, matches: Vec<String> },
    /// IO error while scanning or reading
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Errors that can occur while parsing or validating a canonical schema
/// document
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Invalid schema structure
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Unsupported or unknown type
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// Document is not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A schema resolved to a different fullname than the one requested
    #[error("expected schema '{actual}' to define type '{expected}'")]
    WrongType { actual: String, expected: String },
}
