//! External definition loading.
//!
//! When a reference names a type that has not been defined in the current
//! session, the loader locates a definition file for it under the
//! configured search paths, parses it, and registers the types it defines
//! into the session's cache. Dots in a requested name map to path
//! separators, so `test.example` is satisfied by any
//! `<root>/**/test/example.avsc`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::builder::DefinitionCache;
use crate::error::{BuilderError, LoaderError, SchemaError};
use crate::schema::parser::SchemaParser;
use crate::schema::types::AvroSchema;

/// File extension of external definition files.
const DEFINITION_EXTENSION: &str = "avsc";

/// Locates and evaluates external definitions.
///
/// `find` resolves a name to exactly one source; `load` evaluates a
/// source against the given cache. Implementations that have no notion
/// of search paths may ignore `add_search_path`.
pub trait Loader {
    /// Locate the single source for the named definition.
    fn find(&self, name: &str) -> Result<PathBuf, LoaderError>;

    /// Read and parse a source, registering every named type it defines
    /// into the cache. Returns the top-level type of the source.
    fn load(&self, source: &Path, cache: &mut DefinitionCache) -> Result<AvroSchema, BuilderError>;

    /// Add a root directory to scan.
    fn add_search_path(&mut self, path: PathBuf);
}

/// The set of root directories a `DirectoryLoader` scans.
///
/// Owned by the build session that uses it; there is no process-global
/// load path state.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    search_paths: Vec<PathBuf>,
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a search path, chainable.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn add_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

/// A loader that scans directories for `.avsc` definition files.
#[derive(Debug, Default)]
pub struct DirectoryLoader {
    config: LoaderConfig,
}

impl DirectoryLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// The path suffix a candidate file must end with to satisfy `name`.
    fn candidate_suffix(name: &str) -> String {
        format!("/{}.{}", name.replace('.', "/"), DEFINITION_EXTENSION)
    }
}

impl Loader for DirectoryLoader {
    fn find(&self, name: &str) -> Result<PathBuf, LoaderError> {
        let suffix = Self::candidate_suffix(name);
        let mut matches: Vec<PathBuf> = Vec::new();

        for root in self.config.paths() {
            let pattern = format!("{}/**/*.{}", root.display(), DEFINITION_EXTENSION);
            let entries = glob::glob(&pattern).map_err(|e| LoaderError::Io {
                path: pattern.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, e),
            })?;
            for path in entries.flatten() {
                if path.to_string_lossy().ends_with(&suffix) {
                    matches.push(path);
                }
            }
        }

        matches.sort();
        matches.dedup();

        match matches.len() {
            0 => Err(LoaderError::NotFound(name.to_string())),
            1 => {
                let path = matches.remove(0);
                debug!(name, path = %path.display(), "resolved definition file");
                Ok(path)
            }
            _ => Err(LoaderError::Ambiguous {
                name: name.to_string(),
                matches: matches
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
            }),
        }
    }

    fn load(&self, source: &Path, cache: &mut DefinitionCache) -> Result<AvroSchema, BuilderError> {
        debug!(path = %source.display(), "loading external definition");
        let text = fs::read_to_string(source).map_err(|e| LoaderError::Io {
            path: source.display().to_string(),
            source: e,
        })?;

        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {e}")))?;

        // Types defined by earlier imports are visible to this file.
        let mut parser = SchemaParser::with_known_types(cache.fullnames().cloned());
        let node = parser.parse(&value).map_err(BuilderError::from)?;

        register_named_types(cache, &node)?;
        Ok(node)
    }

    fn add_search_path(&mut self, path: PathBuf) {
        self.config.add_path(path);
    }
}

/// Register every named type defined in a schema tree into the cache, in
/// definition order.
pub(crate) fn register_named_types(
    cache: &mut DefinitionCache,
    node: &AvroSchema,
) -> Result<(), BuilderError> {
    match node {
        AvroSchema::Record(record) => {
            cache.add(node)?;
            for field in &record.fields {
                register_named_types(cache, &field.schema)?;
            }
        }
        AvroSchema::Enum(_) | AvroSchema::Fixed(_) => {
            cache.add(node)?;
        }
        AvroSchema::Array(array) => {
            if let Some(items) = &array.items {
                register_named_types(cache, items)?;
            }
        }
        AvroSchema::Map(map) => {
            if let Some(values) = &map.values {
                register_named_types(cache, values)?;
            }
        }
        AvroSchema::Union(union) => {
            for branch in &union.branches {
                register_named_types(cache, branch)?;
            }
        }
        AvroSchema::Primitive(_) | AvroSchema::Ref(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_suffix_normalizes_dots() {
        assert_eq!(
            DirectoryLoader::candidate_suffix("test.example"),
            "/test/example.avsc"
        );
        assert_eq!(DirectoryLoader::candidate_suffix("plain"), "/plain.avsc");
    }

    #[test]
    fn test_find_with_no_paths_is_not_found() {
        let loader = DirectoryLoader::default();
        let err = loader.find("anything").unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }
}
