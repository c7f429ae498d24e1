//! A store of validated schemas built from definition files.

use std::collections::HashMap;

use crate::builder::SchemaBuilder;
use crate::error::{BuilderError, SchemaError};
use crate::loader::{DirectoryLoader, LoaderConfig};
use crate::schema::types::{make_fullname, AvroSchema};

/// Builds definition files into validated schemas on demand and memoizes
/// the results by fullname.
///
/// Each `find` that misses the memo runs an isolated build session, so
/// definitions from one schema never leak into another.
#[derive(Debug, Default)]
pub struct SchemaStore {
    config: LoaderConfig,
    schemas: HashMap<String, AvroSchema>,
}

impl SchemaStore {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            schemas: HashMap::new(),
        }
    }

    /// Find the validated schema for a name, building it from its
    /// definition file if it has not been built yet.
    ///
    /// Fails if the definition file resolves to a schema whose fullname
    /// differs from the requested one.
    pub fn find(
        &mut self,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<&AvroSchema, BuilderError> {
        let fullname = make_fullname(name, namespace);
        if !self.schemas.contains_key(&fullname) {
            let loader = DirectoryLoader::new(self.config.clone());
            let mut builder = SchemaBuilder::with_loader(Box::new(loader));
            builder.import(&fullname)?;
            let schema = builder.as_schema()?;

            let actual = schema.fullname().unwrap_or_default();
            if actual != fullname {
                return Err(SchemaError::WrongType {
                    actual,
                    expected: fullname,
                }
                .into());
            }
            self.schemas.insert(fullname.clone(), schema);
        }
        Ok(&self.schemas[&fullname])
    }
}
