//! Session-scoped cache of named type definitions.
//!
//! The cache is the build session's symbol table. Definitions are owned
//! here, keyed by fullname; a short-name alias is kept as long as the
//! short name is unique among the session's definitions. Registering a
//! second definition with an already-used short name removes the alias,
//! so later unqualified lookups of that name fail instead of silently
//! picking one of the candidates.

use std::collections::{HashMap, HashSet};

use crate::error::BuilderError;
use crate::schema::serializer::{serialize, ReferenceState};
use crate::schema::types::{make_fullname, AvroSchema};

/// Cache of previously defined named types for one build session.
#[derive(Debug, Default)]
pub struct DefinitionCache {
    /// Definitions by fullname. Authoritative.
    definitions: HashMap<String, AvroSchema>,
    /// Unique short name -> fullname. An entry is removed when a second
    /// definition registers the same short name.
    aliases: HashMap<String, String>,
    /// Every short name ever registered, so ambiguous names never trigger
    /// a redundant external load.
    seen_names: HashSet<String>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a finished named type under its fullname (and its short
    /// name, while that stays unique).
    pub fn add(&mut self, node: &AvroSchema) -> Result<(), BuilderError> {
        let name = node.name().ok_or_else(|| {
            BuilderError::required_attribute(node.kind_name(), "name", None, None)
        })?;
        let fullname = node
            .fullname()
            .unwrap_or_else(|| name.to_string());
        if node.namespace().is_some() {
            let short = fullname.rsplit('.').next().unwrap_or(name).to_string();
            self.track_short_name(&short, &fullname);
        }
        self.insert_definition(fullname, node.clone())
    }

    /// Forward-declare a named type that is still under construction, so
    /// that its body can reference it by name. The duplicate check and
    /// short-name tracking happen here; `finalize` installs the finished
    /// definition.
    pub fn declare(
        &mut self,
        name: &str,
        namespace: Option<&str>,
        header: &AvroSchema,
    ) -> Result<String, BuilderError> {
        let fullname = make_fullname(name, namespace);
        let short = fullname.rsplit('.').next().unwrap_or(name).to_string();
        if short != fullname {
            self.track_short_name(&short, &fullname);
        }
        if self.definitions.contains_key(&fullname) {
            return Err(self.duplicate_error(&fullname, header));
        }
        self.definitions
            .insert(fullname.clone(), AvroSchema::Ref(fullname.clone()));
        Ok(fullname)
    }

    /// Replace a forward declaration with the finished definition.
    pub fn finalize(&mut self, fullname: &str, node: AvroSchema) {
        self.definitions.insert(fullname.to_string(), node);
    }

    /// Look up a definition by short name or fullname.
    pub fn get(&self, key: &str) -> Option<&AvroSchema> {
        self.definitions.get(key).or_else(|| {
            self.aliases
                .get(key)
                .and_then(|fullname| self.definitions.get(fullname))
        })
    }

    /// Whether the short name has ever been registered in this session.
    pub fn name_seen(&self, name: &str) -> bool {
        self.seen_names.contains(name) || self.definitions.contains_key(name)
    }

    /// All registered fullnames.
    pub fn fullnames(&self) -> impl Iterator<Item = &String> {
        self.definitions.keys()
    }

    fn track_short_name(&mut self, name: &str, fullname: &str) {
        if self.aliases.contains_key(name) {
            // Second definition with this short name: now ambiguous.
            self.aliases.remove(name);
        } else if !self.seen_names.contains(name) {
            self.aliases.insert(name.to_string(), fullname.to_string());
        }
        self.seen_names.insert(name.to_string());
    }

    fn insert_definition(
        &mut self,
        fullname: String,
        node: AvroSchema,
    ) -> Result<(), BuilderError> {
        if self.definitions.contains_key(&fullname) {
            return Err(self.duplicate_error(&fullname, &node));
        }
        self.definitions.insert(fullname, node);
        Ok(())
    }

    fn duplicate_error(&self, fullname: &str, duplicate: &AvroSchema) -> BuilderError {
        BuilderError::DuplicateDefinition {
            fullname: fullname.to_string(),
            existing: self.render(&self.definitions[fullname]),
            duplicate: self.render(duplicate),
        }
    }

    /// Render a definition as a canonical document for error messages.
    fn render(&self, node: &AvroSchema) -> String {
        let mut state = ReferenceState::new();
        serialize(node, self, &mut state)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| "<incomplete definition>".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::FixedSchema;

    fn fixed(name: &str, namespace: &str, size: u64) -> AvroSchema {
        AvroSchema::Fixed(FixedSchema::new(name, size).with_namespace(namespace))
    }

    #[test]
    fn test_lookup_by_short_name_and_fullname() {
        let mut cache = DefinitionCache::new();
        cache.add(&fixed("hash", "test", 16)).unwrap();

        assert!(cache.get("hash").is_some());
        assert!(cache.get("test.hash").is_some());
        assert!(cache.get("other.hash").is_none());
    }

    #[test]
    fn test_ambiguous_short_name_removed() {
        let mut cache = DefinitionCache::new();
        cache.add(&fixed("a_fix", "test", 5)).unwrap();
        cache.add(&fixed("a_fix", "other", 6)).unwrap();
        cache.add(&fixed("a_fix", "third", 7)).unwrap();

        assert!(cache.get("a_fix").is_none());
        assert!(cache.get("test.a_fix").is_some());
        assert!(cache.get("other.a_fix").is_some());
        assert!(cache.get("third.a_fix").is_some());
        // The name is remembered, so resolution will not attempt a load.
        assert!(cache.name_seen("a_fix"));
    }

    #[test]
    fn test_duplicate_fullname_rejected() {
        let mut cache = DefinitionCache::new();
        cache.add(&fixed("hash", "test", 16)).unwrap();
        let err = cache.add(&fixed("hash", "test", 32)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("definition for 'test.hash' already exists"));
        // Both competing definitions are rendered for diffing.
        assert!(message.contains("\"size\":16"));
        assert!(message.contains("\"size\":32"));
    }

    #[test]
    fn test_declare_then_finalize() {
        let mut cache = DefinitionCache::new();
        let header = AvroSchema::Record(crate::schema::types::RecordSchema::new("node"));
        let fullname = cache.declare("node", None, &header).unwrap();
        assert_eq!(fullname, "node");
        // The stub resolves by name while the body is under construction.
        assert!(matches!(cache.get("node"), Some(AvroSchema::Ref(_))));

        cache.finalize(&fullname, header.clone());
        assert!(matches!(cache.get("node"), Some(AvroSchema::Record(_))));
    }
}
