use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::error::{BlocksmithError, Result};
use super::naming::NameMapper;
use super::walker::Model;

/// Canonical names, alias chains and subtype substitution over a walked model
#[derive(Debug, Clone)]
pub struct TypeResolver {
    names: NameMapper,
    aliases: BTreeMap<String, String>,
    subclasses: BTreeMap<String, Vec<String>>,
}

impl TypeResolver {
    pub fn new(names: NameMapper, model: &Model) -> Self {
        Self::from_parts(names, model.aliases.clone(), model.subclasses.clone())
    }

    pub fn from_parts(
        names: NameMapper,
        aliases: BTreeMap<String, String>,
        subclasses: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self { names, aliases, subclasses }
    }

    pub fn names(&self) -> &NameMapper {
        &self.names
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn subclasses(&self) -> &BTreeMap<String, Vec<String>> {
        &self.subclasses
    }

    /// Public spelling of a type name
    pub fn canonicalize(&self, type_name: &str) -> String {
        self.names.class_name(type_name)
    }

    /// Follow alias edges until a name that is not an alias.
    ///
    /// A chain can never be longer than the number of edges, so running past
    /// that means the edges form a cycle.
    pub fn resolve_alias(&self, type_name: &str) -> Result<String> {
        let mut current = type_name.to_string();
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(&current) {
                Some(next) => current = next.clone(),
                None => return Ok(current),
            }
        }
        Err(BlocksmithError::AliasCycle(type_name.to_string()))
    }

    /// Make sure every alias chain ends
    pub fn validate(&self) -> Result<()> {
        for alias in self.aliases.keys() {
            self.resolve_alias(alias)?;
        }
        debug!("{} alias chains resolved", self.aliases.len());
        Ok(())
    }

    /// The type itself plus every transitive descendant
    pub fn allowed_input_types(&self, type_name: &str) -> BTreeSet<String> {
        let root = self.canonicalize(type_name);
        let mut allowed = BTreeSet::new();
        let mut queue = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            if !allowed.insert(current.clone()) {
                continue;
            }
            if let Some(descendants) = self.subclasses.get(&current) {
                queue.extend(descendants.iter().cloned());
            }
        }

        allowed
    }

    /// Allowed input types for every type that has descendants, the type itself first
    pub fn allowed_types_table(&self) -> BTreeMap<String, Vec<String>> {
        self.subclasses.keys()
            .map(|ancestor| {
                let mut types = vec![ancestor.clone()];
                types.extend(
                    self.allowed_input_types(ancestor)
                        .into_iter()
                        .filter(|t| t != ancestor),
                );
                (ancestor.clone(), types)
            })
            .collect()
    }
}
