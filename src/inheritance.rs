//! Inheritance Index
//!
//! Document-wide map from a base component name to the component names that extend it
//! through `allOf`. Built once per validation pass before any rule runs, then only read.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::graph::{Document, SchemaRef};

const COMPONENT_PREFIX: &str = "#/components/schemas/";

/// One resolvable discriminator value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorMapping {
    /// Value carried by the discriminator property
    pub value: String,
    /// Component name of the concrete type
    pub subtype: String,
}

/// base name (lowercased) -> subtype names
#[derive(Debug, Clone, Default)]
pub struct InheritanceIndex {
    subtypes: HashMap<String, BTreeSet<String>>,
}

impl InheritanceIndex {
    /// Single pass over `components.schemas`
    pub fn build(document: &Document) -> Self {
        let mut index = Self::default();

        for (name, schema_ref) in document.components.iter() {
            let Some(schema) = document.schema(schema_ref) else {
                continue;
            };
            for member in &schema.all_of {
                let Some(base) = document.components.name_of(*member) else {
                    continue;
                };
                if base.eq_ignore_ascii_case(name) {
                    continue;
                }
                index
                    .subtypes
                    .entry(base.to_lowercase())
                    .or_default()
                    .insert(name.to_string());
            }
        }

        tracing::debug!(bases = index.subtypes.len(), "built inheritance index");
        index
    }

    /// Components that list `base` directly in their `allOf`
    pub fn direct_subtypes(&self, base: &str) -> impl Iterator<Item = &str> {
        self.subtypes
            .get(&base.to_lowercase())
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Transitive subtypes in breadth-first order; terminates on inheritance cycles
    pub fn all_subtypes(&self, base: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(base.to_lowercase());

        let mut result = Vec::new();
        let mut queue: VecDeque<&str> = self.direct_subtypes(base).collect();
        while let Some(subtype) = queue.pop_front() {
            if !seen.insert(subtype.to_lowercase()) {
                continue;
            }
            result.push(subtype.to_string());
            queue.extend(self.direct_subtypes(subtype));
        }
        result
    }

    pub fn is_base(&self, name: &str) -> bool {
        self.subtypes.contains_key(&name.to_lowercase())
    }

    /// Number of base schemas
    pub fn len(&self) -> usize {
        self.subtypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtypes.is_empty()
    }

    /// Every subtype a discriminator on `schema` can resolve to.
    ///
    /// Explicit `discriminator.mapping` entries come first, then named `oneOf`/`anyOf`
    /// members, then (for a named component) its transitive subtypes. Entries are
    /// de-duplicated by subtype name, case-insensitively, keeping the first.
    pub fn discriminator_mappings(
        &self,
        document: &Document,
        schema: SchemaRef,
    ) -> Vec<DiscriminatorMapping> {
        let Some(node) = document.schema(schema) else {
            return Vec::new();
        };

        let mut candidates: Vec<DiscriminatorMapping> = Vec::new();

        if let Some(discriminator) = &node.discriminator {
            for (value, target) in &discriminator.mapping {
                let subtype = target.strip_prefix(COMPONENT_PREFIX).unwrap_or(target);
                candidates.push(DiscriminatorMapping {
                    value: value.clone(),
                    subtype: subtype.to_string(),
                });
            }
        }

        for member in node.one_of.iter().chain(&node.any_of) {
            if let Some(name) = document.components.name_of(*member) {
                candidates.push(DiscriminatorMapping {
                    value: name.to_string(),
                    subtype: name.to_string(),
                });
            }
        }

        if let Some(name) = document.components.name_of(schema) {
            for subtype in self.all_subtypes(name) {
                candidates.push(DiscriminatorMapping {
                    value: subtype.clone(),
                    subtype,
                });
            }
        }

        let mut seen = HashSet::new();
        candidates.retain(|m| seen.insert(m.subtype.to_lowercase()));
        candidates
    }
}
