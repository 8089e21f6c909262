//! Structural Equivalence
//!
//! Decides whether two schema subgraphs would produce the same generated type.
//!
//! Equivalence is hash equality: `equivalent(a, b) == (structural_hash(a) == structural_hash(b))`.
//! Two non-equivalent schemas may collide; this is a deduplication heuristic, not a proof.
//!
//! The hash is a pre-order fold over the subgraph with a visited set scoped to one
//! top-level call. A node seen a second time contributes [`REVISIT_SENTINEL`] instead of
//! its content, which is what makes self-referential and mutually recursive schemas
//! terminate. The set is never cleared between sibling branches, so a shared node hashes
//! fully only the first time it is met.
//!
//! Folded fields: `deprecated`, `discriminator` (property name case-insensitive, mapping
//! sorted by key), `additionalProperties` and its allowed flag, `properties` (by name,
//! declaration order ignored), `default` (canonical JSON text, case-insensitive), `items`,
//! `oneOf`/`anyOf`/`allOf` (member order matters), `format` (case-insensitive), the
//! declared type set including `null`, and `title`.
//!
//! Ignored: description, example, numeric/length/pattern/item constraints, read/write-only,
//! the required list and reference bookkeeping.

use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::graph::{SchemaGraph, SchemaRef};

/// Contributed in place of a node already visited during the current call
pub const REVISIT_SENTINEL: u64 = 0x9e37_79b9_7f4a_7c15;

/// Contributed for an absent schema slot
const ABSENT: u64 = 0x2545_f491_4f6c_dd1d;

/// Which fields participate in the hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonScope {
    /// Whole-schema identity
    Schema,
    /// Property shape during inheritance conflict detection; `deprecated` and `default`
    /// are left out
    Property,
}

/// A set of mutually equivalent schemas
#[derive(Debug, Clone)]
pub struct EquivalenceGroup<K> {
    pub hash: u64,
    /// In first-seen order
    pub members: Vec<(K, SchemaRef)>,
}

impl<K> EquivalenceGroup<K> {
    /// First member seen for this group
    pub fn representative(&self) -> &(K, SchemaRef) {
        &self.members[0]
    }
}

/// Cycle-safe structural comparer over one graph
#[derive(Debug, Clone, Copy)]
pub struct SchemaComparer<'g> {
    graph: &'g SchemaGraph,
    scope: ComparisonScope,
}

impl<'g> SchemaComparer<'g> {
    pub fn new(graph: &'g SchemaGraph, scope: ComparisonScope) -> Self {
        Self { graph, scope }
    }

    /// Whole-schema comparer
    pub fn schema(graph: &'g SchemaGraph) -> Self {
        Self::new(graph, ComparisonScope::Schema)
    }

    /// Property-shape comparer
    pub fn property(graph: &'g SchemaGraph) -> Self {
        Self::new(graph, ComparisonScope::Property)
    }

    pub fn scope(&self) -> ComparisonScope {
        self.scope
    }

    /// Both absent, or both present with the same structural hash
    pub fn equivalent(&self, a: Option<SchemaRef>, b: Option<SchemaRef>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(_), Some(_)) => self.structural_hash(a) == self.structural_hash(b),
            _ => false,
        }
    }

    pub fn structural_hash(&self, schema: Option<SchemaRef>) -> u64 {
        let mut state = DefaultHasher::new();
        let mut visited = HashSet::new();
        self.fold_optional(schema, &mut visited, &mut state);
        state.finish()
    }

    /// Partition keyed schemas into equivalence groups, keeping first-seen order
    pub fn group<K, I>(&self, items: I) -> Vec<EquivalenceGroup<K>>
    where
        I: IntoIterator<Item = (K, SchemaRef)>,
    {
        let mut groups: Vec<EquivalenceGroup<K>> = Vec::new();
        for (key, schema) in items {
            let hash = self.structural_hash(Some(schema));
            match groups.iter_mut().find(|g| g.hash == hash) {
                Some(group) => group.members.push((key, schema)),
                None => groups.push(EquivalenceGroup {
                    hash,
                    members: vec![(key, schema)],
                }),
            }
        }
        groups
    }

    fn fold_optional(
        &self,
        schema: Option<SchemaRef>,
        visited: &mut HashSet<SchemaRef>,
        state: &mut DefaultHasher,
    ) {
        match schema {
            Some(schema_ref) => {
                true.hash(state);
                self.fold(schema_ref, visited, state);
            }
            None => ABSENT.hash(state),
        }
    }

    fn fold(
        &self,
        schema_ref: SchemaRef,
        visited: &mut HashSet<SchemaRef>,
        state: &mut DefaultHasher,
    ) {
        if !visited.insert(schema_ref) {
            REVISIT_SENTINEL.hash(state);
            return;
        }
        let Some(schema) = self.graph.resolve(schema_ref) else {
            ABSENT.hash(state);
            return;
        };

        if self.scope == ComparisonScope::Schema {
            schema.deprecated.hash(state);
        }

        match &schema.discriminator {
            Some(discriminator) => {
                true.hash(state);
                discriminator.property_name.to_lowercase().hash(state);
                let mut mapping: Vec<&(String, String)> = discriminator.mapping.iter().collect();
                mapping.sort();
                mapping.hash(state);
            }
            None => false.hash(state),
        }

        self.fold_optional(schema.additional_properties, visited, state);
        schema.additional_properties_allowed.hash(state);

        let mut properties: Vec<&(String, SchemaRef)> = schema.properties.iter().collect();
        properties.sort_by(|a, b| a.0.cmp(&b.0));
        properties.len().hash(state);
        for (name, property) in properties {
            name.hash(state);
            self.fold(*property, visited, state);
        }

        if self.scope == ComparisonScope::Schema {
            fold_default(schema.default.as_ref(), state);
        }

        self.fold_optional(schema.items, visited, state);

        for members in [&schema.one_of, &schema.any_of, &schema.all_of] {
            members.len().hash(state);
            for member in members {
                self.fold(*member, visited, state);
            }
        }

        schema.format.as_deref().map(str::to_lowercase).hash(state);
        schema.types.bits().hash(state);
        schema.title.hash(state);
    }
}

fn fold_default(value: Option<&Value>, state: &mut DefaultHasher) {
    let Some(value) = value else {
        ABSENT.hash(state);
        return;
    };
    let kind: u8 = match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    };
    kind.hash(state);
    value.to_string().to_lowercase().hash(state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Discriminator, JsonType, Schema};
    use serde_json::json;

    fn string_prop_object(graph: &mut SchemaGraph, name: &str) -> SchemaRef {
        let leaf = graph.add(Schema::string());
        graph.add(Schema::object().with_property(name, leaf))
    }

    #[test]
    fn test_absent_schemas() {
        let mut graph = SchemaGraph::new();
        let s = graph.add(Schema::string());
        let comparer = SchemaComparer::schema(&graph);
        assert!(comparer.equivalent(None, None));
        assert!(!comparer.equivalent(Some(s), None));
        assert!(!comparer.equivalent(None, Some(s)));
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut graph = SchemaGraph::new();
        let node = graph.reserve();
        graph
            .define(node, Schema::object().with_property("children", node).with_items(node))
            .unwrap();
        let comparer = SchemaComparer::schema(&graph);
        assert!(comparer.equivalent(Some(node), Some(node)));
    }

    #[test]
    fn test_cosmetic_fields_are_ignored() {
        let mut graph = SchemaGraph::new();
        let a = graph.add(
            Schema::string()
                .with_format("uuid")
                .with_description("first")
                .with_example(json!("a")),
        );
        let mut b_schema = Schema::string()
            .with_format("UUID")
            .with_description("second")
            .with_required("x");
        b_schema.read_only = true;
        b_schema.constraints.max_length = Some(36);
        let b = graph.add(b_schema);
        assert!(SchemaComparer::schema(&graph).equivalent(Some(a), Some(b)));
    }

    #[test]
    fn test_title_is_case_sensitive() {
        let mut graph = SchemaGraph::new();
        let a = graph.add(Schema::object().with_title("Pet"));
        let b = graph.add(Schema::object().with_title("pet"));
        assert!(!SchemaComparer::schema(&graph).equivalent(Some(a), Some(b)));
    }

    #[test]
    fn test_nullable_changes_identity() {
        let mut graph = SchemaGraph::new();
        let a = graph.add(Schema::string());
        let b = graph.add(Schema::string().nullable());
        assert!(!SchemaComparer::schema(&graph).equivalent(Some(a), Some(b)));
    }

    #[test]
    fn test_property_order_is_ignored() {
        let mut graph = SchemaGraph::new();
        let s = graph.add(Schema::string());
        let i = graph.add(Schema::integer());
        let s2 = graph.add(Schema::string());
        let i2 = graph.add(Schema::integer());
        let a = graph.add(Schema::object().with_property("a", s).with_property("b", i));
        let b = graph.add(Schema::object().with_property("b", i2).with_property("a", s2));
        assert!(SchemaComparer::schema(&graph).equivalent(Some(a), Some(b)));
    }

    #[test]
    fn test_union_order_matters() {
        let mut graph = SchemaGraph::new();
        let cat = string_prop_object(&mut graph, "meow");
        let dog = string_prop_object(&mut graph, "bark");
        let a = graph.add(Schema::new().with_one_of([cat, dog]));
        let b = graph.add(Schema::new().with_one_of([dog, cat]));
        assert!(!SchemaComparer::schema(&graph).equivalent(Some(a), Some(b)));
    }

    #[test]
    fn test_discriminator_mapping_order_is_ignored() {
        let mut graph = SchemaGraph::new();
        let a = graph.add(Schema::object().with_discriminator(
            Discriminator::new("kind")
                .with_mapping("cat", "#/components/schemas/Cat")
                .with_mapping("dog", "#/components/schemas/Dog"),
        ));
        let b = graph.add(Schema::object().with_discriminator(
            Discriminator::new("KIND")
                .with_mapping("dog", "#/components/schemas/Dog")
                .with_mapping("cat", "#/components/schemas/Cat"),
        ));
        assert!(SchemaComparer::schema(&graph).equivalent(Some(a), Some(b)));
    }

    #[test]
    fn test_default_compared_case_insensitively() {
        let mut graph = SchemaGraph::new();
        let a = graph.add(Schema::string().with_default(json!("Active")));
        let b = graph.add(Schema::string().with_default(json!("ACTIVE")));
        let c = graph.add(Schema::string().with_default(json!("inactive")));
        let comparer = SchemaComparer::schema(&graph);
        assert!(comparer.equivalent(Some(a), Some(b)));
        assert!(!comparer.equivalent(Some(a), Some(c)));
    }

    #[test]
    fn test_property_scope_ignores_deprecated_and_default() {
        let mut graph = SchemaGraph::new();
        let a = graph.add(Schema::integer().with_default(json!(1)));
        let b = graph.add(Schema::integer().deprecated());
        assert!(!SchemaComparer::schema(&graph).equivalent(Some(a), Some(b)));
        assert!(SchemaComparer::property(&graph).equivalent(Some(a), Some(b)));
    }

    #[test]
    fn test_additional_properties_flag() {
        let mut graph = SchemaGraph::new();
        let open = graph.add(Schema::object());
        let closed = graph.add(Schema::object().with_additional_properties_allowed(false));
        assert!(!SchemaComparer::schema(&graph).equivalent(Some(open), Some(closed)));
    }

    /// Pins the visited-set approximation: a revisited node hashes as the sentinel no
    /// matter what it is, so `b: <already seen string>` and `b: <self>` look the same.
    #[test]
    fn test_revisit_sentinel_collapses_diamond_and_cycle() {
        let mut graph = SchemaGraph::new();
        let x = graph.add(Schema::string());
        let diamond = graph.add(Schema::object().with_property("a", x).with_property("b", x));

        let x2 = graph.add(Schema::string());
        let cyclic = graph.reserve();
        graph
            .define(cyclic, Schema::object().with_property("a", x2).with_property("b", cyclic))
            .unwrap();

        assert!(SchemaComparer::schema(&graph).equivalent(Some(diamond), Some(cyclic)));
    }

    /// Pins the other side: identity sharing is visible to the hash
    #[test]
    fn test_shared_node_differs_from_structural_copy() {
        let mut graph = SchemaGraph::new();
        let x = graph.add(Schema::string());
        let y = graph.add(Schema::string());
        let shared = graph.add(Schema::object().with_property("a", x).with_property("b", x));
        let copied = graph.add(Schema::object().with_property("a", x).with_property("b", y));
        assert!(!SchemaComparer::schema(&graph).equivalent(Some(shared), Some(copied)));
    }

    #[test]
    fn test_group_keeps_first_seen_order() {
        let mut graph = SchemaGraph::new();
        let a = string_prop_object(&mut graph, "a");
        let b = string_prop_object(&mut graph, "a");
        let c = graph.add(Schema::of_type(JsonType::Boolean));
        let groups = SchemaComparer::schema(&graph).group([("200", a), ("201", b), ("202", c)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[0].representative().0, "200");
        assert_eq!(groups[1].representative().0, "202");
    }
}
