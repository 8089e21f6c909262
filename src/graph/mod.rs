//! Schema Graph
//!
//! Primary data structure: an arena of [`Schema`] nodes stored in a petgraph `DiGraph`.
//! Every reference a schema holds (`properties`, `items`, `additionalProperties`,
//! `allOf`/`oneOf`/`anyOf`) is a [`SchemaRef`] into the same arena and is mirrored as a
//! typed edge, so the graph may be cyclic (self-reference, mutual recursion) without any
//! node owning another.
//!
//! Node identity is the arena index. Traversals that must terminate on cycles track
//! visited `SchemaRef`s, never structural values.

pub mod analysis;
pub mod document;

pub use analysis::{compute_recursion_analysis, RecursionAnalysis, RecursiveGroup};
pub use document::{
    operation_pointer, pointer_escape, Components, Document, HttpMethod, Info, MediaType,
    Operation, PathItem, RequestBody, Response, Server,
};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::error::{PreflightError, Result};

/// Identity of a schema node inside a [`SchemaGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaRef(NodeIndex);

impl SchemaRef {
    pub fn index(self) -> usize {
        self.0.index()
    }

    pub(crate) fn node(self) -> NodeIndex {
        self.0
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0.index())
    }
}

// =============================================================================
// JSON Types
// =============================================================================

/// JSON primitive kind a schema may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl JsonType {
    pub const ALL: [JsonType; 7] = [
        Self::String,
        Self::Integer,
        Self::Number,
        Self::Boolean,
        Self::Array,
        Self::Object,
        Self::Null,
    ];

    pub fn from_json_type(type_str: &str) -> Option<Self> {
        match type_str {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            "null" => Some(Self::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Null => "null",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of declared JSON kinds (`type: [string, "null"]` is a two-member set)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TypeSet(u8);

impl TypeSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn single(kind: JsonType) -> Self {
        Self(kind.bit())
    }

    pub fn with(mut self, kind: JsonType) -> Self {
        self.insert(kind);
        self
    }

    pub fn insert(&mut self, kind: JsonType) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: JsonType) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_nullable(&self) -> bool {
        self.contains(JsonType::Null)
    }

    /// The set without its `null` member
    pub fn non_null(&self) -> TypeSet {
        Self(self.0 & !JsonType::Null.bit())
    }

    /// The only non-null kind, if exactly one is declared
    pub fn single_kind(&self) -> Option<JsonType> {
        let non_null = self.non_null();
        let mut kinds = non_null.iter();
        match (kinds.next(), kinds.next()) {
            (Some(kind), None) => Some(kind),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = JsonType> + '_ {
        JsonType::ALL.into_iter().filter(|k| self.contains(*k))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl FromIterator<JsonType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = JsonType>>(iter: I) -> Self {
        let mut set = TypeSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<JsonType> for TypeSet {
    fn from(kind: JsonType) -> Self {
        Self::single(kind)
    }
}

// =============================================================================
// Schema Node
// =============================================================================

/// Polymorphism hint: which property carries the type name, and how values map to types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discriminator {
    pub property_name: String,
    /// Declared order is kept; comparisons normalize it
    pub mapping: Vec<(String, String)>,
}

impl Discriminator {
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            mapping: Vec::new(),
        }
    }

    pub fn with_mapping(mut self, value: impl Into<String>, target: impl Into<String>) -> Self {
        self.mapping.push((value.into(), target.into()));
        self
    }
}

/// Validation constraints. None of them change the generated type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: bool,
    pub exclusive_maximum: bool,
    pub multiple_of: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

/// Types of edges in the schema graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Property field type
    Property,
    /// items array element type
    Items,
    /// additionalProperties map value type
    AdditionalProperties,
    /// allOf composition (inheritance/mixin)
    AllOf,
    /// oneOf exclusive union member
    OneOf,
    /// anyOf inclusive union member
    AnyOf,
}

/// A node in the description graph
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub types: TypeSet,
    pub format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    /// Declared order is kept
    pub properties: Vec<(String, SchemaRef)>,
    pub required: Vec<String>,
    pub items: Option<SchemaRef>,
    pub additional_properties: Option<SchemaRef>,
    pub additional_properties_allowed: bool,
    pub one_of: Vec<SchemaRef>,
    pub any_of: Vec<SchemaRef>,
    pub all_of: Vec<SchemaRef>,
    pub discriminator: Option<Discriminator>,
    pub default: Option<Value>,
    pub example: Option<Value>,
    pub read_only: bool,
    pub write_only: bool,
    pub constraints: Constraints,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            types: TypeSet::empty(),
            format: None,
            title: None,
            description: None,
            deprecated: false,
            properties: Vec::new(),
            required: Vec::new(),
            items: None,
            additional_properties: None,
            additional_properties_allowed: true,
            one_of: Vec::new(),
            any_of: Vec::new(),
            all_of: Vec::new(),
            discriminator: None,
            default: None,
            example: None,
            read_only: false,
            write_only: false,
            constraints: Constraints::default(),
        }
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(kind: JsonType) -> Self {
        Self {
            types: TypeSet::single(kind),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::of_type(JsonType::Object)
    }

    pub fn string() -> Self {
        Self::of_type(JsonType::String)
    }

    pub fn integer() -> Self {
        Self::of_type(JsonType::Integer)
    }

    pub fn number() -> Self {
        Self::of_type(JsonType::Number)
    }

    pub fn boolean() -> Self {
        Self::of_type(JsonType::Boolean)
    }

    pub fn array(items: SchemaRef) -> Self {
        Self {
            items: Some(items),
            ..Self::of_type(JsonType::Array)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.types.insert(JsonType::Null);
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, schema: SchemaRef) -> Self {
        self.properties.push((name.into(), schema));
        self
    }

    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn with_items(mut self, items: SchemaRef) -> Self {
        self.items = Some(items);
        self
    }

    pub fn with_additional_properties(mut self, schema: SchemaRef) -> Self {
        self.additional_properties = Some(schema);
        self
    }

    pub fn with_additional_properties_allowed(mut self, allowed: bool) -> Self {
        self.additional_properties_allowed = allowed;
        self
    }

    pub fn with_all_of(mut self, members: impl IntoIterator<Item = SchemaRef>) -> Self {
        self.all_of.extend(members);
        self
    }

    pub fn with_one_of(mut self, members: impl IntoIterator<Item = SchemaRef>) -> Self {
        self.one_of.extend(members);
        self
    }

    pub fn with_any_of(mut self, members: impl IntoIterator<Item = SchemaRef>) -> Self {
        self.any_of.extend(members);
        self
    }

    pub fn with_discriminator(mut self, discriminator: Discriminator) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Look up a directly declared property
    pub fn property(&self, name: &str) -> Option<SchemaRef> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| *r)
    }

    /// Declares `object`, or declares no type but has properties
    pub fn is_object_type(&self) -> bool {
        self.types.contains(JsonType::Object)
            || (self.types.non_null().is_empty() && !self.properties.is_empty())
    }

    pub fn is_array(&self) -> bool {
        self.types.contains(JsonType::Array)
    }

    /// `anyOf` union
    pub fn is_inclusive_union(&self) -> bool {
        !self.any_of.is_empty()
    }

    /// `oneOf` union
    pub fn is_exclusive_union(&self) -> bool {
        !self.one_of.is_empty()
    }

    pub fn discriminator_property(&self) -> Option<&str> {
        self.discriminator
            .as_ref()
            .map(|d| d.property_name.as_str())
            .filter(|name| !name.trim().is_empty())
    }

    /// Every outgoing reference with the kind of edge it produces
    pub fn references(&self) -> impl Iterator<Item = (EdgeKind, SchemaRef)> + '_ {
        self.properties
            .iter()
            .map(|(_, r)| (EdgeKind::Property, *r))
            .chain(self.items.map(|r| (EdgeKind::Items, r)))
            .chain(
                self.additional_properties
                    .map(|r| (EdgeKind::AdditionalProperties, r)),
            )
            .chain(self.all_of.iter().map(|r| (EdgeKind::AllOf, *r)))
            .chain(self.one_of.iter().map(|r| (EdgeKind::OneOf, *r)))
            .chain(self.any_of.iter().map(|r| (EdgeKind::AnyOf, *r)))
    }
}

// =============================================================================
// Schema Graph
// =============================================================================

/// Arena of schema nodes with typed reference edges
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub(crate) graph: DiGraph<Schema, EdgeKind>,
    /// Reserved through [`SchemaGraph::reserve`] and not yet defined
    pending: HashSet<SchemaRef>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully known schema
    pub fn add(&mut self, schema: Schema) -> SchemaRef {
        let schema_ref = SchemaRef(self.graph.add_node(schema));
        self.link(schema_ref);
        schema_ref
    }

    /// Reserve an identity so that schemas can refer to it before it is defined.
    /// This is how self-referential and mutually recursive schemas are built.
    pub fn reserve(&mut self) -> SchemaRef {
        let schema_ref = SchemaRef(self.graph.add_node(Schema::default()));
        self.pending.insert(schema_ref);
        schema_ref
    }

    /// Set (or replace) the schema stored under `schema_ref`
    pub fn define(&mut self, schema_ref: SchemaRef, schema: Schema) -> Result<()> {
        let Some(slot) = self.graph.node_weight_mut(schema_ref.node()) else {
            return Err(PreflightError::DanglingSchema {
                location: schema_ref.to_string(),
            });
        };
        *slot = schema;
        while let Some(edge) = self.graph.first_edge(schema_ref.node(), Direction::Outgoing) {
            self.graph.remove_edge(edge);
        }
        self.pending.remove(&schema_ref);
        self.link(schema_ref);
        Ok(())
    }

    fn link(&mut self, from: SchemaRef) {
        let targets: Vec<(EdgeKind, SchemaRef)> = self.graph[from.node()].references().collect();
        for (kind, to) in targets {
            // Dangling targets have no node to attach to; check_integrity reports them
            if self.contains(to) {
                self.graph.add_edge(from.node(), to.node(), kind);
            }
        }
    }

    pub fn resolve(&self, schema_ref: SchemaRef) -> Option<&Schema> {
        self.graph.node_weight(schema_ref.node())
    }

    pub fn contains(&self, schema_ref: SchemaRef) -> bool {
        schema_ref.index() < self.graph.node_count()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaRef, &Schema)> {
        self.graph
            .node_indices()
            .map(move |idx| (SchemaRef(idx), &self.graph[idx]))
    }

    /// Strongly connected components, including single self-referencing schemas
    pub fn recursive_groups(&self) -> RecursionAnalysis {
        compute_recursion_analysis(self)
    }

    /// Every reserved schema is defined and every reference resolves
    pub fn check_integrity(&self) -> Result<()> {
        if let Some(undefined) = self.pending.iter().min() {
            return Err(PreflightError::UndefinedSchema {
                index: undefined.index(),
            });
        }
        for (schema_ref, schema) in self.iter() {
            if let Some((kind, target)) = schema.references().find(|(_, r)| !self.contains(*r)) {
                return Err(PreflightError::DanglingSchema {
                    location: format!("{} ({:?} -> {})", schema_ref, kind, target),
                });
            }
        }
        Ok(())
    }
}
