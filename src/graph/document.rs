//! Document Model
//!
//! The materialized API description handed to the engine: info, servers, named component
//! schemas and paths. The document owns its [`SchemaGraph`]; every schema slot below is a
//! [`SchemaRef`] into it.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::{Schema, SchemaGraph, SchemaRef};
use crate::error::{PreflightError, Result};

/// HTTP method of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Info {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Server {
    pub url: String,
    pub description: Option<String>,
}

impl Server {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }
}

/// Payload description for one content type
#[derive(Debug, Clone, Default)]
pub struct MediaType {
    pub schema: Option<SchemaRef>,
}

impl MediaType {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema: Some(schema) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    pub description: Option<String>,
    pub required: bool,
    /// content type -> payload, declared order
    pub content: Vec<(String, MediaType)>,
}

impl RequestBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content_type: impl Into<String>, schema: SchemaRef) -> Self {
        self.content.push((content_type.into(), MediaType::new(schema)));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Response {
    pub description: String,
    /// content type -> payload, declared order
    pub content: Vec<(String, MediaType)>,
}

impl Response {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            content: Vec::new(),
        }
    }

    pub fn with_content(mut self, content_type: impl Into<String>, schema: SchemaRef) -> Self {
        self.content.push((content_type.into(), MediaType::new(schema)));
        self
    }

    /// Content entries that actually carry a schema
    pub fn schemas(&self) -> impl Iterator<Item = (&str, SchemaRef)> {
        self.content
            .iter()
            .filter_map(|(ct, media)| media.schema.map(|s| (ct.as_str(), s)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub request_body: Option<RequestBody>,
    /// status code -> response, declared order
    pub responses: Vec<(String, Response)>,
    pub extensions: BTreeMap<String, Value>,
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_request_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn with_response(mut self, status: impl Into<String>, response: Response) -> Self {
        self.responses.push((status.into(), response));
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(name.into(), value);
        self
    }

    pub fn response(&self, status: &str) -> Option<&Response> {
        self.responses
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(status))
            .map(|(_, r)| r)
    }

    /// Human-facing name used in messages
    pub fn display_name(&self, path: &str, method: HttpMethod) -> String {
        match &self.operation_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{} {}", method.as_str().to_uppercase(), path),
        }
    }

    /// Every schema slot reachable directly from this operation
    pub fn schema_slots(&self) -> impl Iterator<Item = SchemaRef> + '_ {
        let body = self
            .request_body
            .iter()
            .flat_map(|b| b.content.iter().filter_map(|(_, m)| m.schema));
        let responses = self
            .responses
            .iter()
            .flat_map(|(_, r)| r.content.iter().filter_map(|(_, m)| m.schema));
        body.chain(responses)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathItem {
    pub operations: BTreeMap<HttpMethod, Operation>,
}

impl PathItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, method: HttpMethod, operation: Operation) -> Self {
        self.operations.insert(method, operation);
        self
    }
}

/// Named schemas, the only named entry points of the graph
#[derive(Debug, Clone, Default)]
pub struct Components {
    schemas: BTreeMap<String, SchemaRef>,
    names: HashMap<SchemaRef, String>,
}

impl Components {
    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaRef) {
        let name = name.into();
        if let Some(previous) = self.schemas.insert(name.clone(), schema) {
            // the node may still be bound under another name
            if self.names.get(&previous) == Some(&name) {
                self.names.remove(&previous);
            }
        }
        self.names.insert(schema, name);
    }

    /// Exact match first, then a case-insensitive one
    pub fn get(&self, name: &str) -> Option<SchemaRef> {
        self.schemas.get(name).copied().or_else(|| {
            self.schemas
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, r)| *r)
        })
    }

    pub fn name_of(&self, schema: SchemaRef) -> Option<&str> {
        self.names.get(&schema).map(String::as_str)
    }

    pub fn is_component(&self, schema: SchemaRef) -> bool {
        self.names.contains_key(&schema)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SchemaRef)> {
        self.schemas.iter().map(|(n, r)| (n.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// The whole description
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub info: Info,
    pub servers: Vec<Server>,
    pub components: Components,
    /// path -> item, declared order
    pub paths: Vec<(String, PathItem)>,
    pub graph: SchemaGraph,
}

impl Document {
    pub fn new(info: Info) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    pub fn with_server(mut self, url: impl Into<String>) -> Self {
        self.servers.push(Server::new(url));
        self
    }

    /// Add an anonymous (inline) schema
    pub fn add_schema(&mut self, schema: Schema) -> SchemaRef {
        self.graph.add(schema)
    }

    /// Add a schema and register it under `components.schemas`
    pub fn add_component(&mut self, name: impl Into<String>, schema: Schema) -> SchemaRef {
        let schema_ref = self.graph.add(schema);
        self.components.insert(name, schema_ref);
        schema_ref
    }

    /// Reserve a named component whose body is provided later through [`Document::define`]
    pub fn reserve_component(&mut self, name: impl Into<String>) -> SchemaRef {
        let schema_ref = self.graph.reserve();
        self.components.insert(name, schema_ref);
        schema_ref
    }

    pub fn reserve(&mut self) -> SchemaRef {
        self.graph.reserve()
    }

    pub fn define(&mut self, schema_ref: SchemaRef, schema: Schema) -> Result<()> {
        self.graph.define(schema_ref, schema)
    }

    pub fn schema(&self, schema_ref: SchemaRef) -> Option<&Schema> {
        self.graph.resolve(schema_ref)
    }

    /// Add operations under `path`, merging with an existing entry
    pub fn add_path(&mut self, path: impl Into<String>, item: PathItem) {
        let path = path.into();
        match self.paths.iter_mut().find(|(p, _)| *p == path) {
            Some((_, existing)) => existing.operations.extend(item.operations),
            None => self.paths.push((path, item)),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>, item: PathItem) -> Self {
        self.add_path(path, item);
        self
    }

    pub fn operations(&self) -> impl Iterator<Item = (&str, HttpMethod, &Operation)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.operations
                .iter()
                .map(move |(method, op)| (path.as_str(), *method, op))
        })
    }

    /// Preconditions checked before any traversal
    pub fn check_integrity(&self) -> Result<()> {
        self.graph.check_integrity()?;
        for (name, schema_ref) in self.components.iter() {
            if !self.graph.contains(schema_ref) {
                return Err(PreflightError::DanglingSchema {
                    location: format!("#/components/schemas/{}", pointer_escape(name)),
                });
            }
        }
        for (path, method, operation) in self.operations() {
            if operation.schema_slots().any(|r| !self.graph.contains(r)) {
                return Err(PreflightError::DanglingSchema {
                    location: operation_pointer(path, method),
                });
            }
        }
        Ok(())
    }
}

/// Escape a JSON pointer segment (`~` -> `~0`, `/` -> `~1`)
pub fn pointer_escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// `#/paths/<path>/<method>`
pub fn operation_pointer(path: &str, method: HttpMethod) -> String {
    format!("#/paths/{}/{}", pointer_escape(path), method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_escape() {
        assert_eq!(pointer_escape("/users/{id}"), "~1users~1{id}");
        assert_eq!(pointer_escape("a~b"), "a~0b");
        assert_eq!(
            operation_pointer("/users", HttpMethod::Get),
            "#/paths/~1users/get"
        );
    }

    #[test]
    fn test_components_lookup() {
        let mut doc = Document::new(Info::new("t", "1"));
        let pet = doc.add_component("Pet", Schema::object());
        assert_eq!(doc.components.get("Pet"), Some(pet));
        assert_eq!(doc.components.get("pet"), Some(pet));
        assert_eq!(doc.components.name_of(pet), Some("Pet"));
        assert!(doc.components.is_component(pet));
    }

    #[test]
    fn test_rebinding_a_name_keeps_aliases() {
        let mut doc = Document::new(Info::new("t", "1"));
        let pet = doc.add_component("Pet", Schema::object());
        doc.components.insert("Animal", pet);
        let dog = doc.add_schema(Schema::object());
        doc.components.insert("Pet", dog);

        assert_eq!(doc.components.get("Pet"), Some(dog));
        assert_eq!(doc.components.name_of(dog), Some("Pet"));
        assert!(doc.components.is_component(pet));
        assert_eq!(doc.components.name_of(pet), Some("Animal"));
    }

    #[test]
    fn test_rebinding_the_only_name_drops_the_reverse_entry() {
        let mut doc = Document::new(Info::new("t", "1"));
        let pet = doc.add_component("Pet", Schema::object());
        let dog = doc.add_schema(Schema::object());
        doc.components.insert("Pet", dog);

        assert!(!doc.components.is_component(pet));
        assert_eq!(doc.components.name_of(dog), Some("Pet"));
    }

    #[test]
    fn test_add_path_merges_operations() {
        let mut doc = Document::new(Info::new("t", "1"));
        doc.add_path("/a", PathItem::new().with_operation(HttpMethod::Get, Operation::new()));
        doc.add_path("/a", PathItem::new().with_operation(HttpMethod::Post, Operation::new()));
        assert_eq!(doc.paths.len(), 1);
        assert_eq!(doc.operations().count(), 2);
    }

    #[test]
    fn test_integrity_rejects_reserved_component() {
        let mut doc = Document::new(Info::new("t", "1"));
        doc.reserve_component("Later");
        assert!(matches!(
            doc.check_integrity(),
            Err(PreflightError::UndefinedSchema { .. })
        ));
    }

    #[test]
    fn test_display_name_falls_back_to_method_and_path() {
        let op = Operation::new();
        assert_eq!(op.display_name("/users", HttpMethod::Get), "GET /users");
        let op = op.with_operation_id("listUsers");
        assert_eq!(op.display_name("/users", HttpMethod::Get), "listUsers");
    }
}
