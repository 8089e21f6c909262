//! Validation Rules
//!
//! The rule set is closed: one enum per granularity, each with a single dispatcher, so adding
//! a rule means adding a variant and the compiler points at every match that must handle it.
//!
//! | Granularity | Receives | Rules |
//! |---|---|---|
//! | Document | the whole [`Document`] | [`DocumentRule`] |
//! | Operation | path, method and [`Operation`] | [`OperationRule`] |
//! | Schema | a component schema or an inline success-response schema | [`SchemaRule`] |
//!
//! Rule bodies push warnings into the buffer they are handed and return `anyhow::Result`.
//! An `Err` is not a finding about the description; the engine turns it into a
//! rule-failure diagnostic for that unit.

mod bodies;
mod discriminator;
mod divergent_response;
pub mod formats;
mod inheritance_semantics;
mod servers;

pub use divergent_response::{select_response_schema, DIVERGENCE_STATUS_CODES};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::{Category, Diagnostic};
use crate::equivalence::{ComparisonScope, SchemaComparer};
use crate::error::PreflightError;
use crate::graph::{
    operation_pointer, pointer_escape, Document, HttpMethod, Operation, Schema, SchemaRef,
};
use crate::inheritance::InheritanceIndex;
use crate::mime::StructuredMimeTypes;

/// Name accepted in `disabled_rules` to turn every rule off
pub const ALL_RULES: &str = "All";

/// Outcome of one rule body on one unit
pub type RuleResult = anyhow::Result<()>;

/// Unit a rule is dispatched over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Document,
    Operation,
    Schema,
}

// =============================================================================
// Rule Kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentRule {
    NoServerEntry,
    MultipleServerEntries,
}

impl DocumentRule {
    pub const ALL: [DocumentRule; 2] = [Self::NoServerEntry, Self::MultipleServerEntries];

    pub fn name(&self) -> &'static str {
        match self {
            Self::NoServerEntry => "NoServerEntry",
            Self::MultipleServerEntries => "MultipleServerEntries",
        }
    }

    pub fn category(&self) -> Category {
        Category::DocumentShapeIssue
    }

    pub fn check(self, ctx: &RuleContext<'_>, out: &mut Vec<Diagnostic>) -> RuleResult {
        match self {
            Self::NoServerEntry => servers::no_server_entry(ctx, out),
            Self::MultipleServerEntries => servers::multiple_server_entries(ctx, out),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationRule {
    DivergentResponseSchema,
    GetWithBody,
    NoContentWithBody,
    UrlFormEncodedComplex,
}

impl OperationRule {
    pub const ALL: [OperationRule; 4] = [
        Self::DivergentResponseSchema,
        Self::GetWithBody,
        Self::NoContentWithBody,
        Self::UrlFormEncodedComplex,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::DivergentResponseSchema => "DivergentResponseSchema",
            Self::GetWithBody => "GetWithBody",
            Self::NoContentWithBody => "NoContentWithBody",
            Self::UrlFormEncodedComplex => "UrlFormEncodedComplex",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::DivergentResponseSchema => Category::StructuralAmbiguity,
            Self::GetWithBody | Self::NoContentWithBody | Self::UrlFormEncodedComplex => {
                Category::DocumentShapeIssue
            }
        }
    }

    pub fn check(
        self,
        ctx: &RuleContext<'_>,
        unit: &OperationUnit<'_>,
        out: &mut Vec<Diagnostic>,
    ) -> RuleResult {
        match self {
            Self::DivergentResponseSchema => divergent_response::check(ctx, unit, out),
            Self::GetWithBody => bodies::get_with_body(ctx, unit, out),
            Self::NoContentWithBody => bodies::no_content_with_body(ctx, unit, out),
            Self::UrlFormEncodedComplex => bodies::url_form_encoded_complex(ctx, unit, out),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaRule {
    MissingDiscriminator,
    UnsupportedInheritanceSemantics,
    InconsistentTypeFormatPair,
    KnownAndNotSupportedFormats,
}

impl SchemaRule {
    pub const ALL: [SchemaRule; 4] = [
        Self::MissingDiscriminator,
        Self::UnsupportedInheritanceSemantics,
        Self::InconsistentTypeFormatPair,
        Self::KnownAndNotSupportedFormats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingDiscriminator => "MissingDiscriminator",
            Self::UnsupportedInheritanceSemantics => "UnsupportedInheritanceSemantics",
            Self::InconsistentTypeFormatPair => "InconsistentTypeFormatPair",
            Self::KnownAndNotSupportedFormats => "KnownAndNotSupportedFormats",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::MissingDiscriminator => Category::PolymorphismWithoutDiscriminator,
            Self::UnsupportedInheritanceSemantics => Category::InheritancePropertyConflict,
            Self::InconsistentTypeFormatPair => Category::UnsupportedFormat,
            Self::KnownAndNotSupportedFormats => Category::UnsupportedKnownFormat,
        }
    }

    pub fn check(
        self,
        ctx: &RuleContext<'_>,
        unit: &SchemaUnit<'_>,
        out: &mut Vec<Diagnostic>,
    ) -> RuleResult {
        match self {
            Self::MissingDiscriminator => discriminator::check(ctx, unit, out),
            Self::UnsupportedInheritanceSemantics => inheritance_semantics::check(ctx, unit, out),
            Self::InconsistentTypeFormatPair => {
                formats::inconsistent_type_format_pair(ctx, unit, out)
            }
            Self::KnownAndNotSupportedFormats => formats::known_and_not_supported(ctx, unit, out),
        }
    }
}

/// Any rule, tagged with its granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RuleKind {
    Document(DocumentRule),
    Operation(OperationRule),
    Schema(SchemaRule),
}

impl RuleKind {
    /// Every rule in registration order
    pub fn all() -> impl Iterator<Item = RuleKind> {
        DocumentRule::ALL
            .into_iter()
            .map(RuleKind::Document)
            .chain(OperationRule::ALL.into_iter().map(RuleKind::Operation))
            .chain(SchemaRule::ALL.into_iter().map(RuleKind::Schema))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Document(rule) => rule.name(),
            Self::Operation(rule) => rule.name(),
            Self::Schema(rule) => rule.name(),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Document(_) => Granularity::Document,
            Self::Operation(_) => Granularity::Operation,
            Self::Schema(_) => Granularity::Schema,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Document(rule) => rule.category(),
            Self::Operation(rule) => rule.category(),
            Self::Schema(rule) => rule.category(),
        }
    }

    /// Case-insensitive lookup by rule name
    pub fn from_name(name: &str) -> Option<RuleKind> {
        let name = name.trim();
        Self::all().find(|rule| rule.name().eq_ignore_ascii_case(name))
    }
}

impl FromStr for RuleKind {
    type Err = PreflightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| PreflightError::UnknownRule(s.to_string()))
    }
}

impl TryFrom<String> for RuleKind {
    type Error = PreflightError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleKind> for String {
    fn from(rule: RuleKind) -> Self {
        rule.name().to_string()
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<DocumentRule> for RuleKind {
    fn from(rule: DocumentRule) -> Self {
        Self::Document(rule)
    }
}

impl From<OperationRule> for RuleKind {
    fn from(rule: OperationRule) -> Self {
        Self::Operation(rule)
    }
}

impl From<SchemaRule> for RuleKind {
    fn from(rule: SchemaRule) -> Self {
        Self::Schema(rule)
    }
}

// =============================================================================
// Context and Units
// =============================================================================

/// Read-only state shared by every rule body during one pass
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub document: &'a Document,
    pub index: &'a InheritanceIndex,
    pub mime_types: &'a StructuredMimeTypes,
}

impl<'a> RuleContext<'a> {
    pub fn comparer(&self, scope: ComparisonScope) -> SchemaComparer<'a> {
        SchemaComparer::new(&self.document.graph, scope)
    }

    /// Resolve a reference or fail the rule body for this unit
    pub fn resolve(&self, schema: SchemaRef) -> anyhow::Result<&'a Schema> {
        self.document
            .schema(schema)
            .with_context(|| format!("{} is not part of the document graph", schema))
    }
}

/// One operation under one path
#[derive(Debug, Clone, Copy)]
pub struct OperationUnit<'a> {
    pub path: &'a str,
    pub method: HttpMethod,
    pub operation: &'a Operation,
}

impl OperationUnit<'_> {
    pub fn location(&self) -> String {
        operation_pointer(self.path, self.method)
    }

    pub fn display_name(&self) -> String {
        self.operation.display_name(self.path, self.method)
    }
}

/// Where a schema unit was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOrigin<'a> {
    Component {
        name: &'a str,
    },
    InlineResponse {
        path: &'a str,
        method: HttpMethod,
        status: &'a str,
        content_type: &'a str,
    },
}

/// One schema evaluated by schema-level rules
#[derive(Debug, Clone, Copy)]
pub struct SchemaUnit<'a> {
    pub schema: SchemaRef,
    pub origin: SchemaOrigin<'a>,
}

impl SchemaUnit<'_> {
    pub fn location(&self) -> String {
        match self.origin {
            SchemaOrigin::Component { name } => {
                format!("#/components/schemas/{}", pointer_escape(name))
            }
            SchemaOrigin::InlineResponse {
                path,
                method,
                status,
                content_type,
            } => format!(
                "{}/responses/{}/content/{}/schema",
                operation_pointer(path, method),
                pointer_escape(status),
                pointer_escape(content_type)
            ),
        }
    }

    /// Human-facing name used in messages
    pub fn display_name(&self) -> String {
        match self.origin {
            SchemaOrigin::Component { name } => name.to_string(),
            SchemaOrigin::InlineResponse {
                path,
                method,
                status,
                ..
            } => format!(
                "{} response of {} {}",
                status,
                method.as_str().to_uppercase(),
                path
            ),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// `2XX` or a numeric code in 200..=299
pub fn is_success_status(status: &str) -> bool {
    let status = status.trim();
    if status.eq_ignore_ascii_case("2XX") {
        return true;
    }
    matches!(status.parse::<u16>(), Ok(200..=299))
}

/// The inline part of a schema: `root` plus everything reachable from it without passing
/// through another named component. Each entry carries its JSON pointer suffix relative
/// to `root`. Revisited nodes are skipped.
pub(crate) fn inline_subtree(document: &Document, root: SchemaRef) -> Vec<(String, SchemaRef)> {
    let mut visited = HashSet::new();
    let mut nodes = Vec::new();
    let mut stack = vec![(String::new(), root)];

    while let Some((pointer, schema_ref)) = stack.pop() {
        if !visited.insert(schema_ref) {
            continue;
        }
        if schema_ref != root && document.components.is_component(schema_ref) {
            continue;
        }
        let Some(schema) = document.schema(schema_ref) else {
            continue;
        };

        // Pushed in reverse so nodes come out in declaration order
        for (keyword, members) in [
            ("anyOf", &schema.any_of),
            ("oneOf", &schema.one_of),
            ("allOf", &schema.all_of),
        ] {
            for (i, member) in members.iter().enumerate().rev() {
                stack.push((format!("{}/{}/{}", pointer, keyword, i), *member));
            }
        }
        if let Some(additional) = schema.additional_properties {
            stack.push((format!("{}/additionalProperties", pointer), additional));
        }
        if let Some(items) = schema.items {
            stack.push((format!("{}/items", pointer), items));
        }
        for (name, property) in schema.properties.iter().rev() {
            stack.push((format!("{}/properties/{}", pointer, pointer_escape(name)), *property));
        }

        nodes.push((pointer, schema_ref));
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Info;

    #[test]
    fn test_rule_names_round_trip_case_insensitively() {
        for rule in RuleKind::all() {
            assert_eq!(RuleKind::from_name(&rule.name().to_uppercase()), Some(rule));
        }
        assert_eq!(RuleKind::all().count(), 10);
        assert!(matches!(
            "NoSuchRule".parse::<RuleKind>(),
            Err(PreflightError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_rule_kind_serializes_as_name() {
        let json =
            serde_json::to_string(&RuleKind::from(SchemaRule::MissingDiscriminator)).unwrap();
        assert_eq!(json, "\"MissingDiscriminator\"");
        let back: RuleKind = serde_json::from_str("\"getwithbody\"").unwrap();
        assert_eq!(back, RuleKind::Operation(OperationRule::GetWithBody));
    }

    #[test]
    fn test_success_status() {
        assert!(is_success_status("200"));
        assert!(is_success_status("2xx"));
        assert!(is_success_status("299"));
        assert!(!is_success_status("300"));
        assert!(!is_success_status("default"));
    }

    #[test]
    fn test_inline_subtree_stops_at_components() {
        let mut doc = Document::new(Info::new("t", "1"));
        let address = doc.add_component("Address", Schema::object());
        let email = doc.add_schema(Schema::string().with_format("email"));
        let user = doc.add_component(
            "User",
            Schema::object()
                .with_property("email", email)
                .with_property("home", address),
        );

        let nodes = inline_subtree(&doc, user);
        let pointers: Vec<&str> = nodes.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(pointers, vec!["", "/properties/email"]);
    }

    #[test]
    fn test_schema_unit_locations() {
        let mut graph = crate::graph::SchemaGraph::new();
        let schema = graph.add(Schema::object());

        let component = SchemaUnit {
            schema,
            origin: SchemaOrigin::Component { name: "a/b" },
        };
        assert_eq!(component.location(), "#/components/schemas/a~1b");

        let inline = SchemaUnit {
            schema,
            origin: SchemaOrigin::InlineResponse {
                path: "/pets",
                method: HttpMethod::Get,
                status: "200",
                content_type: "application/json",
            },
        };
        assert_eq!(
            inline.location(),
            "#/paths/~1pets/get/responses/200/content/application~1json/schema"
        );
        assert_eq!(inline.display_name(), "200 response of GET /pets");
    }
}
