//! Engine Tests
//!
//! Whole-pass behavior: divergence scoping, response selection, configuration,
//! preconditions, cancellation and parallel determinism.

use std::sync::Barrier;

use openapi_preflight::{
    select_response_schema, CancellationToken, Category, Document, HttpMethod, Info, JsonType,
    Operation, OperationRule, PathItem, PreflightError, Response, RuleEngine, RuleKind, Schema,
    SchemaRef, SchemaRule, Severity, StructuredMimeTypes, ValidationConfig,
};

fn doc() -> Document {
    Document::new(Info::new("engine", "1.0")).with_server("https://api.example.com")
}

fn engine() -> RuleEngine {
    RuleEngine::new(&ValidationConfig::default().with_max_degree_of_parallelism(4)).unwrap()
}

fn object_with(doc: &mut Document, name: &str, kind: JsonType) -> SchemaRef {
    let property = doc.add_schema(Schema::of_type(kind));
    doc.add_schema(Schema::object().with_property(name, property))
}

fn json(schema: SchemaRef) -> Response {
    Response::new("ok").with_content("application/json", schema)
}

fn get(doc: &mut Document, path: &str, operation: Operation) {
    doc.add_path(path, PathItem::new().with_operation(HttpMethod::Get, operation));
}

// =============================================================================
// Divergent Responses
// =============================================================================

#[test]
fn test_equivalent_success_responses_do_not_diverge() {
    let mut doc = doc();
    let ok = object_with(&mut doc, "a", JsonType::String);
    let created = object_with(&mut doc, "a", JsonType::String);
    get(
        &mut doc,
        "/items",
        Operation::new()
            .with_response("200", json(ok))
            .with_response("201", json(created)),
    );

    let report = engine().validate(&doc).unwrap();
    assert_eq!(report.diagnostics.count_for(OperationRule::DivergentResponseSchema), 0);
}

#[test]
fn test_divergent_success_responses() {
    let mut doc = doc();
    let ok = object_with(&mut doc, "a", JsonType::String);
    let created = object_with(&mut doc, "a", JsonType::String);
    let accepted = object_with(&mut doc, "a", JsonType::Integer);
    let operation = Operation::new()
        .with_operation_id("listItems")
        .with_response("200", json(ok))
        .with_response("201", json(created))
        .with_response("202", json(accepted));
    get(&mut doc, "/items", operation.clone());

    let report = engine().validate(&doc).unwrap();
    let warnings: Vec<_> = report
        .diagnostics
        .for_rule(OperationRule::DivergentResponseSchema)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].location, "#/paths/~1items/get");
    assert_eq!(warnings[0].category, Category::StructuralAmbiguity);
    assert!(warnings[0].message.contains("listItems"));

    let selected = select_response_schema(&operation, engine().mime_types());
    assert_eq!(selected, Some(("200", ok)));
}

#[test]
fn test_divergence_is_scoped_per_operation() {
    let mut doc = doc();
    let users = object_with(&mut doc, "name", JsonType::String);
    let orders = object_with(&mut doc, "total", JsonType::Number);
    get(&mut doc, "/users", Operation::new().with_response("200", json(users)));
    get(&mut doc, "/orders", Operation::new().with_response("200", json(orders)));

    let report = engine().validate(&doc).unwrap();
    assert_eq!(report.diagnostics.count_for(OperationRule::DivergentResponseSchema), 0);
}

#[test]
fn test_divergence_only_considers_structured_content() {
    let mut doc = doc();
    let ok = object_with(&mut doc, "a", JsonType::String);
    let other = object_with(&mut doc, "a", JsonType::Integer);
    get(
        &mut doc,
        "/xml",
        Operation::new()
            .with_response("200", json(ok))
            .with_response("201", Response::new("xml").with_content("application/xml", other)),
    );
    get(
        &mut doc,
        "/vendor",
        Operation::new()
            .with_response("200", json(ok))
            .with_response(
                "201",
                Response::new("vendor").with_content("application/vnd.example+json", other),
            ),
    );

    let report = engine().validate(&doc).unwrap();
    let locations: Vec<&str> = report
        .diagnostics
        .for_rule(OperationRule::DivergentResponseSchema)
        .map(|d| d.location.as_str())
        .collect();
    assert_eq!(locations, vec!["#/paths/~1vendor/get"]);
}

#[test]
fn test_status_codes_beyond_203_are_ignored() {
    let mut doc = doc();
    let ok = object_with(&mut doc, "a", JsonType::String);
    let partial = object_with(&mut doc, "a", JsonType::Integer);
    get(
        &mut doc,
        "/range",
        Operation::new()
            .with_response("200", json(ok))
            .with_response("206", json(partial)),
    );

    let report = engine().validate(&doc).unwrap();
    assert_eq!(report.diagnostics.count_for(OperationRule::DivergentResponseSchema), 0);
}

#[test]
fn test_selection_prefers_highest_quality_then_lowest_status() {
    let mut doc = doc();
    let text = doc.add_schema(Schema::string());
    let body = object_with(&mut doc, "a", JsonType::String);
    let created = object_with(&mut doc, "b", JsonType::String);
    let mime =
        StructuredMimeTypes::parse(&ValidationConfig::default().structured_mime_types).unwrap();

    let operation = Operation::new().with_response(
        "200",
        Response::new("ok")
            .with_content("text/plain", text)
            .with_content("application/json", body),
    );
    assert_eq!(select_response_schema(&operation, &mime), Some(("200", body)));

    let operation = Operation::new()
        .with_response(
            "200",
            Response::new("binary").with_content("application/octet-stream", text),
        )
        .with_response("201", json(created));
    assert_eq!(select_response_schema(&operation, &mime), Some(("201", created)));

    assert_eq!(select_response_schema(&Operation::new(), &mime), None);
}

// =============================================================================
// Units
// =============================================================================

#[test]
fn test_inline_response_units_are_not_deduplicated() {
    let mut doc = doc();
    let first = doc.add_schema(Schema::string().with_format("email"));
    let second = doc.add_schema(Schema::string().with_format("email"));
    get(&mut doc, "/a", Operation::new().with_response("200", json(first)));
    get(&mut doc, "/b", Operation::new().with_response("2XX", json(second)));

    let report = engine().validate(&doc).unwrap();
    assert_eq!(report.diagnostics.count_for(SchemaRule::KnownAndNotSupportedFormats), 2);
    // two operations, two inline schemas
    assert_eq!(report.units_evaluated, 4);
}

#[test]
fn test_component_response_is_evaluated_once() {
    let mut doc = doc();
    let email = doc.add_schema(Schema::string().with_format("email"));
    let user = doc.add_component("User", Schema::object().with_property("email", email));
    get(&mut doc, "/users", Operation::new().with_response("200", json(user)));

    let report = engine().validate(&doc).unwrap();
    assert_eq!(report.diagnostics.count_for(SchemaRule::KnownAndNotSupportedFormats), 1);
}

#[test]
fn test_error_responses_are_not_schema_units() {
    let mut doc = doc();
    let problem = doc.add_schema(Schema::string().with_format("email"));
    get(
        &mut doc,
        "/a",
        Operation::new().with_response("404", json(problem)),
    );

    let report = engine().validate(&doc).unwrap();
    assert_eq!(report.diagnostics.count_for(SchemaRule::KnownAndNotSupportedFormats), 0);
}

#[test]
fn test_recursive_components_validate() {
    let mut doc = doc();
    let node = doc.reserve_component("Node");
    let children = doc.add_schema(Schema::array(node));
    doc.define(
        node,
        Schema::object()
            .with_property("children", children)
            .with_property("parent", node),
    )
    .unwrap();

    let report = engine().validate(&doc).unwrap();
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.recursion.len(), 1);
    assert!(report.recursion.is_recursive(node));
}

#[test]
fn test_report_exposes_inheritance_index() {
    let mut doc = doc();
    let pet = doc.add_component("Pet", Schema::object());
    doc.add_component("Cat", Schema::new().with_all_of([pet]));

    let report = engine().validate(&doc).unwrap();
    let subtypes: Vec<&str> = report.inheritance.direct_subtypes("pet").collect();
    assert_eq!(subtypes, vec!["Cat"]);
}

// =============================================================================
// Configuration and Preconditions
// =============================================================================

#[test]
fn test_disabled_rules_are_case_insensitive() {
    let config = ValidationConfig::default()
        .with_disabled_rule("divergentresponseschema")
        .with_disabled_rule("NOSERVERENTRY");
    let engine = RuleEngine::new(&config).unwrap();
    let enabled = engine.enabled_rules();
    assert_eq!(enabled.len(), RuleKind::all().count() - 2);
    assert!(!enabled.contains(&RuleKind::from(OperationRule::DivergentResponseSchema)));

    let mut doc = Document::new(Info::new("no servers", "1.0"));
    let ok = object_with(&mut doc, "a", JsonType::String);
    let other = object_with(&mut doc, "a", JsonType::Integer);
    get(
        &mut doc,
        "/a",
        Operation::new()
            .with_response("200", json(ok))
            .with_response("201", json(other)),
    );
    assert!(engine.validate(&doc).unwrap().diagnostics.is_empty());
}

#[test]
fn test_invalid_configuration_fails_fast() {
    let zero = ValidationConfig::default().with_max_degree_of_parallelism(0);
    assert!(matches!(RuleEngine::new(&zero), Err(PreflightError::InvalidConfig(_))));

    let mime = ValidationConfig::default().with_structured_mime_types(["json"]);
    assert!(matches!(
        RuleEngine::new(&mime),
        Err(PreflightError::InvalidMimeType { .. })
    ));

    let unknown = ValidationConfig::default().with_disabled_rule("Bogus");
    assert!(matches!(RuleEngine::new(&unknown), Err(PreflightError::UnknownRule(_))));
}

#[test]
fn test_undefined_schema_fails_before_traversal() {
    let mut doc = doc();
    doc.reserve_component("Later");
    assert!(matches!(
        engine().validate(&doc),
        Err(PreflightError::UndefinedSchema { .. })
    ));
}

#[test]
fn test_cancelled_before_start() {
    let mut doc = doc();
    doc.add_component("A", Schema::object());
    let token = CancellationToken::new();
    token.cancel();

    match engine().validate_with_cancellation(&doc, &token) {
        Err(PreflightError::Cancelled { completed, total }) => {
            assert_eq!(completed, 0);
            assert_eq!(total, 1);
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
}

#[test]
fn test_cancelled_between_units() {
    let mut doc = doc();
    for i in 0..5000 {
        let email = doc.add_schema(Schema::string().with_format("email"));
        let id = doc.add_schema(Schema::integer().with_format("uuid"));
        doc.add_component(
            format!("Contact{}", i),
            Schema::object()
                .with_property("email", email)
                .with_property("id", id),
        );
    }
    let config = ValidationConfig::default().with_max_degree_of_parallelism(1);
    let engine = RuleEngine::new(&config).unwrap();
    let token = CancellationToken::new();
    let start = Barrier::new(2);

    let result = std::thread::scope(|scope| {
        scope.spawn(|| {
            start.wait();
            token.cancel();
        });
        start.wait();
        engine.validate_with_cancellation(&doc, &token)
    });

    match result {
        Err(PreflightError::Cancelled { completed, total }) => {
            assert_eq!(total, 5000);
            assert!(completed < total);
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
}

// =============================================================================
// Parallel Determinism
// =============================================================================

fn busy_document() -> Document {
    let mut doc = Document::new(Info::new("busy", "1.0"))
        .with_server("https://a.example.com")
        .with_server("https://b.example.com");
    for i in 0..40 {
        let ok = object_with(&mut doc, "a", JsonType::String);
        let other = object_with(&mut doc, "a", JsonType::Integer);
        let email = doc.add_schema(Schema::string().with_format("email"));
        doc.add_component(format!("Contact{}", i), Schema::object().with_property("email", email));
        get(
            &mut doc,
            &format!("/items/{}", i),
            Operation::new()
                .with_response("200", json(ok))
                .with_response("201", json(other)),
        );
    }
    doc
}

#[test]
fn test_worker_count_does_not_change_results() {
    let doc = busy_document();
    let render = |workers: i32| -> Vec<String> {
        let config = ValidationConfig::default().with_max_degree_of_parallelism(workers);
        let report = RuleEngine::new(&config).unwrap().validate(&doc).unwrap();
        report.diagnostics.sorted().iter().map(|d| d.to_string()).collect()
    };

    let single = render(1);
    assert_eq!(single.len(), 1 + 40 + 40);
    assert_eq!(single, render(8));
    assert_eq!(single, render(-1));
}

#[test]
fn test_diagnostic_rendering() {
    let doc = Document::new(Info::new("bare", "1.0"));
    let report = engine().validate(&doc).unwrap();
    let rendered: Vec<String> = report.diagnostics.all().iter().map(|d| d.to_string()).collect();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].starts_with("warning: #/servers - "));
    assert!(report.diagnostics.all().iter().all(|d| d.severity == Severity::Warning));
}
