//! OpenAPI Preflight
//!
//! Decides, before any code is emitted, whether an API description graph can be translated
//! deterministically into generated models and clients.
//!
//! ## Features
//!
//! - **Cycle-safe structural equivalence**: hash-based comparison of schema subgraphs that
//!   terminates on self-referential and mutually recursive schemas
//! - **Inheritance index**: one pass over the components, shared read-only by every rule
//! - **Rule engine**: document, operation and schema rules fanned out over a worker pool,
//!   with per-unit failure isolation and cooperative cancellation
//!
//! ## Architecture
//!
//! ```text
//! Document ──► RuleEngine::validate
//!                 ├── check_integrity
//!                 ├── InheritanceIndex::build        (once, then read-only)
//!                 ├── DocumentRule::check            (calling thread)
//!                 └── worker pool
//!                       ├── OperationRule::check ──► SchemaComparer
//!                       └── SchemaRule::check    ──► SchemaComparer, InheritanceIndex
//!                                 │
//!                                 ▼
//!                          DiagnosticSink ──► ValidationReport
//! ```
//!
//! ## Example
//!
//! ```
//! use openapi_preflight::{Document, Info, Schema, RuleEngine, ValidationConfig};
//!
//! let mut doc = Document::new(Info::new("Pets", "1.0")).with_server("https://api.example.com");
//! let id = doc.add_schema(Schema::string().with_format("uuid"));
//! doc.add_component("Pet", Schema::object().with_property("id", id));
//!
//! let engine = RuleEngine::new(&ValidationConfig::default()).unwrap();
//! let report = engine.validate(&doc).unwrap();
//! assert!(report.diagnostics.is_empty());
//! ```

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod equivalence;
pub mod error;
pub mod graph;
pub mod inheritance;
pub mod logging;
pub mod mime;
pub mod rules;

pub use config::{LoggingConfig, PreflightConfig, ValidationConfig};
pub use diagnostics::{Category, Diagnostic, DiagnosticSink, Diagnostics, Severity};
pub use engine::{CancellationToken, RuleEngine, ValidationReport};
pub use equivalence::{ComparisonScope, EquivalenceGroup, SchemaComparer};
pub use error::{PreflightError, Result};
pub use graph::{
    Discriminator, Document, HttpMethod, Info, JsonType, Operation, PathItem, RequestBody,
    Response, Schema, SchemaGraph, SchemaRef, TypeSet,
};
pub use inheritance::{DiscriminatorMapping, InheritanceIndex};
pub use logging::{init_tracing, log_diagnostics};
pub use mime::StructuredMimeTypes;
pub use rules::{
    select_response_schema, DocumentRule, Granularity, OperationRule, RuleKind, SchemaRule,
};
