//! Rule Engine
//!
//! Runs the enabled rules over one [`Document`]:
//!
//! 1. Preconditions: document integrity, configuration already validated by [`RuleEngine::new`].
//! 2. Build the [`InheritanceIndex`] once; it is only read afterwards.
//! 3. Document rules run on the calling thread.
//! 4. Operation and schema units are queued and drained by a scoped worker pool. Workers
//!    check the cancellation token before taking each unit.
//!
//! Each (rule, unit) pair runs guarded: an `Err` or a panic from the rule body discards
//! whatever that body produced for the unit and becomes a single rule-failure diagnostic.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

use crate::config::ValidationConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, Diagnostics};
use crate::error::{PreflightError, Result};
use crate::graph::{Document, RecursionAnalysis};
use crate::inheritance::InheritanceIndex;
use crate::mime::StructuredMimeTypes;
use crate::rules::{
    is_success_status, DocumentRule, OperationRule, OperationUnit, RuleContext, RuleKind,
    RuleResult, SchemaOrigin, SchemaRule, SchemaUnit, ALL_RULES,
};

/// Cooperative cancellation flag shared with a running pass
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Result of one validation pass
#[derive(Debug)]
pub struct ValidationReport {
    pub diagnostics: Diagnostics,
    /// Reused downstream to build polymorphic dispatch tables
    pub inheritance: InheritanceIndex,
    pub recursion: RecursionAnalysis,
    /// Operation and schema units evaluated
    pub units_evaluated: usize,
}

/// Unit of fan-out work
#[derive(Debug, Clone, Copy)]
enum WorkUnit<'a> {
    Operation(OperationUnit<'a>),
    Schema(SchemaUnit<'a>),
}

/// Validation entry point
#[derive(Debug, Clone)]
pub struct RuleEngine {
    document_rules: Vec<DocumentRule>,
    operation_rules: Vec<OperationRule>,
    schema_rules: Vec<SchemaRule>,
    mime_types: StructuredMimeTypes,
    workers: usize,
}

impl RuleEngine {
    /// Validate the configuration and resolve the enabled rule set
    pub fn new(config: &ValidationConfig) -> Result<Self> {
        let workers = config.worker_count()?;
        let mime_types = StructuredMimeTypes::parse(&config.structured_mime_types)?;

        let mut disabled = Vec::new();
        let mut disable_all = false;
        for name in &config.disabled_rules {
            if name.trim().eq_ignore_ascii_case(ALL_RULES) {
                disable_all = true;
            } else {
                disabled.push(name.parse::<RuleKind>()?);
            }
        }
        let enabled = |rule: RuleKind| !disable_all && !disabled.contains(&rule);

        let engine = Self {
            document_rules: DocumentRule::ALL
                .into_iter()
                .filter(|r| enabled((*r).into()))
                .collect(),
            operation_rules: OperationRule::ALL
                .into_iter()
                .filter(|r| enabled((*r).into()))
                .collect(),
            schema_rules: SchemaRule::ALL
                .into_iter()
                .filter(|r| enabled((*r).into()))
                .collect(),
            mime_types,
            workers,
        };

        debug!(
            rules = engine.enabled_rules().len(),
            workers = engine.workers,
            "rule engine configured"
        );
        Ok(engine)
    }

    /// Rules that will run, in registration order
    pub fn enabled_rules(&self) -> Vec<RuleKind> {
        self.document_rules
            .iter()
            .map(|r| RuleKind::from(*r))
            .chain(self.operation_rules.iter().map(|r| RuleKind::from(*r)))
            .chain(self.schema_rules.iter().map(|r| RuleKind::from(*r)))
            .collect()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn mime_types(&self) -> &StructuredMimeTypes {
        &self.mime_types
    }

    pub fn validate(&self, document: &Document) -> Result<ValidationReport> {
        self.validate_with_cancellation(document, &CancellationToken::new())
    }

    pub fn validate_with_cancellation(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<ValidationReport> {
        let span = tracing::info_span!("validate", title = %document.info.title);
        let _enter = span.enter();

        document.check_integrity()?;

        let recursion = document.graph.recursive_groups();
        debug!(
            schemas = document.graph.len(),
            recursive_groups = recursion.len(),
            "schema graph analyzed"
        );

        let index = InheritanceIndex::build(document);
        let ctx = RuleContext {
            document,
            index: &index,
            mime_types: &self.mime_types,
        };

        let units = if self.operation_rules.is_empty() && self.schema_rules.is_empty() {
            Vec::new()
        } else {
            gather_units(document)
        };
        let total = units.len();
        debug!(units = total, workers = self.workers, "dispatching rules");

        if cancel.is_cancelled() {
            return Err(PreflightError::Cancelled {
                completed: 0,
                total,
            });
        }

        let sink = DiagnosticSink::new();
        for rule in &self.document_rules {
            sink.extend(run_guarded((*rule).into(), "#", |out| rule.check(&ctx, out)));
        }

        let completed = self.fan_out(&ctx, units, &sink, cancel);
        if completed < total {
            warn!(completed, total, "validation cancelled");
            return Err(PreflightError::Cancelled { completed, total });
        }

        let diagnostics = sink.into_diagnostics();
        info!(
            units = total,
            warnings = diagnostics.warning_count(),
            errors = diagnostics.error_count(),
            "validation complete"
        );

        Ok(ValidationReport {
            diagnostics,
            inheritance: index,
            recursion,
            units_evaluated: completed,
        })
    }

    /// Drain `units` across the worker pool; returns how many were evaluated
    fn fan_out(
        &self,
        ctx: &RuleContext<'_>,
        units: Vec<WorkUnit<'_>>,
        sink: &DiagnosticSink,
        cancel: &CancellationToken,
    ) -> usize {
        if units.is_empty() {
            return 0;
        }

        let workers = self.workers.min(units.len()).max(1);
        let (sender, receiver) = unbounded();
        for unit in units {
            if sender.send(unit).is_err() {
                break;
            }
        }
        drop(sender);

        let completed = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let receiver = receiver.clone();
                let completed = &completed;
                scope.spawn(move || {
                    while let Ok(unit) = receiver.recv() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        sink.extend(self.evaluate(ctx, &unit));
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        completed.into_inner()
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, unit: &WorkUnit<'_>) -> Vec<Diagnostic> {
        let mut produced = Vec::new();
        match unit {
            WorkUnit::Operation(operation) => {
                let location = operation.location();
                for rule in &self.operation_rules {
                    produced.extend(run_guarded((*rule).into(), &location, |out| {
                        rule.check(ctx, operation, out)
                    }));
                }
            }
            WorkUnit::Schema(schema) => {
                let location = schema.location();
                for rule in &self.schema_rules {
                    produced.extend(run_guarded((*rule).into(), &location, |out| {
                        rule.check(ctx, schema, out)
                    }));
                }
            }
        }
        produced
    }
}

/// Operations, component schemas, then inline success-response schemas. Inline schemas
/// that point at a component are left to the component unit.
fn gather_units(document: &Document) -> Vec<WorkUnit<'_>> {
    let mut units: Vec<WorkUnit<'_>> = document
        .operations()
        .map(|(path, method, operation)| {
            WorkUnit::Operation(OperationUnit {
                path,
                method,
                operation,
            })
        })
        .collect();

    units.extend(document.components.iter().map(|(name, schema)| {
        WorkUnit::Schema(SchemaUnit {
            schema,
            origin: SchemaOrigin::Component { name },
        })
    }));

    for (path, method, operation) in document.operations() {
        for (status, response) in &operation.responses {
            if !is_success_status(status) {
                continue;
            }
            for (content_type, schema) in response.schemas() {
                if document.components.is_component(schema) {
                    continue;
                }
                units.push(WorkUnit::Schema(SchemaUnit {
                    schema,
                    origin: SchemaOrigin::InlineResponse {
                        path,
                        method,
                        status,
                        content_type,
                    },
                }));
            }
        }
    }

    units
}

/// Run one rule body on one unit, converting an error or panic into a diagnostic
fn run_guarded<F>(rule: RuleKind, location: &str, body: F) -> Vec<Diagnostic>
where
    F: FnOnce(&mut Vec<Diagnostic>) -> RuleResult,
{
    let mut produced = Vec::new();
    match panic::catch_unwind(AssertUnwindSafe(|| body(&mut produced))) {
        Ok(Ok(())) => produced,
        Ok(Err(error)) => {
            warn!(rule = %rule, location, error = %format!("{:#}", error), "rule failed");
            vec![Diagnostic::rule_failure(rule, location, format!("{:#}", error))]
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(rule = %rule, location, panic = %message, "rule panicked");
            vec![Diagnostic::rule_failure(
                rule,
                location,
                format!("panicked: {}", message),
            )]
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
