//! Divergent success-response schemas

use super::{OperationRule, OperationUnit, RuleContext, RuleResult};
use crate::diagnostics::Diagnostic;
use crate::equivalence::ComparisonScope;
use crate::graph::{Operation, SchemaRef};
use crate::mime::StructuredMimeTypes;

/// Status codes whose payloads compete for the generated return type, lowest first
pub const DIVERGENCE_STATUS_CODES: [&str; 4] = ["200", "201", "202", "203"];

pub(super) fn check(
    ctx: &RuleContext<'_>,
    unit: &OperationUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    let mut candidates: Vec<(&str, SchemaRef)> = Vec::new();
    for status in DIVERGENCE_STATUS_CODES {
        let Some(response) = unit.operation.response(status) else {
            continue;
        };
        for (content_type, schema) in response.schemas() {
            if ctx.mime_types.is_structured(content_type) {
                candidates.push((status, schema));
            }
        }
    }

    let groups = ctx.comparer(ComparisonScope::Schema).group(candidates);
    if groups.len() > 1 {
        let codes: Vec<&str> = groups.iter().map(|g| g.representative().0).collect();
        out.push(Diagnostic::warning(
            OperationRule::DivergentResponseSchema,
            unit.location(),
            format!(
                "The operation {} returns {} different schemas for success status codes ({}). \
                 Only the schema of the lowest status code will be used for generation.",
                unit.display_name(),
                groups.len(),
                codes.join(", ")
            ),
        ));
    }
    Ok(())
}

/// The schema generation uses for an operation's return type: the first of 200..=203
/// with structured content, taking the highest-weighted content type within it (first
/// declared on ties).
pub fn select_response_schema(
    operation: &Operation,
    mime_types: &StructuredMimeTypes,
) -> Option<(&'static str, SchemaRef)> {
    DIVERGENCE_STATUS_CODES.into_iter().find_map(|status| {
        let response = operation.response(status)?;
        let mut best: Option<(f32, SchemaRef)> = None;
        for (content_type, schema) in response.schemas() {
            let Some(quality) = mime_types.quality(content_type) else {
                continue;
            };
            if best.map_or(true, |(q, _)| quality > q) {
                best = Some((quality, schema));
            }
        }
        best.map(|(_, schema)| (status, schema))
    })
}
