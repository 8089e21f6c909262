//! Properties redefined with another shape through composition

use std::collections::{BTreeMap, HashSet};

use super::{RuleContext, RuleResult, SchemaRule, SchemaUnit};
use crate::diagnostics::Diagnostic;
use crate::equivalence::ComparisonScope;
use crate::graph::{Document, SchemaRef};

pub(super) fn check(
    ctx: &RuleContext<'_>,
    unit: &SchemaUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    ctx.resolve(unit.schema)?;

    let mut by_path: BTreeMap<String, Vec<SchemaRef>> = BTreeMap::new();
    let mut visited = HashSet::new();
    collect_properties(ctx.document, unit.schema, "", &mut visited, &mut by_path);

    let comparer = ctx.comparer(ComparisonScope::Property);
    for (path, definitions) in by_path {
        let shapes = comparer.group(definitions.into_iter().map(|r| ((), r)));
        if shapes.len() > 1 {
            out.push(Diagnostic::warning(
                SchemaRule::UnsupportedInheritanceSemantics,
                unit.location(),
                format!(
                    "The property {} of schema {} is defined with {} incompatible types across its compositions. \
                     The inherited field will be overwritten.",
                    path,
                    unit.display_name(),
                    shapes.len()
                ),
            ));
        }
    }
    Ok(())
}

/// Every property reachable through `properties` and `allOf`/`anyOf`/`oneOf`, keyed by
/// dotted path. One visited set spans the whole expansion.
fn collect_properties(
    document: &Document,
    schema_ref: SchemaRef,
    prefix: &str,
    visited: &mut HashSet<SchemaRef>,
    by_path: &mut BTreeMap<String, Vec<SchemaRef>>,
) {
    if !visited.insert(schema_ref) {
        return;
    }
    let Some(schema) = document.schema(schema_ref) else {
        return;
    };

    for (name, property) in &schema.properties {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        by_path.entry(path.clone()).or_default().push(*property);
        collect_properties(document, *property, &path, visited, by_path);
    }

    for member in schema.all_of.iter().chain(&schema.any_of).chain(&schema.one_of) {
        collect_properties(document, *member, prefix, visited, by_path);
    }
}
