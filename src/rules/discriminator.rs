//! Polymorphic unions without a usable discriminator

use super::{RuleContext, RuleResult, SchemaRule, SchemaUnit};
use crate::diagnostics::Diagnostic;

pub(super) fn check(
    ctx: &RuleContext<'_>,
    unit: &SchemaUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    let schema = ctx.resolve(unit.schema)?;
    if !schema.is_exclusive_union() && !schema.is_inclusive_union() {
        return Ok(());
    }

    let mut has_object_member = false;
    for member in schema.one_of.iter().chain(&schema.any_of) {
        if ctx.resolve(*member)?.is_object_type() {
            has_object_member = true;
            break;
        }
    }
    if !has_object_member {
        return Ok(());
    }

    let has_property = schema.discriminator_property().is_some();
    let has_mapping = !ctx
        .index
        .discriminator_mappings(ctx.document, unit.schema)
        .is_empty();
    if has_property && has_mapping {
        return Ok(());
    }

    let union = if schema.is_exclusive_union() { "oneOf" } else { "anyOf" };
    let reason = if has_property {
        "its discriminator maps no value to a concrete type"
    } else {
        "it does not declare a discriminator property"
    };
    out.push(Diagnostic::warning(
        SchemaRule::MissingDiscriminator,
        unit.location(),
        format!(
            "The schema {} is a polymorphic {} of object types but {}. \
             Deserializing it will fail without a discriminator.",
            unit.display_name(),
            union,
            reason
        ),
    ));
    Ok(())
}
