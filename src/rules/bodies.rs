//! Request and response body shape checks

use super::{OperationRule, OperationUnit, RuleContext, RuleResult};
use crate::diagnostics::Diagnostic;
use crate::graph::{pointer_escape, HttpMethod, MediaType, SchemaRef};

const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";

pub(super) fn get_with_body(
    _ctx: &RuleContext<'_>,
    unit: &OperationUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    if unit.method == HttpMethod::Get && unit.operation.request_body.is_some() {
        out.push(Diagnostic::warning(
            OperationRule::GetWithBody,
            format!("{}/requestBody", unit.location()),
            format!(
                "A GET operation with a body was found ({}). The request body will be ignored.",
                unit.display_name()
            ),
        ));
    }
    Ok(())
}

pub(super) fn no_content_with_body(
    _ctx: &RuleContext<'_>,
    unit: &OperationUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    if let Some(response) = unit.operation.response("204") {
        if !response.content.is_empty() {
            out.push(Diagnostic::warning(
                OperationRule::NoContentWithBody,
                format!("{}/responses/204", unit.location()),
                format!(
                    "A 204 response with a body media type was found ({}). The response body will be ignored.",
                    unit.display_name()
                ),
            ));
        }
    }
    Ok(())
}

pub(super) fn url_form_encoded_complex(
    ctx: &RuleContext<'_>,
    unit: &OperationUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    let base = unit.location();

    if let Some(body) = &unit.operation.request_body {
        check_content(ctx, &body.content, &format!("{}/requestBody", base), out)?;
    }
    for (status, response) in &unit.operation.responses {
        let pointer = format!("{}/responses/{}", base, pointer_escape(status));
        check_content(ctx, &response.content, &pointer, out)?;
    }
    Ok(())
}

fn check_content(
    ctx: &RuleContext<'_>,
    content: &[(String, MediaType)],
    pointer: &str,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    for (content_type, media) in content {
        if ctx.mime_types.normalize(content_type) != FORM_URL_ENCODED {
            continue;
        }
        let Some(schema_ref) = media.schema else {
            continue;
        };
        let location = format!("{}/content/{}/schema", pointer, pointer_escape(content_type));
        if let Some(message) = form_encoding_problem(ctx, schema_ref)? {
            out.push(Diagnostic::warning(
                OperationRule::UrlFormEncodedComplex,
                location,
                message,
            ));
        }
    }
    Ok(())
}

/// Form encoding flattens one object of scalar (or scalar array) fields
fn form_encoding_problem(
    ctx: &RuleContext<'_>,
    schema_ref: SchemaRef,
) -> anyhow::Result<Option<String>> {
    let schema = ctx.resolve(schema_ref)?;
    if !schema.is_object_type() {
        return Ok(Some(
            "The schema is not an object; form url encoded serialization only supports object schemas."
                .to_string(),
        ));
    }

    for (name, property_ref) in &schema.properties {
        let property = ctx.resolve(*property_ref)?;
        let nested_object = match property.items.filter(|_| property.is_array()) {
            Some(items) => ctx.resolve(items)?.is_object_type(),
            None => false,
        };
        if property.is_object_type() || nested_object {
            return Ok(Some(format!(
                "The property {} is a complex type, which form url encoded serialization does not support.",
                name
            )));
        }
    }
    Ok(None)
}
