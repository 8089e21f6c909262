//! Type/format pairs generation cannot honor
//!
//! Formats are compared case-insensitively. Only `string`, `integer` and `number` carry a
//! format table; every other type is exempt from the pair check.

use super::{inline_subtree, RuleContext, RuleResult, SchemaRule, SchemaUnit};
use crate::diagnostics::Diagnostic;
use crate::graph::JsonType;

pub const STRING_FORMATS: &[&str] = &[
    "date",
    "date-time",
    "time",
    "duration",
    "uuid",
    "byte",
    "binary",
    "base64url",
    "commonmark",
    "html",
];

pub const INTEGER_FORMATS: &[&str] = &["int8", "uint8", "int16", "uint16", "int32", "int64"];

pub const NUMBER_FORMATS: &[&str] = &[
    "float", "double", "decimal", "int8", "uint8", "int16", "uint16", "int32", "int64",
];

/// Recognized formats that still fall back to a plain string
pub const KNOWN_UNSUPPORTED_FORMATS: &[&str] = &[
    "email",
    "idn-email",
    "hostname",
    "idn-hostname",
    "ipv4",
    "ipv6",
    "uri",
    "uri-reference",
    "uri-template",
    "iri",
    "iri-reference",
    "json-pointer",
    "relative-json-pointer",
    "regex",
];

/// Valid formats for a type, `None` when the type takes no format check
pub fn valid_formats_for(kind: JsonType) -> Option<&'static [&'static str]> {
    match kind {
        JsonType::String => Some(STRING_FORMATS),
        JsonType::Integer => Some(INTEGER_FORMATS),
        JsonType::Number => Some(NUMBER_FORMATS),
        JsonType::Boolean | JsonType::Array | JsonType::Object | JsonType::Null => None,
    }
}

pub fn is_known_unsupported(format: &str) -> bool {
    contains_ignore_case(KNOWN_UNSUPPORTED_FORMATS, format)
}

/// Whether `{type: kind, format}` is flagged as an inconsistent pair
pub fn is_inconsistent_pair(kind: JsonType, format: &str) -> bool {
    match valid_formats_for(kind) {
        Some(valid) => !contains_ignore_case(valid, format) && !is_known_unsupported(format),
        None => false,
    }
}

fn contains_ignore_case(table: &[&str], format: &str) -> bool {
    let format = format.trim();
    table.iter().any(|f| f.eq_ignore_ascii_case(format))
}

pub(super) fn inconsistent_type_format_pair(
    ctx: &RuleContext<'_>,
    unit: &SchemaUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    let base = unit.location();
    for (pointer, schema_ref) in inline_subtree(ctx.document, unit.schema) {
        let schema = ctx.resolve(schema_ref)?;
        let (Some(format), Some(kind)) = (schema.format.as_deref(), schema.types.single_kind())
        else {
            continue;
        };
        if is_inconsistent_pair(kind, format) {
            out.push(Diagnostic::warning(
                SchemaRule::InconsistentTypeFormatPair,
                format!("{}{}", base, pointer),
                format!(
                    "The format {} is not supported for type {}; the string type will be used instead.",
                    format, kind
                ),
            ));
        }
    }
    Ok(())
}

pub(super) fn known_and_not_supported(
    ctx: &RuleContext<'_>,
    unit: &SchemaUnit<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    let base = unit.location();
    for (pointer, schema_ref) in inline_subtree(ctx.document, unit.schema) {
        let schema = ctx.resolve(schema_ref)?;
        let Some(format) = schema.format.as_deref() else {
            continue;
        };
        if is_known_unsupported(format) {
            out.push(Diagnostic::warning(
                SchemaRule::KnownAndNotSupportedFormats,
                format!("{}{}", base, pointer),
                format!(
                    "The format {} has no dedicated type; the string type will be used instead.",
                    format
                ),
            ));
        }
    }
    Ok(())
}
