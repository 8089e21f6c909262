//! Server entry checks

use std::collections::HashSet;

use super::{DocumentRule, RuleContext, RuleResult};
use crate::diagnostics::Diagnostic;

const SERVERS_POINTER: &str = "#/servers";

pub(super) fn no_server_entry(ctx: &RuleContext<'_>, out: &mut Vec<Diagnostic>) -> RuleResult {
    if ctx.document.servers.iter().all(|s| s.url.trim().is_empty()) {
        out.push(Diagnostic::warning(
            DocumentRule::NoServerEntry,
            SERVERS_POINTER,
            "A servers entry was not present in the description. \
             The root URL will need to be set manually on the request adapter.",
        ));
    }
    Ok(())
}

pub(super) fn multiple_server_entries(
    ctx: &RuleContext<'_>,
    out: &mut Vec<Diagnostic>,
) -> RuleResult {
    let distinct: HashSet<String> = ctx
        .document
        .servers
        .iter()
        .map(|s| s.url.trim().trim_end_matches('/').to_lowercase())
        .filter(|url| !url.is_empty())
        .collect();

    if distinct.len() > 1 {
        out.push(Diagnostic::warning(
            DocumentRule::MultipleServerEntries,
            SERVERS_POINTER,
            format!(
                "{} distinct servers entries were found in the description. \
                 Only the first one will be used; set the root URL manually on the request adapter to target another.",
                distinct.len()
            ),
        ));
    }
    Ok(())
}
