//! Diagnostics
//!
//! Findings produced by rule bodies. A [`Diagnostic`] is created once and never mutated;
//! workers append them to a shared [`DiagnosticSink`], which turns into an unordered
//! [`Diagnostics`] collection at the end of the pass.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::RuleKind;

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// What kind of generation problem a diagnostic describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Success responses disagree on their schema
    StructuralAmbiguity,
    /// Union of objects with no way to pick the concrete type
    PolymorphismWithoutDiscriminator,
    /// Composition redefines a property with another shape
    InheritancePropertyConflict,
    /// Format not valid for its declared type
    UnsupportedFormat,
    /// Recognized format with no dedicated generated type
    UnsupportedKnownFormat,
    /// Servers, bodies and content types
    DocumentShapeIssue,
    /// A rule body failed on one unit
    RuleFailure,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule that produced this diagnostic
    pub rule: RuleKind,
    pub severity: Severity,
    pub category: Category,
    /// Human-readable message
    pub message: String,
    /// JSON pointer into the description
    pub location: String,
}

impl Diagnostic {
    pub fn warning(
        rule: impl Into<RuleKind>,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let rule = rule.into();
        Self {
            rule,
            severity: Severity::Warning,
            category: rule.category(),
            message: message.into(),
            location: location.into(),
        }
    }

    /// A rule body returned an error or panicked on one unit
    pub fn rule_failure(
        rule: impl Into<RuleKind>,
        location: impl Into<String>,
        cause: impl fmt::Display,
    ) -> Self {
        let rule = rule.into();
        Self {
            rule,
            severity: Severity::Error,
            category: Category::RuleFailure,
            message: format!("rule {} failed and was skipped for this unit: {}", rule, cause),
            location: location.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.category == Category::RuleFailure
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.location, self.message)
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Unordered result of one validation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Diagnostic) {
        self.items.push(item);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Diagnostics produced by one rule
    pub fn for_rule(&self, rule: impl Into<RuleKind>) -> impl Iterator<Item = &Diagnostic> {
        let rule = rule.into();
        self.items.iter().filter(move |i| i.rule == rule)
    }

    pub fn count_for(&self, rule: impl Into<RuleKind>) -> usize {
        self.for_rule(rule).count()
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Stable presentation order: location, then rule, then message
    pub fn sorted(&self) -> Vec<&Diagnostic> {
        let mut items: Vec<&Diagnostic> = self.items.iter().collect();
        items.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.rule.name().cmp(b.rule.name()))
                .then_with(|| a.message.cmp(&b.message))
        });
        items
    }

    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in self.sorted() {
            output.push_str(&format!("{}\n", item));
        }

        if self.has_errors() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s)\n",
                self.error_count(),
                self.warning_count()
            ));
        } else if !self.is_empty() {
            output.push_str(&format!("\n{} warning(s)\n", self.warning_count()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// =============================================================================
// Sink
// =============================================================================

/// Append-only collector shared by all workers of a pass
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: Diagnostic) {
        self.items.lock().push(item);
    }

    /// Append a batch under a single lock acquisition
    pub fn extend(&self, items: impl IntoIterator<Item = Diagnostic>) {
        self.items.lock().extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        Diagnostics {
            items: self.items.into_inner(),
        }
    }
}
