//! # Diagnostics Module
//!
//! Class-level problems found while generating models. Generation does not
//! stop on them: the offending class (or field) is skipped or degraded, a
//! [`Diagnostic`] is recorded, and every diagnostic of the run is returned
//! together with the generated files.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let output = generate(&graph, &config)?;
//! for d in output.diagnostics.iter() {
//!     eprintln!("[{}] {}: {}", d.severity, d.location, d.message);
//! }
//! ```

use std::fmt;
use tracing::{info, warn};

use crate::error::GenerationError;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A class was skipped because it could not be generated
    Error,
    /// Output was degraded (untyped field, dropped value, missing parent)
    Warning,
    /// Informational (skip pattern matched, duplicate merged)
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A problem found while generating one class or field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where the problem occurred (`module:{ns}Class` or `module:{ns}Class.field`)
    pub location: String,
    pub severity: Severity,
    /// Kind of problem (e.g. "unsupported_type", "untyped_reference")
    pub kind: String,
    pub message: String,
    /// Optional hint for fixing the schema or configuration
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(
        location: impl Into<String>,
        severity: Severity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            location: location.into(),
            severity,
            kind: kind.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion for fixing the problem
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Diagnostic for a class-scoped error that caused the class to be skipped.
    pub fn from_error(location: impl Into<String>, err: &GenerationError) -> Self {
        Diagnostic::new(location, Severity::Error, err.kind(), err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.severity, self.kind, self.location, self.message
        )?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (suggestion: {suggestion})")?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics for one generation run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Emit every diagnostic as a tracing event.
    pub fn log_all(&self) {
        for d in &self.items {
            match d.severity {
                Severity::Info => info!(location = %d.location, kind = %d.kind, "{}", d.message),
                Severity::Warning | Severity::Error => warn!(
                    location = %d.location,
                    kind = %d.kind,
                    severity = %d.severity,
                    "{}",
                    d.message
                ),
            }
        }
    }

    pub fn warn(
        &mut self,
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(location, Severity::Warning, kind, message));
    }

    pub fn info(
        &mut self,
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(location, Severity::Info, kind, message));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Diagnostics of the given kind.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    /// Human-readable report grouped by severity.
    pub fn report(&self) -> String {
        if self.items.is_empty() {
            return "No diagnostics.\n".to_string();
        }
        let count = |s: Severity| self.items.iter().filter(|d| d.severity == s).count();
        let mut out = format!(
            "{} error(s), {} warning(s), {} info(s)\n",
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info)
        );
        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            for d in self.items.iter().filter(|d| d.severity == severity) {
                out.push_str(&format!("  {d}\n"));
            }
        }
        out
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_groups_by_severity() {
        let mut diags = Diagnostics::new();
        diags.info("m:A", "class_skipped", "skipped by pattern");
        diags.push(
            Diagnostic::new("m:B", Severity::Error, "unsupported_type", "anyType")
                .with_suggestion("map the element to a simple type"),
        );
        diags.warn("m:C.x", "untyped_reference", "missing class");

        assert_eq!(diags.len(), 3);
        assert!(diags.has_errors());
        let report = diags.report();
        assert!(report.starts_with("1 error(s), 1 warning(s), 1 info(s)"));
        let err_pos = report.find("unsupported_type").unwrap();
        let info_pos = report.find("class_skipped").unwrap();
        assert!(err_pos < info_pos);
        assert!(report.contains("suggestion: map the element"));
    }

    #[test]
    fn test_of_kind() {
        let mut diags = Diagnostics::new();
        diags.warn("a", "x", "1");
        diags.warn("b", "y", "2");
        diags.warn("c", "x", "3");
        assert_eq!(diags.of_kind("x").count(), 2);
    }
}
