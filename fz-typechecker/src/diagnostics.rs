// Fz Typechecker Diagnostics
// Severity levels and the session-wide error collection

use crate::error::TypecheckError;
use std::fmt;

/// Severity level for diagnostic messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    /// Recoverable: the offending node degrades to ERROR
    Error,
    /// Resolution must stop immediately
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Diagnostic collector shared by all resolution phases.
///
/// At most `max_errors` diagnostics are stored, but the error counter keeps
/// counting past that limit so later stages can still tell that errors
/// occurred.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    diagnostics: Vec<TypecheckError>,
    max_errors: usize,
    errors: usize,
}

impl Diagnostics {
    pub fn new(max_errors: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            max_errors,
            errors: 0,
        }
    }

    /// Record a diagnostic. Exact duplicates (same message at the same
    /// position) are dropped so a root cause is reported once.
    pub fn add_diagnostic(&mut self, diagnostic: TypecheckError) {
        if self.diagnostics.contains(&diagnostic) {
            return;
        }
        if diagnostic.severity() >= Severity::Error {
            self.errors += 1;
        }
        if self.diagnostics.len() < self.max_errors {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Number of errors reported, including the ones beyond `max_errors`
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn has_fatal_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity() == Severity::Fatal)
    }

    pub fn diagnostics(&self) -> &[TypecheckError] {
        &self.diagnostics
    }

    pub fn total_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn max_errors(&self) -> usize {
        self.max_errors
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.errors = 0;
    }

    /// Sort diagnostics by span location; diagnostics without a position go last
    pub fn sort_by_location(&mut self) {
        self.diagnostics
            .sort_by_key(|d| d.span().map_or(usize::MAX, |s| s.offset()));
    }

    /// Create miette reports for all diagnostics against the given source text
    pub fn create_reports(&self, filename: &str, source: &str) -> Vec<miette::Report> {
        use miette::NamedSource;

        let source_name = if filename.ends_with(".fz") {
            filename.to_string()
        } else {
            format!("{filename}.fz")
        };
        let named_source = NamedSource::new(source_name, source.to_string());

        self.diagnostics
            .iter()
            .map(|diagnostic| {
                miette::Report::new(diagnostic.clone()).with_source_code(named_source.clone())
            })
            .collect()
    }

    pub fn summary(&self) -> DiagnosticSummary {
        DiagnosticSummary {
            reported: self.total_count(),
            errors: self.error_count(),
            suppressed: self.errors.saturating_sub(self.total_count()),
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Summary of diagnostic counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticSummary {
    pub reported: usize,
    pub errors: usize,
    /// Errors counted but not stored because `max_errors` was reached
    pub suppressed: usize,
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors == 0 {
            write!(f, "No errors")
        } else if self.suppressed == 0 {
            write!(f, "{} errors", self.errors)
        } else {
            write!(
                f,
                "{} errors ({} not shown)",
                self.errors, self.suppressed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::SourceSpan;
    use pretty_assertions::assert_eq;

    fn unresolved(name: &str, offset: usize) -> TypecheckError {
        TypecheckError::UnresolvedName {
            name: name.to_string(),
            what: "feature".to_string(),
            span: SourceSpan::new(offset.into(), 1),
        }
    }

    #[test]
    fn test_counter_continues_past_limit() {
        let mut diagnostics = Diagnostics::new(2);
        diagnostics.add_diagnostic(unresolved("a", 1));
        diagnostics.add_diagnostic(unresolved("b", 2));
        diagnostics.add_diagnostic(unresolved("c", 3));

        assert_eq!(diagnostics.total_count(), 2);
        assert_eq!(diagnostics.error_count(), 3);
        assert_eq!(diagnostics.summary().to_string(), "3 errors (1 not shown)");
    }

    #[test]
    fn test_duplicates_are_reported_once() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.add_diagnostic(unresolved("a", 1));
        diagnostics.add_diagnostic(unresolved("a", 1));

        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn test_sort_by_location() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.add_diagnostic(TypecheckError::fatal("out of identifiers"));
        diagnostics.add_diagnostic(unresolved("late", 40));
        diagnostics.add_diagnostic(unresolved("early", 4));
        diagnostics.sort_by_location();

        let offsets: Vec<Option<usize>> = diagnostics
            .diagnostics()
            .iter()
            .map(|d| d.span().map(|s| s.offset()))
            .collect();
        assert_eq!(offsets, vec![Some(4), Some(40), None]);
        assert!(diagnostics.has_fatal_errors());
    }
}
