//! Collected analysis diagnostics.
//!
//! The analysis never aborts on the first problem: diagnostics are pushed
//! into a [`DiagnosticSink`] and the offending node is treated as opaque, so
//! one run surfaces as many problems as possible. Two kinds are fatal and
//! stop the driver at the next phase boundary: unsupported constructs and the
//! outer-iteration cap. The rest are batched and reported together.

use crate::span::Span;
use serde::Serialize;

/// What went wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Syntax feature outside the analyzable subset.
    UnsupportedConstruct,
    /// A reachable node still has an empty type set after the fixed point.
    InferenceFailure,
    /// A node holds types that cannot be unified into a single target type.
    TypeConflict,
    /// A method call whose receiver classes disagree about the callee.
    DispatchAmbiguity,
    /// The driver hit its outer-iteration cap without converging.
    IterationCapExceeded,
}

impl DiagnosticKind {
    /// Fatal kinds stop the driver at the next phase boundary.
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            DiagnosticKind::UnsupportedConstruct | DiagnosticKind::IterationCapExceeded
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// A single reported problem, pointing back at a program point.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Name of the module the span belongs to.
    pub module: String,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn error(
        kind: DiagnosticKind,
        module: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            module: module.into(),
            span,
            message: message.into(),
        }
    }

    pub fn warning(
        kind: DiagnosticKind,
        module: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Warning,
            module: module.into(),
            span,
            message: message.into(),
        }
    }
}

/// Accumulates diagnostics for one analysis run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    fatal: bool,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind.is_fatal() {
            self.fatal = true;
        }
        // Deduplicate exact repeats: the same unsupported feature is reported
        // once per distinct occurrence, not once per propagation round.
        if self.diagnostics.contains(&diagnostic) {
            return;
        }
        self.diagnostics.push(diagnostic);
    }

    /// True if a fatal diagnostic has been reported.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Consume the sink, yielding the diagnostics ordered by module and span.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by(|a, b| (&a.module, a.span.start).cmp(&(&b.module, b.span.start)));
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds_mark_the_sink() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::error(
            DiagnosticKind::TypeConflict,
            "main",
            Span::new(0, 1),
            "conflicting element types",
        ));
        assert!(!sink.is_fatal());
        assert!(sink.has_errors());

        sink.push(Diagnostic::error(
            DiagnosticKind::UnsupportedConstruct,
            "main",
            Span::new(2, 3),
            "eval is not supported",
        ));
        assert!(sink.is_fatal());
    }

    #[test]
    fn exact_repeats_are_deduplicated() {
        let mut sink = DiagnosticSink::new();
        let d = Diagnostic::error(
            DiagnosticKind::InferenceFailure,
            "main",
            Span::new(5, 9),
            "cannot infer type",
        );
        sink.push(d.clone());
        sink.push(d);
        assert_eq!(sink.len(), 1);
    }
}
