//! Diagnostic taxonomy and sink (§7 Error handling design).
//!
//! Every recoverable failure in the core is reported through a
//! [`DiagnosticSink`] rather than by panicking or raising an exception (§9:
//! "Preserve that model; do not introduce exceptions"). Fatal conditions
//! (arena exhaustion, evaluator halt) are the only ones that stop a pass.

use std::fmt;
use thiserror::Error;

/// Byte offset into a file's source buffer.
pub type BytePos = u32;

/// The `{begin, pivot, end}` token-span every expression and diagnostic
/// anchors to (§3 Expression: `src_tokens`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SrcTokens {
    pub file_id: u32,
    pub begin: BytePos,
    pub pivot: BytePos,
    pub end: BytePos,
}

impl SrcTokens {
    #[must_use]
    pub fn new(file_id: u32, begin: BytePos, pivot: BytePos, end: BytePos) -> Self {
        SrcTokens { file_id, begin, pivot, end }
    }

    /// A span with no meaningful pivot (begin and end coincide with it).
    #[must_use]
    pub fn point(file_id: u32, pos: BytePos) -> Self {
        SrcTokens { file_id, begin: pos, pivot: pos, end: pos }
    }
}

/// A single note attached to a diagnostic (e.g. one link in a circular
/// dependency chain, or one unfolded sub-expression in a consteval failure).
#[derive(Clone, Debug)]
pub struct Note {
    pub src_tokens: SrcTokens,
    pub message: String,
}

impl Note {
    #[must_use]
    pub fn new(src_tokens: SrcTokens, message: impl Into<String>) -> Self {
        Note { src_tokens, message: message.into() }
    }
}

/// A suggested fix, rendered by the driver; the core never applies these.
#[derive(Clone, Debug)]
pub struct Suggestion {
    pub src_tokens: SrcTokens,
    pub replacement: String,
    pub message: String,
}

/// Severity of a diagnostic. Only `Warning` is subject to paren-level
/// suppression (§7); everything else is always surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// The taxonomy of failure kinds from §7, one variant per diagnostic
/// channel. Each carries the fields needed to render the exact messages in
/// §8's concrete scenarios.
#[derive(Error, Debug, Clone)]
pub enum DiagnosticKind {
    #[error("{reason}")]
    LexError { reason: String },

    #[error("{reason}")]
    ParseError { reason: String },

    #[error("identifier '{name}' was not declared in this scope")]
    UnresolvedName { name: String },

    #[error("identifier '{name}' is ambiguous")]
    AmbiguousName { name: String, candidates: Vec<String> },

    #[error("'{found}' cannot be used as a value of type '{expected}'")]
    TypeMismatch { expected: String, found: String },

    #[error("no matching overload for call to '{name}'")]
    OverloadResolutionFailure { name: String, candidates: Vec<String> },

    #[error("circular dependency detected")]
    CircularDependency { chain: Vec<String> },

    #[error("{reason}")]
    ConstevalFailure { reason: String },

    #[error("unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("{reason}")]
    AttributeError { reason: String },

    #[error(
        "static assertion failed due to requirement '{condition}', message: '{message}'"
    )]
    StaticAssertFailure { condition: String, message: String },

    #[error("{reason}")]
    Fatal { reason: String },
}

impl DiagnosticKind {
    /// Default severity for a diagnostic kind absent an override.
    #[must_use]
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticKind::UnknownAttribute { .. } => Severity::Warning,
            DiagnosticKind::Fatal { .. } => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

/// A fully formed diagnostic: the `{kind, primary_src_tokens, message,
/// notes[], suggestions[]}` contract from §6.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub primary_src_tokens: SrcTokens,
    pub message: String,
    pub notes: Vec<Note>,
    pub suggestions: Vec<Suggestion>,
    /// How many parenthesis-levels deep this warning was raised at, used by
    /// the paren-level suppression rule (§7). `0` for non-warnings.
    pub paren_level: u32,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, primary_src_tokens: SrcTokens) -> Self {
        let severity = kind.default_severity();
        let message = kind.to_string();
        Diagnostic {
            kind,
            severity,
            primary_src_tokens,
            message,
            notes: Vec::new(),
            suggestions: Vec::new(),
            paren_level: 0,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }

    #[must_use]
    pub fn with_paren_level(mut self, paren_level: u32) -> Self {
        self.paren_level = paren_level;
        self
    }

    /// The paren-level suppression threshold (§7): a warning raised while
    /// nested two or more parenthesis levels deep is silenced. This is the
    /// *only* mechanism by which the core silences a diagnostic.
    pub const SUPPRESSION_THRESHOLD: u32 = 2;

    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.severity == Severity::Warning && self.paren_level >= Self::SUPPRESSION_THRESHOLD
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.severity, self.message)
    }
}

/// Per-context diagnostic buffer (§5: "Diagnostics are collected in a
/// per-context buffer and flushed at checkpoint boundaries"). Always passed
/// explicitly (§9: no global singleton), never stored in a `static`.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    halted: bool,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new() -> Self {
        DiagnosticSink::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_suppressed() {
            log::trace!("suppressed warning at paren_level {}: {}", diagnostic.paren_level, diagnostic.message);
            return;
        }
        if diagnostic.severity == Severity::Fatal {
            log::error!("fatal: {}", diagnostic.message);
            self.halted = true;
        } else {
            log::debug!("{}: {}", format!("{:?}", diagnostic.severity).to_lowercase(), diagnostic.message);
        }
        self.diagnostics.push(diagnostic);
    }

    /// §5 Cancellation: a single `halt` flag short-circuits further work.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity != Severity::Warning)
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st() -> SrcTokens {
        SrcTokens::point(0, 0)
    }

    #[test]
    fn warning_suppressed_at_paren_level_two() {
        let mut sink = DiagnosticSink::new();
        let d = Diagnostic::new(
            DiagnosticKind::ConstevalFailure { reason: "shift too big".into() },
            st(),
        )
        .with_paren_level(2);
        assert_eq!(d.severity, Severity::Error);
        // force Warning for the suppression test
        let mut d = d;
        d.severity = Severity::Warning;
        sink.report(d);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn warning_not_suppressed_below_threshold() {
        let mut sink = DiagnosticSink::new();
        let mut d = Diagnostic::new(
            DiagnosticKind::ConstevalFailure { reason: "shift too big".into() },
            st(),
        )
        .with_paren_level(1);
        d.severity = Severity::Warning;
        sink.report(d);
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn static_assert_message_matches_contract() {
        let kind = DiagnosticKind::StaticAssertFailure {
            condition: "1 + 1 == 3".into(),
            message: "math is broken".into(),
        };
        assert_eq!(
            kind.to_string(),
            "static assertion failed due to requirement '1 + 1 == 3', message: 'math is broken'"
        );
    }
}
