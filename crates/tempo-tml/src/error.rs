//! Diagnostics for the semantic analysis.
//!
//! # Design
//!
//! - `Diagnostic` — a single message anchored at a source span
//! - `Severity` — error or warning; errors block acceptance of the system,
//!   warnings are advisory
//! - `DiagnosticFormatter` — renders diagnostics with source snippets
//!
//! Messages starting with `$` are stable identifiers: downstream tooling
//! matches on them literally (e.g. for localization), so they are emitted
//! verbatim and never reworded.

use crate::foundation::{SourceMap, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single diagnostic: position, message, severity and the pass that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Span,
    pub message: String,
    /// Producing pass, e.g. `(typechecking)`.
    #[serde(skip_deserializing, default = "default_category")]
    pub category: &'static str,
}

fn default_category() -> &'static str {
    "(typechecking)"
}

impl Diagnostic {
    pub fn error(span: Span, message: impl Into<String>, category: &'static str) -> Self {
        Self {
            severity: Severity::Error,
            span,
            message: message.into(),
            category,
        }
    }

    pub fn warning(span: Span, message: impl Into<String>, category: &'static str) -> Self {
        Self {
            severity: Severity::Warning,
            span,
            message: message.into(),
            category,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Renders diagnostics as `path:line:col: severity: message` headers with
/// the offending source line and a caret marker underneath.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    pub fn format(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();
        if self.sources.file_count() > diag.span.file_id as usize {
            let (line, col) = self.sources.line_col(&diag.span);
            out.push_str(&format!(
                "{}:{}:{}: {}: {} {}\n",
                self.sources.file_path(&diag.span).display(),
                line,
                col,
                diag.severity,
                diag.message,
                diag.category,
            ));
            if let Some(text) = self.sources.line_text(&diag.span) {
                out.push_str(&format!("  {}\n", text));
                let width = (diag.span.end.saturating_sub(diag.span.start)).max(1) as usize;
                out.push_str(&format!("  {}{}\n", " ".repeat((col - 1) as usize), "^".repeat(width.min(text.len().max(1)))));
            }
        } else {
            out.push_str(&format!(
                "{}: {} {}\n",
                diag.severity, diag.message, diag.category
            ));
        }
        out
    }

    pub fn format_all(&self, diags: &[Diagnostic]) -> String {
        diags.iter().map(|d| self.format(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_with_snippet() {
        let mut sources = SourceMap::new();
        let id = sources.add_file(PathBuf::from("net.tml"), "clock x;\nbadline;\n".into());
        let diag = Diagnostic::error(Span::new(id, 9, 16, 2), "$Type_error", "(typechecking)");
        let rendered = DiagnosticFormatter::new(&sources).format(&diag);
        assert!(rendered.contains("net.tml:2:1: error: $Type_error (typechecking)"));
        assert!(rendered.contains("badline;"));
        assert!(rendered.contains("^^^^^^^"));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
    }
}
