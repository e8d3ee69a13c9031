//! Diagnostics conversion from compiler-service results to LSP diagnostics.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};

use super::types::ServiceDiagnostic;
use crate::document::LineIndex;

/// Value of `Diagnostic::source` for everything reported here.
pub const DIAGNOSTIC_SOURCE: &str = "vuels";

fn to_diagnostic(diagnostic: &ServiceDiagnostic, line_index: &LineIndex) -> Diagnostic {
    let span = diagnostic.span.map_or(0..0, |s| s.range());
    Diagnostic {
        range: line_index.span_to_range(span),
        severity: Some(DiagnosticSeverity::ERROR),
        code: Some(NumberOrString::Number(diagnostic.code as i32)),
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: diagnostic.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Convert syntactic then semantic diagnostics, in that order.
pub fn to_diagnostics(
    syntactic: &[ServiceDiagnostic],
    semantic: &[ServiceDiagnostic],
    line_index: &LineIndex,
) -> Vec<Diagnostic> {
    syntactic
        .iter()
        .chain(semantic)
        .map(|d| to_diagnostic(d, line_index))
        .collect()
}
