use crate::error::{CompileError, Diagnostic, Severity};
use itertools::Itertools;

/// Formats compile diagnostics into human-readable reports.
pub struct DiagnosticFormatter;

impl DiagnosticFormatter {
    /// One header line for the flow, then every diagnostic, errors first.
    pub fn format_error(error: &CompileError) -> String {
        Self::format_diagnostics(&error.flow, &error.diagnostics)
    }

    pub fn format_diagnostics(flow: &str, diagnostics: &[Diagnostic]) -> String {
        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let warnings = diagnostics.len() - errors;
        let mut report = format!(
            "flow '{}': {} error(s), {} warning(s)\n",
            flow, errors, warnings
        );
        for diagnostic in diagnostics.iter().sorted_by_key(|d| d.severity) {
            report.push_str("  ");
            report.push_str(&diagnostic.to_string());
            report.push('\n');
        }
        report
    }

    /// A single-line summary, e.g. `2 error(s): MissingDefaultBranch, IllegalCycle`.
    pub fn summarize(diagnostics: &[Diagnostic]) -> String {
        let codes = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.code())
            .unique()
            .join(", ");
        let count = diagnostics.iter().filter(|d| d.is_error()).count();
        if count == 0 {
            "no errors".to_string()
        } else {
            format!("{} error(s): {}", count, codes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    #[test]
    fn errors_are_listed_before_warnings() {
        let diagnostics = vec![
            Diagnostic::warning(DiagnosticKind::UnreachableNode, "dead").with_node("node-4"),
            Diagnostic::error(DiagnosticKind::MissingDefaultBranch, "no default").with_node("node-2"),
        ];
        let report = DiagnosticFormatter::format_diagnostics("Menu", &diagnostics);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "flow 'Menu': 1 error(s), 1 warning(s)");
        assert_eq!(
            lines[1],
            "  error[MissingDefaultBranch] at 'node-2': no default"
        );
        assert_eq!(lines[2], "  warning[UnreachableNode] at 'node-4': dead");
        assert_eq!(
            DiagnosticFormatter::summarize(&diagnostics),
            "1 error(s): MissingDefaultBranch"
        );
    }
}
