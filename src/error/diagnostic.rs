//! Reportable findings with terminal rendering
//!
//! Every stage funnels into [`Diagnostic`]: syntax errors from the parser,
//! findings from the structure and style passes, and the runtime error that
//! ended a run. Holding them in one shape lets the caller sort and print a
//! single list.

use colored::Colorize;
use std::fmt;

/// Which pass produced a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Malformed source; execution is skipped while any of these exist
    Syntax,
    /// Unbalanced block keywords; advisory
    Structural,
    /// Dialect conventions not followed; advisory
    Style,
    /// The error that terminated execution
    Runtime,
}

impl DiagnosticKind {
    /// Short label used in rendered output
    pub fn label(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax error",
            Self::Structural => "structure",
            Self::Style => "style",
            Self::Runtime => "runtime error",
        }
    }

    /// Whether findings of this kind prevent the program from running.
    /// Structure and style findings never do.
    pub fn blocks_execution(&self) -> bool {
        matches!(self, Self::Syntax)
    }
}

/// A single finding tied to a source line
///
/// `line` is 1-based; line 0 is reserved for findings with no traceable
/// statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(kind: DiagnosticKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            kind,
        }
    }

    /// Create a syntax diagnostic
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Syntax, line, message)
    }

    /// Create a structural diagnostic
    pub fn structural(line: usize, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Structural, line, message)
    }

    /// Create a style diagnostic
    pub fn style(line: usize, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Style, line, message)
    }

    /// Create a runtime diagnostic
    pub fn runtime(line: usize, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Runtime, line, message)
    }

    /// Format the finding with color and the offending source line
    pub fn render(&self, source: &str) -> String {
        let mut output = String::new();

        let label = match self.kind {
            DiagnosticKind::Syntax | DiagnosticKind::Runtime => self.kind.label().red().bold(),
            DiagnosticKind::Structural | DiagnosticKind::Style => {
                self.kind.label().yellow().bold()
            }
        };
        output.push_str(&format!("{}: {}\n", label, self.message));

        // Location and source context
        if self.line > 0 {
            output.push_str(&format!("  {} line {}\n", "-->".blue().bold(), self.line));

            if let Some(text) = source.lines().nth(self.line - 1) {
                output.push_str(&format!(
                    "  {} {}\n",
                    self.line.to_string().blue().bold(),
                    text
                ));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: [{}] {}", self.line, self.kind.label(), self.message)
        } else {
            write!(f, "[{}] {}", self.kind.label(), self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_line_and_kind() {
        let diag = Diagnostic::style(3, "keyword 'declare' should be written DECLARE");
        assert_eq!(
            diag.to_string(),
            "line 3: [style] keyword 'declare' should be written DECLARE"
        );
    }

    #[test]
    fn test_line_zero_omits_location() {
        let diag = Diagnostic::structural(0, "ENDWHILE without a matching WHILE");
        assert_eq!(
            diag.to_string(),
            "[structure] ENDWHILE without a matching WHILE"
        );
    }

    #[test]
    fn test_render_shows_source_line() {
        let source = "DECLARE N : INTEGER\nN ← \"five\"\nOUTPUT N";
        let diag = Diagnostic::runtime(2, "expected INTEGER, got STRING");
        let rendered = diag.render(source);

        assert!(rendered.contains("runtime error"));
        assert!(rendered.contains("N ← \"five\""));
        assert!(rendered.contains("line 2"));
    }

    #[test]
    fn test_only_syntax_blocks_execution() {
        assert!(DiagnosticKind::Syntax.blocks_execution());
        assert!(!DiagnosticKind::Structural.blocks_execution());
        assert!(!DiagnosticKind::Style.blocks_execution());
        assert!(!DiagnosticKind::Runtime.blocks_execution());
    }
}
