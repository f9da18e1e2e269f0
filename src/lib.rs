//! # Pseudocode Interpreter
//!
//! An interpreter for the pseudocode dialect used in Cambridge
//! International AS & A Level Computer Science courses. Programs are
//! plain text; running one yields its OUTPUT lines plus every
//! diagnostic found along the way, so a student sees style and
//! structure advice next to their program's behaviour.
//!
//! ## Architecture
//!
//! The interpreter is organized into several modules:
//! - `lexer`: Tokenization of source text into keywords, literals and
//!   operators such as the `←` assignment arrow
//! - `parser`: Recursive descent into an AST, recovering per statement
//!   so one mistake does not hide the rest
//! - `validator`: Structure and style checks that advise but never
//!   block a run
//! - `runtime`: Values, scopes, files, built-ins and the tree-walking
//!   interpreter
//! - `error`: Syntax and runtime error types plus renderable
//!   diagnostics

pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod validator;

// Re-export commonly used types
pub use error::{Diagnostic, DiagnosticKind, RuntimeError, SyntaxError};
pub use lexer::{tokenize, Token, TokenType};
pub use parser::{parse, Program};
pub use runtime::{Interpreter, Value};
pub use validator::validate;

/// Version of the interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a run produced: the OUTPUT lines and the combined
/// syntax, structure, style and runtime findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub output: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    /// Whether the program executed. Syntax errors prevent execution;
    /// structure and style findings do not.
    pub fn executed(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.kind.blocks_execution())
    }
}

/// Run a pseudocode program from source
///
/// This is the main entry point. INPUT statements pull one line at a
/// time from `input`. Output produced before a runtime error is kept,
/// so partial results stay visible next to the diagnostic that stopped
/// the run.
pub fn run(source: &str, input: impl FnMut() -> String) -> RunReport {
    // Phase 1: Lexical Analysis
    let tokens = lexer::tokenize(source);

    // Phase 2: Parsing, with recovery
    let (program, syntax_errors) = parser::parse(tokens.clone());

    // Phase 3: Structure and Style Checks
    let mut diagnostics = validator::validate(&tokens, &syntax_errors);

    // Phase 4: Execution, skipped while any syntax error stands
    if diagnostics.iter().any(|d| d.kind.blocks_execution()) {
        return RunReport {
            output: Vec::new(),
            diagnostics,
        };
    }
    let mut interpreter = Interpreter::new().with_input(input);
    if let Err(err) = interpreter.interpret(&program) {
        diagnostics.push(Diagnostic::runtime(err.line(), err.message()));
    }
    RunReport {
        output: interpreter.into_output(),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_input() -> String {
        String::new()
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_run_captures_output() {
        let report = run("DECLARE x : INTEGER\nx ← 5\nOUTPUT x", no_input);
        assert_eq!(report.output, vec!["5".to_string()]);
        assert_eq!(report.diagnostics, vec![]);
        assert!(report.executed());
    }

    #[test]
    fn test_syntax_errors_prevent_execution() {
        let report = run("OUTPUT 1\nDECLARE : INTEGER", no_input);
        assert!(!report.executed());
        assert!(report.output.is_empty());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Syntax));
    }

    #[test]
    fn test_style_findings_do_not_prevent_execution() {
        let report = run("output 5", no_input);
        assert_eq!(report.output, vec!["5".to_string()]);
        assert!(report.executed());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Style));
    }

    #[test]
    fn test_runtime_errors_keep_partial_output() {
        let report = run("OUTPUT \"before\"\nOUTPUT 1 / 0", no_input);
        assert_eq!(report.output, vec!["before".to_string()]);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::runtime(2, "division by zero")]
        );
    }

    #[test]
    fn test_run_feeds_input_lines_in_order() {
        let mut lines = vec!["20".to_string(), "22".to_string()].into_iter();
        let report = run(
            "DECLARE a : INTEGER\nDECLARE b : INTEGER\nINPUT a\nINPUT b\nOUTPUT a + b",
            move || lines.next().unwrap_or_default(),
        );
        assert_eq!(report.output, vec!["42".to_string()]);
    }

    #[test]
    fn test_parse_recovery_reports_later_errors_too() {
        let source = "DECLARE : INTEGER\nOUTPUT ,\nOUTPUT 1";
        let report = run(source, no_input);
        let syntax = report
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Syntax)
            .count();
        assert!(syntax >= 2, "diagnostics: {:?}", report.diagnostics);
    }
}
