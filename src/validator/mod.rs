//! Validator module
//!
//! Two advisory passes over the token stream, style and structure, merged
//! with the parser's syntax errors into one line-ordered diagnostic list.
//! Only syntax errors block execution; everything else is a note for the
//! programmer.

pub mod structure;
pub mod style;

pub use structure::check_structure;
pub use style::check_style;

use crate::error::{Diagnostic, SyntaxError};
use crate::lexer::Token;

/// Combine syntax, structure and style findings, ordered by line. Findings
/// on the same line keep that order.
pub fn validate(tokens: &[Token], syntax_errors: &[SyntaxError]) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = syntax_errors
        .iter()
        .map(|err| Diagnostic::syntax(err.line, err.message.clone()))
        .collect();
    diagnostics.extend(check_structure(tokens));
    diagnostics.extend(check_style(tokens));
    diagnostics.sort_by_key(|d| d.line);
    diagnostics
}
