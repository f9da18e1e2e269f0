//! Lexical style pass
//!
//! A per-line scan over the token stream for the conventions the dialect is
//! written in: keywords in capitals, identifiers in mixed case, and the ←
//! arrow for assignment. Findings are advisory and never stop a run.

use crate::error::Diagnostic;
use crate::lexer::{Token, TokenType};

/// Scan the token stream for style findings
pub fn check_style(tokens: &[Token]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut at_line_start = true;

    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenType::Newline => {
                at_line_start = true;
                continue;
            }
            TokenType::Comment => continue,
            TokenType::Keyword(keyword) => {
                let canonical = keyword.as_str();
                if token.text != canonical {
                    diagnostics.push(Diagnostic::style(
                        token.line,
                        format!("keyword '{}' should be written {}", token.text, canonical),
                    ));
                }
            }
            TokenType::Identifier => {
                if reads_like_a_keyword(&token.text) {
                    diagnostics.push(Diagnostic::style(
                        token.line,
                        format!(
                            "'{}' is written like a keyword; identifiers are usually mixed case",
                            token.text
                        ),
                    ));
                }
                if at_line_start {
                    if let Some(diagnostic) = wrong_assignment_operator(tokens, i) {
                        diagnostics.push(diagnostic);
                    }
                }
            }
            _ => {}
        }
        at_line_start = false;
    }

    diagnostics
}

/// Multi-letter identifiers in full capitals look like keywords
fn reads_like_a_keyword(text: &str) -> bool {
    text.len() > 1 && text.chars().all(|c| c.is_ascii_uppercase())
}

/// Detect `=` or `:=` where a statement line assigns to a target. The target
/// may be a plain name or carry index and field accesses, so the scan walks
/// the chain before looking at the operator.
fn wrong_assignment_operator(tokens: &[Token], start: usize) -> Option<Diagnostic> {
    let mut depth = 0usize;
    for token in &tokens[start + 1..] {
        match &token.kind {
            TokenType::Newline | TokenType::Eof => return None,
            TokenType::LeftBracket => depth += 1,
            TokenType::RightBracket => depth = depth.saturating_sub(1),
            TokenType::Equal | TokenType::ColonAssign if depth == 0 => {
                return Some(Diagnostic::style(
                    token.line,
                    format!("assignment uses ←, not '{}'", token.text),
                ));
            }
            TokenType::Dot | TokenType::Identifier => {}
            _ if depth == 0 => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn findings(source: &str) -> Vec<String> {
        check_style(&tokenize(source))
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    #[test]
    fn test_clean_source_has_no_findings() {
        assert!(findings("DECLARE Total : INTEGER\nTotal ← Total + 1").is_empty());
    }

    #[test]
    fn test_lowercase_keyword_is_flagged() {
        let found = findings("declare x : INTEGER");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("'declare' should be written DECLARE"));
    }

    #[test]
    fn test_mixed_case_keyword_is_flagged() {
        let found = findings("Output 3");
        assert!(found[0].contains("'Output' should be written OUTPUT"));
    }

    #[test]
    fn test_all_caps_identifier_is_flagged() {
        let found = findings("DECLARE TOTAL : INTEGER");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("'TOTAL'"));
    }

    #[test]
    fn test_short_and_numbered_names_are_not_flagged() {
        assert!(findings("DECLARE X : INTEGER\nDECLARE X2 : INTEGER").is_empty());
    }

    #[test]
    fn test_equals_assignment_is_flagged() {
        let found = findings("x = 5");
        assert_eq!(found, vec!["assignment uses ←, not '='".to_string()]);
    }

    #[test]
    fn test_colon_equals_assignment_is_flagged() {
        let found = findings("Marks[2] := 7");
        assert_eq!(found, vec!["assignment uses ←, not ':='".to_string()]);
    }

    #[test]
    fn test_comparisons_are_not_flagged() {
        assert!(findings("IF x = 5\n  THEN\n    OUTPUT x\nENDIF").is_empty());
        assert!(findings("CONSTANT Max = 10").is_empty());
    }

    #[test]
    fn test_case_label_is_not_an_assignment() {
        assert!(findings("CASE OF x\n  y : OUTPUT 1\nENDCASE").is_empty());
    }
}
