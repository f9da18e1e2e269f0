//! Structural balance pass
//!
//! A whole-program scan that pairs block openers with their closing
//! keywords. Each block kind keeps its own stack, driven by the first
//! significant token of every line, so the pass works even on source the
//! parser could not fully accept. FOR blocks also record their control
//! variable to check the name written after NEXT.

use crate::error::Diagnostic;
use crate::lexer::{Keyword, Token, TokenType};

/// Scan the token stream for unbalanced blocks
pub fn check_structure(tokens: &[Token]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let mut ifs: Vec<usize> = Vec::new();
    let mut cases: Vec<usize> = Vec::new();
    let mut fors: Vec<(usize, Option<String>)> = Vec::new();
    let mut whiles: Vec<usize> = Vec::new();
    let mut repeats: Vec<usize> = Vec::new();
    let mut procedures: Vec<usize> = Vec::new();
    let mut functions: Vec<usize> = Vec::new();
    let mut types: Vec<usize> = Vec::new();

    let mut at_line_start = true;
    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenType::Newline => {
                at_line_start = true;
                continue;
            }
            TokenType::Comment => continue,
            TokenType::Keyword(keyword) if at_line_start => {
                match keyword {
                    Keyword::If => ifs.push(token.line),
                    Keyword::EndIf => {
                        close_block(&mut ifs, &mut diagnostics, token.line, "ENDIF", "IF")
                    }
                    Keyword::Case => cases.push(token.line),
                    Keyword::EndCase => {
                        close_block(&mut cases, &mut diagnostics, token.line, "ENDCASE", "CASE")
                    }
                    Keyword::For => fors.push((token.line, identifier_after(tokens, i))),
                    Keyword::Next => match fors.pop() {
                        None => diagnostics.push(Diagnostic::structural(
                            token.line,
                            "NEXT has no matching FOR",
                        )),
                        Some((for_line, for_name)) => {
                            let next_name = identifier_after(tokens, i);
                            if let (Some(opened), Some(closed)) = (for_name, next_name) {
                                if opened != closed {
                                    diagnostics.push(Diagnostic::structural(
                                        token.line,
                                        format!(
                                            "NEXT {} does not match FOR {} on line {}",
                                            closed, opened, for_line
                                        ),
                                    ));
                                }
                            }
                        }
                    },
                    Keyword::While => whiles.push(token.line),
                    Keyword::EndWhile => close_block(
                        &mut whiles,
                        &mut diagnostics,
                        token.line,
                        "ENDWHILE",
                        "WHILE",
                    ),
                    Keyword::Repeat => repeats.push(token.line),
                    Keyword::Until => {
                        close_block(&mut repeats, &mut diagnostics, token.line, "UNTIL", "REPEAT")
                    }
                    Keyword::Procedure => procedures.push(token.line),
                    Keyword::EndProcedure => close_block(
                        &mut procedures,
                        &mut diagnostics,
                        token.line,
                        "ENDPROCEDURE",
                        "PROCEDURE",
                    ),
                    Keyword::Function => functions.push(token.line),
                    Keyword::EndFunction => close_block(
                        &mut functions,
                        &mut diagnostics,
                        token.line,
                        "ENDFUNCTION",
                        "FUNCTION",
                    ),
                    Keyword::Type => types.push(token.line),
                    Keyword::EndType => {
                        close_block(&mut types, &mut diagnostics, token.line, "ENDTYPE", "TYPE")
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        at_line_start = false;
    }

    drain_open(ifs, &mut diagnostics, "IF", "ENDIF");
    drain_open(cases, &mut diagnostics, "CASE", "ENDCASE");
    drain_open(
        fors.into_iter().map(|(line, _)| line).collect(),
        &mut diagnostics,
        "FOR",
        "NEXT",
    );
    drain_open(whiles, &mut diagnostics, "WHILE", "ENDWHILE");
    drain_open(repeats, &mut diagnostics, "REPEAT", "UNTIL");
    drain_open(procedures, &mut diagnostics, "PROCEDURE", "ENDPROCEDURE");
    drain_open(functions, &mut diagnostics, "FUNCTION", "ENDFUNCTION");
    drain_open(types, &mut diagnostics, "TYPE", "ENDTYPE");

    diagnostics
}

fn close_block(
    stack: &mut Vec<usize>,
    diagnostics: &mut Vec<Diagnostic>,
    line: usize,
    closer: &str,
    opener: &str,
) {
    if stack.pop().is_none() {
        diagnostics.push(Diagnostic::structural(
            line,
            format!("{} has no matching {}", closer, opener),
        ));
    }
}

fn drain_open(stack: Vec<usize>, diagnostics: &mut Vec<Diagnostic>, opener: &str, closer: &str) {
    for line in stack {
        diagnostics.push(Diagnostic::structural(
            line,
            format!("{} has no matching {}", opener, closer),
        ));
    }
}

/// The identifier directly after the token at `i`, when there is one on the
/// same line
fn identifier_after(tokens: &[Token], i: usize) -> Option<String> {
    match tokens.get(i + 1) {
        Some(token) if matches!(token.kind, TokenType::Identifier) => Some(token.text.clone()),
        _ => None,
    }
}
