//! Lexical analysis module
//!
//! This module handles tokenization of pseudocode source text.

pub mod token;
pub mod scanner;

pub use token::{Token, TokenType, Keyword, Literal};
pub use scanner::Lexer;

/// Tokenize source text. Never fails; malformed input surfaces as
/// [`TokenType::Unknown`] tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
