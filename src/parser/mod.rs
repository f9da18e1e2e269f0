//! Parser module
//!
//! This module handles parsing tokens into an Abstract Syntax Tree (AST).

pub mod ast;
pub mod parser;

pub use ast::{
    BinaryOp, CaseArm, CaseLabel, Expr, FileMode, FileOp, Literal, Param, PassMode, Program, Stmt,
    TypeName, UnaryOp,
};
pub use parser::Parser;

use crate::error::SyntaxError;
use crate::lexer::Token;

/// Parse a token stream into a program plus every syntax error found
pub fn parse(tokens: Vec<Token>) -> (Program, Vec<SyntaxError>) {
    Parser::new(tokens).parse()
}
