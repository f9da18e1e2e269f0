//! Parser implementation
//!
//! A recursive-descent parser with error recovery. Errors are collected
//! rather than returned at the first failure: a malformed statement is
//! recorded and the parser skips to the next line, so one pass reports
//! every problem and still yields the statements that did parse.

use super::ast::*;
use crate::error::SyntaxError;
use crate::lexer::{Keyword, Literal as TokenLiteral, Token, TokenType};

type ParseResult<T> = Result<T, SyntaxError>;

/// Parser for pseudocode token streams
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    /// Parse the token stream. Always returns the partial program together
    /// with every error found.
    pub fn parse(mut self) -> (Program, Vec<SyntaxError>) {
        let mut statements = Vec::new();

        loop {
            self.skip_blank_lines();
            if self.is_at_end() {
                break;
            }
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        (Program { statements }, self.errors)
    }

    // ===== Statements =====

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_keyword(Keyword::Declare) {
            self.declare_statement()
        } else if self.match_keyword(Keyword::Constant) {
            self.constant_statement()
        } else if self.match_keyword(Keyword::If) {
            self.if_statement()
        } else if self.match_keyword(Keyword::Case) {
            self.case_statement()
        } else if self.match_keyword(Keyword::For) {
            self.for_statement()
        } else if self.match_keyword(Keyword::While) {
            self.while_statement()
        } else if self.match_keyword(Keyword::Repeat) {
            self.repeat_statement()
        } else if self.match_keyword(Keyword::Procedure) {
            self.procedure_definition()
        } else if self.match_keyword(Keyword::Function) {
            self.function_definition()
        } else if self.match_keyword(Keyword::Call) {
            self.call_statement()
        } else if self.match_keyword(Keyword::Return) {
            self.return_statement()
        } else if self.match_keyword(Keyword::Input) {
            self.input_statement()
        } else if self.match_keyword(Keyword::Output) {
            self.output_statement()
        } else if self.match_keyword(Keyword::OpenFile) {
            self.openfile_statement()
        } else if self.match_keyword(Keyword::ReadFile) {
            self.readfile_statement()
        } else if self.match_keyword(Keyword::WriteFile) {
            self.writefile_statement()
        } else if self.match_keyword(Keyword::CloseFile) {
            self.closefile_statement()
        } else if self.match_keyword(Keyword::Type) {
            self.record_type_definition()
        } else if self.check(TokenType::Identifier) {
            self.assignment_statement()
        } else {
            Err(self.error_here(format!(
                "unexpected {} at the start of a statement",
                self.describe_current()
            )))
        }
    }

    /// DECLARE name : Type
    fn declare_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let name = self.consume_identifier("expected a name after DECLARE")?;
        self.consume(TokenType::Colon, "expected ':' after the name in DECLARE")?;
        let type_name = self.parse_type()?;
        self.expect_end_of_line()?;

        Ok(Stmt::VariableDecl {
            name,
            type_name: Some(type_name),
            initializer: None,
            constant: false,
            line,
        })
    }

    /// CONSTANT name = value (← also accepted)
    fn constant_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let name = self.consume_identifier("expected a name after CONSTANT")?;

        if !self.match_token(TokenType::Equal) && !self.match_token(TokenType::Assign) {
            return Err(self.error_here("expected '=' after the constant name"));
        }

        let initializer = self.expression()?;
        self.expect_end_of_line()?;

        Ok(Stmt::VariableDecl {
            name,
            type_name: None,
            initializer: Some(initializer),
            constant: true,
            line,
        })
    }

    /// target ← value
    fn assignment_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.peek().line;
        let column = self.peek().column;
        let target = self.postfix()?;

        if !target.is_assignable() {
            return Err(SyntaxError::new(
                "a procedure call needs CALL in front of it",
                line,
                column,
            ));
        }

        if self.match_token(TokenType::Equal) || self.match_token(TokenType::ColonAssign) {
            return Err(SyntaxError::new(
                format!("assignment uses ←, not '{}'", self.previous().text),
                self.previous().line,
                self.previous().column,
            ));
        }

        self.consume(TokenType::Assign, "expected ← after the assignment target")?;
        let value = self.expression()?;
        self.expect_end_of_line()?;

        Ok(Stmt::Assignment {
            target,
            value,
            line,
        })
    }

    /// IF condition THEN ... [ELSE ...] ENDIF, with THEN allowed on the
    /// line below the condition
    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;
        let condition = self.expression()?;

        self.skip_blank_lines();
        self.consume_keyword(Keyword::Then, "expected THEN after the IF condition")?;
        self.expect_end_of_line()?;

        let then_branch = self.block_body(
            &[Keyword::Else, Keyword::EndIf],
            Keyword::If,
            Keyword::EndIf,
            line,
            column,
        )?;

        let else_branch = if self.match_keyword(Keyword::Else) {
            self.expect_end_of_line()?;
            Some(self.block_body(&[Keyword::EndIf], Keyword::If, Keyword::EndIf, line, column)?)
        } else {
            None
        };

        self.consume_keyword(Keyword::EndIf, "expected ENDIF")?;
        self.expect_end_of_line()?;

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            line,
        })
    }

    /// CASE OF subject ... ENDCASE
    fn case_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;

        self.consume_keyword(Keyword::Of, "expected OF after CASE")?;
        let subject = self.expression()?;
        self.expect_end_of_line()?;

        let mut arms = Vec::new();
        let mut otherwise: Option<Vec<Stmt>> = None;

        loop {
            self.skip_blank_lines();
            if self.is_at_end() {
                return Err(SyntaxError::new(
                    "CASE is missing its ENDCASE",
                    line,
                    column,
                ));
            }
            if self.match_keyword(Keyword::EndCase) {
                break;
            }
            if self.check_keyword(Keyword::Otherwise) {
                let tok_line = self.peek().line;
                let tok_column = self.peek().column;
                self.advance();
                self.match_token(TokenType::Colon);
                let body = self.case_arm_body();
                if otherwise.is_some() {
                    self.errors.push(SyntaxError::new(
                        "CASE has more than one OTHERWISE",
                        tok_line,
                        tok_column,
                    ));
                } else {
                    otherwise = Some(body);
                }
                continue;
            }

            let arm_line = self.peek().line;
            match self.case_label() {
                Ok(label) => {
                    let body = self.case_arm_body();
                    arms.push(CaseArm {
                        label,
                        body,
                        line: arm_line,
                    });
                }
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        self.expect_end_of_line()?;

        Ok(Stmt::Case {
            subject,
            arms,
            otherwise,
            line,
        })
    }

    /// value : or from TO to :
    fn case_label(&mut self) -> ParseResult<CaseLabel> {
        let first = self.expression()?;
        let label = if self.match_keyword(Keyword::To) {
            let last = self.expression()?;
            CaseLabel::Range(first, last)
        } else {
            CaseLabel::Value(first)
        };
        self.consume(TokenType::Colon, "expected ':' after the CASE label")?;
        Ok(label)
    }

    /// Statements belonging to one CASE arm: the rest of the label's line,
    /// then whole lines up to the next label, OTHERWISE or ENDCASE.
    /// Recovers internally, so it cannot fail.
    fn case_arm_body(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();

        if self.check(TokenType::Newline) || self.check(TokenType::Comment) || self.is_at_end() {
            let _ = self.expect_end_of_line();
        } else {
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        loop {
            self.skip_blank_lines();
            if self.is_at_end()
                || self.check_keyword(Keyword::EndCase)
                || self.check_keyword(Keyword::Otherwise)
                || self.at_case_label_line()
            {
                break;
            }
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        statements
    }

    /// Whether the upcoming line is a CASE arm label: it starts like an
    /// expression and carries a colon outside brackets before any ←
    fn at_case_label_line(&self) -> bool {
        let starts_label = matches!(
            self.peek().kind,
            TokenType::Literal(_)
                | TokenType::Identifier
                | TokenType::Minus
                | TokenType::LeftParen
                | TokenType::Keyword(Keyword::True)
                | TokenType::Keyword(Keyword::False)
        );
        if !starts_label {
            return false;
        }

        let mut depth = 0usize;
        let mut i = self.current;
        while i < self.tokens.len() {
            match self.tokens[i].kind {
                TokenType::Newline | TokenType::Eof => return false,
                TokenType::LeftParen | TokenType::LeftBracket => depth += 1,
                TokenType::RightParen | TokenType::RightBracket => {
                    depth = depth.saturating_sub(1)
                }
                TokenType::Assign if depth == 0 => return false,
                TokenType::Colon if depth == 0 => return true,
                _ => {}
            }
            i += 1;
        }
        false
    }

    /// FOR variable ← start TO end [STEP step] ... NEXT [variable]
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;

        let variable = self.consume_identifier("expected a control variable after FOR")?;
        self.consume(TokenType::Assign, "expected ← after the FOR variable")?;
        let start = self.expression()?;
        self.consume_keyword(Keyword::To, "expected TO after the start value")?;
        let end = self.expression()?;
        let step = if self.match_keyword(Keyword::Step) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect_end_of_line()?;

        let body = self.block_body(&[Keyword::Next], Keyword::For, Keyword::Next, line, column)?;

        self.consume_keyword(Keyword::Next, "expected NEXT")?;
        // The name after NEXT is checked by the structure pass, not here
        if self.check(TokenType::Identifier) {
            self.advance();
        }
        self.expect_end_of_line()?;

        Ok(Stmt::ForLoop {
            variable,
            start,
            end,
            step,
            body,
            line,
        })
    }

    /// WHILE condition [DO] ... ENDWHILE
    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;

        let condition = self.expression()?;
        self.match_keyword(Keyword::Do);
        self.expect_end_of_line()?;

        let body = self.block_body(
            &[Keyword::EndWhile],
            Keyword::While,
            Keyword::EndWhile,
            line,
            column,
        )?;

        self.consume_keyword(Keyword::EndWhile, "expected ENDWHILE")?;
        self.expect_end_of_line()?;

        Ok(Stmt::WhileLoop {
            condition,
            body,
            line,
        })
    }

    /// REPEAT ... UNTIL condition
    fn repeat_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;
        self.expect_end_of_line()?;

        let body = self.block_body(
            &[Keyword::Until],
            Keyword::Repeat,
            Keyword::Until,
            line,
            column,
        )?;

        self.consume_keyword(Keyword::Until, "expected UNTIL")?;
        let condition = self.expression()?;
        self.expect_end_of_line()?;

        Ok(Stmt::RepeatLoop {
            body,
            condition,
            line,
        })
    }

    /// PROCEDURE name[(params)] ... ENDPROCEDURE
    fn procedure_definition(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;

        let name = self.consume_identifier("expected a procedure name after PROCEDURE")?;
        let params = if self.match_token(TokenType::LeftParen) {
            self.parameter_list()?
        } else {
            Vec::new()
        };
        self.expect_end_of_line()?;

        let body = self.block_body(
            &[Keyword::EndProcedure],
            Keyword::Procedure,
            Keyword::EndProcedure,
            line,
            column,
        )?;

        self.consume_keyword(Keyword::EndProcedure, "expected ENDPROCEDURE")?;
        self.expect_end_of_line()?;

        Ok(Stmt::ProcedureDef {
            name,
            params,
            body,
            line,
        })
    }

    /// FUNCTION name[(params)] RETURNS Type ... ENDFUNCTION
    fn function_definition(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;

        let name = self.consume_identifier("expected a function name after FUNCTION")?;
        let params = if self.match_token(TokenType::LeftParen) {
            self.parameter_list()?
        } else {
            Vec::new()
        };

        self.consume_keyword(Keyword::Returns, "expected RETURNS in the function heading")?;
        let returns = self.parse_type()?;
        self.expect_end_of_line()?;

        let body = self.block_body(
            &[Keyword::EndFunction],
            Keyword::Function,
            Keyword::EndFunction,
            line,
            column,
        )?;

        self.consume_keyword(Keyword::EndFunction, "expected ENDFUNCTION")?;
        self.expect_end_of_line()?;

        Ok(Stmt::FunctionDef {
            name,
            params,
            returns,
            body,
            line,
        })
    }

    /// [BYVAL|BYREF] name : Type, ...
    ///
    /// A mode keyword applies to every parameter after it until the next
    /// mode keyword.
    fn parameter_list(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        let mut mode = PassMode::ByVal;

        if !self.check(TokenType::RightParen) {
            loop {
                if self.match_keyword(Keyword::ByVal) {
                    mode = PassMode::ByVal;
                } else if self.match_keyword(Keyword::ByRef) {
                    mode = PassMode::ByRef;
                }

                let name = self.consume_identifier("expected a parameter name")?;
                self.consume(TokenType::Colon, "expected ':' after the parameter name")?;
                let type_name = self.parse_type()?;
                params.push(Param {
                    name,
                    mode,
                    type_name,
                });

                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "expected ')' after the parameters")?;
        Ok(params)
    }

    /// CALL name[(args)]
    fn call_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let name = self.consume_identifier("expected a procedure name after CALL")?;

        let mut args = Vec::new();
        if self.match_token(TokenType::LeftParen) {
            if !self.check(TokenType::RightParen) {
                loop {
                    args.push(self.expression()?);
                    if !self.match_token(TokenType::Comma) {
                        break;
                    }
                }
            }
            self.consume(TokenType::RightParen, "expected ')' after the arguments")?;
        }
        self.expect_end_of_line()?;

        Ok(Stmt::ProcedureCall { name, args, line })
    }

    /// RETURN [value]
    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;

        let value = if self.check(TokenType::Newline)
            || self.check(TokenType::Comment)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect_end_of_line()?;

        Ok(Stmt::Return { value, line })
    }

    /// INPUT target
    fn input_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let target = self.postfix()?;

        if !target.is_assignable() {
            return Err(SyntaxError::new(
                "INPUT needs a variable to read into",
                line,
                self.previous().column,
            ));
        }
        self.expect_end_of_line()?;

        Ok(Stmt::Input { target, line })
    }

    /// OUTPUT value, value, ...
    fn output_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;

        let mut values = vec![self.expression()?];
        while self.match_token(TokenType::Comma) {
            values.push(self.expression()?);
        }
        self.expect_end_of_line()?;

        Ok(Stmt::Output { values, line })
    }

    /// OPENFILE filename FOR READ|WRITE|APPEND
    fn openfile_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let filename = self.expression()?;

        self.consume_keyword(Keyword::For, "expected FOR after the filename")?;
        let mode = if self.match_keyword(Keyword::Read) {
            FileMode::Read
        } else if self.match_keyword(Keyword::Write) {
            FileMode::Write
        } else if self.match_keyword(Keyword::Append) {
            FileMode::Append
        } else {
            return Err(self.error_here("expected READ, WRITE or APPEND"));
        };
        self.expect_end_of_line()?;

        Ok(Stmt::FileOp {
            op: FileOp::Open { filename, mode },
            line,
        })
    }

    /// READFILE filename, target
    fn readfile_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let filename = self.expression()?;
        self.consume(TokenType::Comma, "expected ',' after the filename")?;

        let target = self.postfix()?;
        if !target.is_assignable() {
            return Err(SyntaxError::new(
                "READFILE needs a variable to read into",
                line,
                self.previous().column,
            ));
        }
        self.expect_end_of_line()?;

        Ok(Stmt::FileOp {
            op: FileOp::Read { filename, target },
            line,
        })
    }

    /// WRITEFILE filename, value
    fn writefile_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let filename = self.expression()?;
        self.consume(TokenType::Comma, "expected ',' after the filename")?;
        let value = self.expression()?;
        self.expect_end_of_line()?;

        Ok(Stmt::FileOp {
            op: FileOp::Write { filename, value },
            line,
        })
    }

    /// CLOSEFILE filename
    fn closefile_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let filename = self.expression()?;
        self.expect_end_of_line()?;

        Ok(Stmt::FileOp {
            op: FileOp::Close { filename },
            line,
        })
    }

    /// TYPE name / DECLARE field : Type ... / ENDTYPE
    fn record_type_definition(&mut self) -> ParseResult<Stmt> {
        let line = self.previous().line;
        let column = self.previous().column;

        let name = self.consume_identifier("expected a type name after TYPE")?;
        self.expect_end_of_line()?;

        let mut fields = Vec::new();
        loop {
            self.skip_blank_lines();
            if self.is_at_end() {
                return Err(SyntaxError::new(
                    "TYPE is missing its ENDTYPE",
                    line,
                    column,
                ));
            }
            if self.match_keyword(Keyword::EndType) {
                break;
            }

            match self.record_field() {
                Ok(field) => fields.push(field),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        self.expect_end_of_line()?;

        Ok(Stmt::RecordTypeDef { name, fields, line })
    }

    fn record_field(&mut self) -> ParseResult<(String, TypeName)> {
        self.consume_keyword(Keyword::Declare, "expected DECLARE or ENDTYPE inside TYPE")?;
        let name = self.consume_identifier("expected a field name after DECLARE")?;
        self.consume(TokenType::Colon, "expected ':' after the field name")?;
        let type_name = self.parse_type()?;
        self.expect_end_of_line()?;
        Ok((name, type_name))
    }

    /// Statements between a block opener and its closing keyword. Bad
    /// statements inside the block are recorded and skipped; running out of
    /// input is an error pinned to the opener's line.
    fn block_body(
        &mut self,
        terminators: &[Keyword],
        opener: Keyword,
        closer: Keyword,
        opener_line: usize,
        opener_column: usize,
    ) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        loop {
            self.skip_blank_lines();
            if self.is_at_end() {
                return Err(SyntaxError::new(
                    format!("{} is missing its {}", opener, closer),
                    opener_line,
                    opener_column,
                ));
            }
            if terminators.iter().any(|kw| self.check_keyword(kw.clone())) {
                return Ok(statements);
            }
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
    }

    // ===== Types =====

    fn parse_type(&mut self) -> ParseResult<TypeName> {
        if self.match_keyword(Keyword::Integer) {
            Ok(TypeName::Integer)
        } else if self.match_keyword(Keyword::Real) {
            Ok(TypeName::Real)
        } else if self.match_keyword(Keyword::String) {
            Ok(TypeName::String)
        } else if self.match_keyword(Keyword::Char) {
            Ok(TypeName::Char)
        } else if self.match_keyword(Keyword::Boolean) {
            Ok(TypeName::Boolean)
        } else if self.match_keyword(Keyword::Date) {
            Ok(TypeName::Date)
        } else if self.match_keyword(Keyword::Array) {
            self.parse_array_type()
        } else if self.check_keyword(Keyword::File) {
            // Files are handled through OPENFILE and friends, never as
            // declared values
            Err(self.error_here("FILE cannot be used as a variable type"))
        } else if self.check(TokenType::Identifier) {
            let name = self.advance().text.clone();
            Ok(TypeName::Named(name))
        } else {
            Err(self.error_here("expected a type"))
        }
    }

    /// ARRAY[l:u] OF Type or ARRAY[l:u, l:u] OF Type
    fn parse_array_type(&mut self) -> ParseResult<TypeName> {
        let open = self.consume(TokenType::LeftBracket, "expected '[' after ARRAY")?;
        let open_line = open.line;
        let open_column = open.column;

        let mut dims = Vec::new();
        loop {
            let lower = self.expression()?;
            self.consume(TokenType::Colon, "expected ':' between array bounds")?;
            let upper = self.expression()?;
            dims.push((lower, upper));
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        self.consume(TokenType::RightBracket, "expected ']' after the array bounds")?;

        if dims.len() > 2 {
            return Err(SyntaxError::new(
                "arrays have at most two dimensions",
                open_line,
                open_column,
            ));
        }

        self.consume_keyword(Keyword::Of, "expected OF after the array bounds")?;
        let elem = self.parse_type()?;
        if matches!(elem, TypeName::Array { .. }) {
            return Err(SyntaxError::new(
                "arrays of arrays are not supported; declare two dimensions instead",
                open_line,
                open_column,
            ));
        }

        Ok(TypeName::Array {
            dims,
            elem: Box::new(elem),
        })
    }

    // ===== Expressions =====

    fn expression(&mut self) -> ParseResult<Expr> {
        self.logical_or()
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.logical_and()?;

        while self.match_keyword(Keyword::Or) {
            let line = self.previous().line;
            let right = Box::new(self.logical_and()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator: BinaryOp::Or,
                right,
                line,
            };
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while self.match_keyword(Keyword::And) {
            let line = self.previous().line;
            let right = Box::new(self.equality()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator: BinaryOp::And,
                right,
                line,
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while self.match_tokens(&[TokenType::Equal, TokenType::NotEqual]) {
            let line = self.previous().line;
            let operator = match self.previous().kind {
                TokenType::Equal => BinaryOp::Equal,
                TokenType::NotEqual => BinaryOp::NotEqual,
                _ => unreachable!(),
            };
            let right = Box::new(self.comparison()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right,
                line,
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while self.match_tokens(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let line = self.previous().line;
            let operator = match self.previous().kind {
                TokenType::Greater => BinaryOp::Greater,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                TokenType::Less => BinaryOp::Less,
                TokenType::LessEqual => BinaryOp::LessEqual,
                _ => unreachable!(),
            };
            let right = Box::new(self.term()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right,
                line,
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while self.match_tokens(&[TokenType::Plus, TokenType::Minus, TokenType::Ampersand]) {
            let line = self.previous().line;
            let operator = match self.previous().kind {
                TokenType::Plus => BinaryOp::Add,
                TokenType::Minus => BinaryOp::Subtract,
                TokenType::Ampersand => BinaryOp::Concat,
                _ => unreachable!(),
            };
            let right = Box::new(self.factor()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right,
                line,
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        loop {
            let operator = if self.match_tokens(&[TokenType::Star, TokenType::Slash]) {
                match self.previous().kind {
                    TokenType::Star => BinaryOp::Multiply,
                    TokenType::Slash => BinaryOp::Divide,
                    _ => unreachable!(),
                }
            } else if self.match_keyword(Keyword::Div) {
                BinaryOp::IntDivide
            } else if self.match_keyword(Keyword::Mod) {
                BinaryOp::Modulo
            } else {
                break;
            };

            let line = self.previous().line;
            let right = Box::new(self.unary()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right,
                line,
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_token(TokenType::Minus) {
            let line = self.previous().line;
            let operand = Box::new(self.unary()?);
            return Ok(Expr::Unary {
                operator: UnaryOp::Negate,
                operand,
                line,
            });
        }

        if self.match_keyword(Keyword::Not) {
            let line = self.previous().line;
            let operand = Box::new(self.unary()?);
            return Ok(Expr::Unary {
                operator: UnaryOp::Not,
                operand,
                line,
            });
        }

        self.postfix()
    }

    /// Postfix chain: indexing and field access on any base, calls on bare
    /// names only
    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.check(TokenType::LeftParen) {
                let (name, line) = match &expr {
                    Expr::Identifier { name, line } => (name.clone(), *line),
                    _ => break,
                };
                self.advance();

                let mut args = Vec::new();
                if !self.check(TokenType::RightParen) {
                    loop {
                        args.push(self.expression()?);
                        if !self.match_token(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenType::RightParen, "expected ')' after the arguments")?;
                expr = Expr::Call { name, args, line };
            } else if self.match_token(TokenType::LeftBracket) {
                let line = self.previous().line;
                let column = self.previous().column;

                let mut indices = vec![self.expression()?];
                while self.match_token(TokenType::Comma) {
                    indices.push(self.expression()?);
                }
                self.consume(TokenType::RightBracket, "expected ']' after the indices")?;

                if indices.len() > 2 {
                    return Err(SyntaxError::new(
                        "arrays have at most two indices",
                        line,
                        column,
                    ));
                }
                expr = Expr::ArrayAccess {
                    array: Box::new(expr),
                    indices,
                    line,
                };
            } else if self.match_token(TokenType::Dot) {
                let line = self.previous().line;
                let field = self.consume_identifier("expected a field name after '.'")?;
                expr = Expr::RecordAccess {
                    record: Box::new(expr),
                    field,
                    line,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let line = self.peek().line;

        if let TokenType::Literal(lit) = &self.peek().kind {
            let value = match lit {
                TokenLiteral::Integer(n) => Literal::Integer(*n),
                TokenLiteral::Real(x) => Literal::Real(*x),
                TokenLiteral::Str(s) => Literal::Str(s.clone()),
                TokenLiteral::Char(c) => Literal::Char(*c),
            };
            self.advance();
            return Ok(Expr::Literal { value, line });
        }

        if self.match_keyword(Keyword::True) {
            return Ok(Expr::Literal {
                value: Literal::Boolean(true),
                line,
            });
        }

        if self.match_keyword(Keyword::False) {
            return Ok(Expr::Literal {
                value: Literal::Boolean(false),
                line,
            });
        }

        if self.match_keyword(Keyword::Eof) {
            self.consume(TokenType::LeftParen, "expected '(' after EOF")?;
            let filename = Box::new(self.expression()?);
            self.consume(TokenType::RightParen, "expected ')' after the filename")?;
            return Ok(Expr::EofCheck { filename, line });
        }

        if self.check(TokenType::Identifier) {
            let name = self.advance().text.clone();
            return Ok(Expr::Identifier { name, line });
        }

        if self.match_token(TokenType::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "expected ')' after the expression")?;
            return Ok(expr);
        }

        Err(self.error_here(format!(
            "expected an expression, found {}",
            self.describe_current()
        )))
    }

    // ===== Helper Methods =====

    /// Consume newline and comment tokens
    fn skip_blank_lines(&mut self) {
        while matches!(self.peek().kind, TokenType::Newline | TokenType::Comment) {
            self.advance();
        }
    }

    /// Require that the current statement's line ends here (allowing a
    /// trailing comment)
    fn expect_end_of_line(&mut self) -> ParseResult<()> {
        while self.check(TokenType::Comment) {
            self.advance();
        }
        if self.check(TokenType::Newline) {
            self.advance();
            return Ok(());
        }
        if self.is_at_end() {
            return Ok(());
        }
        Err(self.error_here(format!(
            "expected end of line, found {}",
            self.describe_current()
        )))
    }

    /// Skip forward past the next newline so parsing can continue with the
    /// following statement
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if matches!(self.peek().kind, TokenType::Newline) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn match_token(&mut self, kind: TokenType) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_tokens(&mut self, kinds: &[TokenType]) -> bool {
        for kind in kinds {
            if self.check(kind.clone()) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(&kind)
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        if self.is_at_end() {
            false
        } else {
            matches!(&self.peek().kind, TokenType::Keyword(k) if k == &keyword)
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenType, message: &str) -> ParseResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword, message: &str) -> ParseResult<&Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> ParseResult<String> {
        if self.check(TokenType::Identifier) {
            Ok(self.advance().text.clone())
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(message, token.line, token.column)
    }

    /// A readable name for the current token in error messages
    fn describe_current(&self) -> String {
        let token = self.peek();
        match token.kind {
            TokenType::Unknown => format!("unrecognized text '{}'", token.text),
            _ => token.kind.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (Program, Vec<SyntaxError>) {
        Parser::new(tokenize(source)).parse()
    }

    fn parse_clean(source: &str) -> Program {
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        program
    }

    fn first_error(source: &str) -> SyntaxError {
        let (_, errors) = parse_source(source);
        assert!(!errors.is_empty(), "expected at least one error");
        errors.into_iter().next().unwrap()
    }

    #[test]
    fn test_declare() {
        let program = parse_clean("DECLARE Score : INTEGER");
        assert_eq!(
            program.statements,
            vec![Stmt::VariableDecl {
                name: "Score".to_string(),
                type_name: Some(TypeName::Integer),
                initializer: None,
                constant: false,
                line: 1,
            }]
        );
    }

    #[test]
    fn test_declare_two_dimensional_array() {
        let program = parse_clean("DECLARE Grid : ARRAY[1:3, 1:4] OF REAL");
        match &program.statements[0] {
            Stmt::VariableDecl {
                type_name: Some(TypeName::Array { dims, elem }),
                ..
            } => {
                assert_eq!(dims.len(), 2);
                assert_eq!(**elem, TypeName::Real);
            }
            other => panic!("expected an array declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_three_dimensions_rejected() {
        let err = first_error("DECLARE Cube : ARRAY[1:2, 1:2, 1:2] OF INTEGER");
        assert!(err.message.contains("two dimensions"));
    }

    #[test]
    fn test_file_type_rejected() {
        let err = first_error("DECLARE F : FILE");
        assert!(err.message.contains("FILE"));
    }

    #[test]
    fn test_constant_with_equals_or_arrow() {
        let program = parse_clean("CONSTANT Max = 10\nCONSTANT Pi ← 3.14");
        assert_eq!(program.statements.len(), 2);
        for stmt in &program.statements {
            match stmt {
                Stmt::VariableDecl {
                    constant,
                    initializer,
                    ..
                } => {
                    assert!(constant);
                    assert!(initializer.is_some());
                }
                other => panic!("expected a constant, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_assignment() {
        let program = parse_clean("Total ← Total + 1");
        match &program.statements[0] {
            Stmt::Assignment { target, .. } => {
                assert_eq!(
                    *target,
                    Expr::Identifier {
                        name: "Total".to_string(),
                        line: 1
                    }
                );
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_with_equals_is_an_error() {
        let err = first_error("Total = 5");
        assert!(err.message.contains("←"));
    }

    #[test]
    fn test_assignment_to_array_element_and_field() {
        let program = parse_clean("Marks[2] ← 7\nStudent.Name ← \"Ada\"");
        assert!(matches!(
            program.statements[0],
            Stmt::Assignment {
                target: Expr::ArrayAccess { .. },
                ..
            }
        ));
        assert!(matches!(
            program.statements[1],
            Stmt::Assignment {
                target: Expr::RecordAccess { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_if_with_then_on_next_line() {
        let program = parse_clean(
            "IF Score > 50\n  THEN\n    OUTPUT \"pass\"\n  ELSE\n    OUTPUT \"fail\"\nENDIF",
        );
        match &program.statements[0] {
            Stmt::If {
                then_branch,
                else_branch,
                line,
                ..
            } => {
                assert_eq!(*line, 1);
                assert_eq!(then_branch.len(), 1);
                assert_eq!(else_branch.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected IF, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_endif_points_at_the_opener() {
        let err = first_error("IF x > 0 THEN\nOUTPUT 1");
        assert!(err.message.contains("ENDIF"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_case_with_values_ranges_and_otherwise() {
        let program = parse_clean(
            "CASE OF Mark\n  10 : OUTPUT \"full\"\n  1 TO 9 : OUTPUT \"partial\"\n  OTHERWISE OUTPUT \"none\"\nENDCASE",
        );
        match &program.statements[0] {
            Stmt::Case {
                arms, otherwise, ..
            } => {
                assert_eq!(arms.len(), 2);
                assert!(matches!(arms[0].label, CaseLabel::Value(_)));
                assert!(matches!(arms[1].label, CaseLabel::Range(_, _)));
                assert_eq!(otherwise.as_ref().map(Vec::len), Some(1));
            }
            other => panic!("expected CASE, got {:?}", other),
        }
    }

    #[test]
    fn test_case_arm_body_spanning_lines() {
        let program = parse_clean(
            "CASE OF n\n  1 :\n    OUTPUT \"one\"\n    OUTPUT \"still one\"\n  2 : OUTPUT \"two\"\nENDCASE",
        );
        match &program.statements[0] {
            Stmt::Case { arms, .. } => {
                assert_eq!(arms[0].body.len(), 2);
                assert_eq!(arms[1].body.len(), 1);
            }
            other => panic!("expected CASE, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_step_and_named_next() {
        let program = parse_clean("FOR i ← 10 TO 2 STEP -2\n  OUTPUT i\nNEXT i");
        match &program.statements[0] {
            Stmt::ForLoop {
                variable, step, body, ..
            } => {
                assert_eq!(variable, "i");
                assert!(step.is_some());
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected FOR, got {:?}", other),
        }
    }

    #[test]
    fn test_while_with_and_without_do() {
        parse_clean("WHILE n > 0 DO\n  n ← n - 1\nENDWHILE");
        parse_clean("WHILE n > 0\n  n ← n - 1\nENDWHILE");
    }

    #[test]
    fn test_repeat_until() {
        let program = parse_clean("REPEAT\n  n ← n + 1\nUNTIL n >= 3");
        assert!(matches!(program.statements[0], Stmt::RepeatLoop { .. }));
    }

    #[test]
    fn test_procedure_with_sticky_byref() {
        let program =
            parse_clean("PROCEDURE Swap(BYREF a : INTEGER, b : INTEGER)\n  a ← b\nENDPROCEDURE");
        match &program.statements[0] {
            Stmt::ProcedureDef { params, .. } => {
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].mode, PassMode::ByRef);
                // the mode keyword carries to the parameters after it
                assert_eq!(params[1].mode, PassMode::ByRef);
            }
            other => panic!("expected PROCEDURE, got {:?}", other),
        }
    }

    #[test]
    fn test_function_returns() {
        let program =
            parse_clean("FUNCTION Square(n : INTEGER) RETURNS INTEGER\n  RETURN n * n\nENDFUNCTION");
        match &program.statements[0] {
            Stmt::FunctionDef {
                params, returns, ..
            } => {
                assert_eq!(params[0].mode, PassMode::ByVal);
                assert_eq!(*returns, TypeName::Integer);
            }
            other => panic!("expected FUNCTION, got {:?}", other),
        }
    }

    #[test]
    fn test_function_without_returns_is_an_error() {
        let err = first_error("FUNCTION f(n : INTEGER)\n  RETURN n\nENDFUNCTION");
        assert!(err.message.contains("RETURNS"));
    }

    #[test]
    fn test_call_with_and_without_arguments() {
        let program = parse_clean("CALL Setup\nCALL Greet(\"Ada\", 3)");
        assert!(matches!(
            &program.statements[0],
            Stmt::ProcedureCall { args, .. } if args.is_empty()
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::ProcedureCall { args, .. } if args.len() == 2
        ));
    }

    #[test]
    fn test_bare_call_without_keyword_is_an_error() {
        let err = first_error("Greet(\"Ada\")");
        assert!(err.message.contains("CALL"));
    }

    #[test]
    fn test_input_and_output() {
        let program = parse_clean("INPUT Name\nOUTPUT \"Hello \", Name, '!'");
        assert!(matches!(program.statements[0], Stmt::Input { .. }));
        assert!(matches!(
            &program.statements[1],
            Stmt::Output { values, .. } if values.len() == 3
        ));
    }

    #[test]
    fn test_file_statements() {
        let program = parse_clean(
            "OPENFILE \"data.txt\" FOR READ\nREADFILE \"data.txt\", Line\nWRITEFILE \"out.txt\", Line\nCLOSEFILE \"data.txt\"",
        );
        assert!(matches!(
            &program.statements[0],
            Stmt::FileOp {
                op: FileOp::Open {
                    mode: FileMode::Read,
                    ..
                },
                ..
            }
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::FileOp {
                op: FileOp::Read { .. },
                ..
            }
        ));
        assert!(matches!(
            &program.statements[2],
            Stmt::FileOp {
                op: FileOp::Write { .. },
                ..
            }
        ));
        assert!(matches!(
            &program.statements[3],
            Stmt::FileOp {
                op: FileOp::Close { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_record_type_definition() {
        let program = parse_clean(
            "TYPE Student\n  DECLARE Name : STRING\n  DECLARE Mark : INTEGER\nENDTYPE",
        );
        match &program.statements[0] {
            Stmt::RecordTypeDef { name, fields, .. } => {
                assert_eq!(name, "Student");
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[1], ("Mark".to_string(), TypeName::Integer));
            }
            other => panic!("expected TYPE, got {:?}", other),
        }
    }

    #[test]
    fn test_eof_expression() {
        let program = parse_clean("WHILE NOT EOF(\"data.txt\")\n  READFILE \"data.txt\", x\nENDWHILE");
        match &program.statements[0] {
            Stmt::WhileLoop { condition, .. } => {
                assert!(matches!(
                    condition,
                    Expr::Unary {
                        operator: UnaryOp::Not,
                        ..
                    }
                ));
            }
            other => panic!("expected WHILE, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse_clean("x ← 1 + 2 * 3");
        match &program.statements[0] {
            Stmt::Assignment { value, .. } => match value {
                Expr::Binary {
                    operator: BinaryOp::Add,
                    right,
                    ..
                } => {
                    assert!(matches!(
                        **right,
                        Expr::Binary {
                            operator: BinaryOp::Multiply,
                            ..
                        }
                    ));
                }
                other => panic!("expected + at the top, got {:?}", other),
            },
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_div_mod_and_concat_operators() {
        let program = parse_clean("x ← a DIV b MOD c\ns ← \"a\" & \"b\"");
        match &program.statements[0] {
            Stmt::Assignment { value, .. } => {
                assert!(matches!(
                    value,
                    Expr::Binary {
                        operator: BinaryOp::Modulo,
                        ..
                    }
                ));
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
        match &program.statements[1] {
            Stmt::Assignment { value, .. } => {
                assert!(matches!(
                    value,
                    Expr::Binary {
                        operator: BinaryOp::Concat,
                        ..
                    }
                ));
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_recovery_keeps_later_statements() {
        let (program, errors) = parse_source("DECLARE : INTEGER\nOUTPUT 1");
        assert_eq!(errors.len(), 1);
        assert!(matches!(program.statements[0], Stmt::Output { .. }));
    }

    #[test]
    fn test_every_error_is_reported() {
        let (_, errors) = parse_source("DECLARE : INTEGER\nx ←\nOUTPUT 2");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 2);
    }

    #[test]
    fn test_unknown_token_is_described() {
        let err = first_error("x ← @");
        assert!(err.message.contains("unrecognized text '@'"));
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let program = parse_clean("// header\n\nOUTPUT 1 // trailing\n\n// footer");
        assert_eq!(program.statements.len(), 1);
    }
}
