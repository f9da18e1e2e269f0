//! Scanner implementation for pseudocode source
//!
//! Tokenization is total: malformed input becomes [`TokenType::Unknown`]
//! tokens instead of errors, so the parser and the style checker always get
//! a complete token stream to work with.

use super::token::{Keyword, Literal, Token, TokenType};

/// Lexer for pseudocode source text
pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    start_column: usize,
}

impl Lexer {
    /// Create a new lexer
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_column: 1,
        }
    }

    /// Tokenize the source text. Always succeeds; the stream ends with an
    /// Eof token.
    pub fn tokenize(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_column = self.column;
            self.scan_token();
        }

        self.tokens
            .push(Token::new(TokenType::Eof, "", self.line, self.column));
        self.tokens
    }

    /// Scan a single token
    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            // Whitespace (skip)
            ' ' | '\r' | '\t' => {}

            // Newlines terminate statements, so they are real tokens
            '\n' => {
                self.add_token(TokenType::Newline);
                self.line += 1;
                self.column = 1;
            }

            // Single-character tokens
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '+' => self.add_token(TokenType::Plus),
            '-' => self.add_token(TokenType::Minus),
            '*' => self.add_token(TokenType::Star),
            '&' => self.add_token(TokenType::Ampersand),
            '=' => self.add_token(TokenType::Equal),
            '\u{2190}' => self.add_token(TokenType::Assign),

            // Two-character tokens
            '<' => {
                if self.match_char('>') {
                    self.add_token(TokenType::NotEqual)
                } else if self.match_char('=') {
                    self.add_token(TokenType::LessEqual)
                } else {
                    self.add_token(TokenType::Less)
                }
            }

            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenType::GreaterEqual)
                } else {
                    self.add_token(TokenType::Greater)
                }
            }

            ':' => {
                if self.match_char('=') {
                    self.add_token(TokenType::ColonAssign)
                } else {
                    self.add_token(TokenType::Colon)
                }
            }

            // Comments run to end of line and are kept as tokens
            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    self.add_token(TokenType::Comment)
                } else {
                    self.add_token(TokenType::Slash)
                }
            }

            // String literals
            '"' => self.scan_string(),

            // Character literals
            '\'' => self.scan_char(),

            // Number literals
            c if c.is_ascii_digit() => self.scan_number(),

            // Identifiers and keywords (letters only at the start; the
            // dialect has no underscores in names)
            c if c.is_ascii_alphabetic() => self.scan_identifier(),

            // Anything else is lexical garbage
            _ => self.add_token(TokenType::Unknown),
        }
    }

    /// Scan a string literal. Strings have no escape sequences and cannot
    /// span lines; an unterminated string becomes an Unknown token running
    /// to the end of the line.
    fn scan_string(&mut self) {
        while self.peek() != '"' && self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }

        if self.peek() != '"' {
            self.add_token(TokenType::Unknown);
            return;
        }

        // Consume closing quote
        self.advance();

        let value: String = self.source[self.start + 1..self.current - 1].iter().collect();
        self.add_token(TokenType::Literal(Literal::Str(value)));
    }

    /// Scan a character literal: exactly one character between single
    /// quotes. Anything else becomes Unknown.
    fn scan_char(&mut self) {
        if self.is_at_end() || self.peek() == '\n' {
            self.add_token(TokenType::Unknown);
            return;
        }

        let value = self.advance();

        if value != '\'' && self.match_char('\'') {
            self.add_token(TokenType::Literal(Literal::Char(value)));
        } else {
            self.add_token(TokenType::Unknown);
        }
    }

    /// Scan a number literal: a digit run, optionally one point followed by
    /// more digits
    fn scan_number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let is_real = if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            true
        } else {
            false
        };

        let text: String = self.source[self.start..self.current].iter().collect();

        if is_real {
            match text.parse::<f64>() {
                Ok(value) => self.add_token(TokenType::Literal(Literal::Real(value))),
                Err(_) => self.add_token(TokenType::Unknown),
            }
        } else {
            // A digit run too large for INTEGER is not a valid literal
            match text.parse::<i64>() {
                Ok(value) => self.add_token(TokenType::Literal(Literal::Integer(value))),
                Err(_) => self.add_token(TokenType::Unknown),
            }
        }
    }

    /// Scan an identifier or keyword
    fn scan_identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        // Keywords match in any case; the original text is preserved so the
        // style checker can see how they were written
        let kind = if let Some(keyword) = Keyword::from_str(&text) {
            TokenType::Keyword(keyword)
        } else {
            TokenType::Identifier
        };

        self.add_token(kind)
    }

    /// Add a token spanning start..current
    fn add_token(&mut self, kind: TokenType) {
        let text: String = self.source[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(kind, text, self.line, self.start_column));
    }

    /// Advance to the next character
    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    /// Check if the next character matches and consume it if so
    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            self.column += 1;
            true
        }
    }

    /// Peek at the current character without consuming it
    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    /// Peek at the next character without consuming it
    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    /// Check if we've reached the end of the source
    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokenize_source(source: &str) -> Vec<Token> {
        Lexer::new(source).tokenize()
    }

    #[test]
    fn test_empty_source() {
        let tokens = tokenize_source("");
        assert_eq!(tokens.len(), 1); // Just EOF
        assert_eq!(tokens[0].kind, TokenType::Eof);
    }

    #[test]
    fn test_single_character_tokens() {
        let tokens = tokenize_source("()[],.+-*/&=");
        assert_eq!(tokens[0].kind, TokenType::LeftParen);
        assert_eq!(tokens[1].kind, TokenType::RightParen);
        assert_eq!(tokens[2].kind, TokenType::LeftBracket);
        assert_eq!(tokens[3].kind, TokenType::RightBracket);
        assert_eq!(tokens[4].kind, TokenType::Comma);
        assert_eq!(tokens[5].kind, TokenType::Dot);
        assert_eq!(tokens[6].kind, TokenType::Plus);
        assert_eq!(tokens[7].kind, TokenType::Minus);
        assert_eq!(tokens[8].kind, TokenType::Star);
        assert_eq!(tokens[9].kind, TokenType::Slash);
        assert_eq!(tokens[10].kind, TokenType::Ampersand);
        assert_eq!(tokens[11].kind, TokenType::Equal);
    }

    #[test]
    fn test_composite_operators() {
        let tokens = tokenize_source("<> <= >= < >");
        assert_eq!(tokens[0].kind, TokenType::NotEqual);
        assert_eq!(tokens[1].kind, TokenType::LessEqual);
        assert_eq!(tokens[2].kind, TokenType::GreaterEqual);
        assert_eq!(tokens[3].kind, TokenType::Less);
        assert_eq!(tokens[4].kind, TokenType::Greater);
    }

    #[test]
    fn test_assignment_arrow() {
        let tokens = tokenize_source("Count ← 1");
        assert_eq!(tokens[0].kind, TokenType::Identifier);
        assert_eq!(tokens[0].text, "Count");
        assert_eq!(tokens[1].kind, TokenType::Assign);
        assert_eq!(tokens[2].kind, TokenType::Literal(Literal::Integer(1)));
    }

    #[test]
    fn test_colon_assign_is_its_own_token() {
        let tokens = tokenize_source("Count := 1");
        assert_eq!(tokens[1].kind, TokenType::ColonAssign);
    }

    #[test]
    fn test_keywords_any_case() {
        let tokens = tokenize_source("DECLARE declare Declare");
        assert_eq!(tokens[0].kind, TokenType::Keyword(Keyword::Declare));
        assert_eq!(tokens[1].kind, TokenType::Keyword(Keyword::Declare));
        assert_eq!(tokens[2].kind, TokenType::Keyword(Keyword::Declare));
        // Original casing survives for the style checker
        assert_eq!(tokens[1].text, "declare");
    }

    #[test]
    fn test_identifiers() {
        let tokens = tokenize_source("Counter firstName x2");
        assert_eq!(tokens[0].kind, TokenType::Identifier);
        assert_eq!(tokens[0].text, "Counter");
        assert_eq!(tokens[1].kind, TokenType::Identifier);
        assert_eq!(tokens[1].text, "firstName");
        assert_eq!(tokens[2].kind, TokenType::Identifier);
        assert_eq!(tokens[2].text, "x2");
    }

    #[test]
    fn test_underscore_is_not_an_identifier_character() {
        let tokens = tokenize_source("first_name");
        assert_eq!(tokens[0].kind, TokenType::Identifier);
        assert_eq!(tokens[0].text, "first");
        assert_eq!(tokens[1].kind, TokenType::Unknown);
        assert_eq!(tokens[1].text, "_");
        assert_eq!(tokens[2].kind, TokenType::Identifier);
        assert_eq!(tokens[2].text, "name");
    }

    #[test]
    fn test_integer_literals() {
        let tokens = tokenize_source("0 42 123456");
        assert_eq!(tokens[0].kind, TokenType::Literal(Literal::Integer(0)));
        assert_eq!(tokens[1].kind, TokenType::Literal(Literal::Integer(42)));
        assert_eq!(tokens[2].kind, TokenType::Literal(Literal::Integer(123456)));
    }

    #[test]
    fn test_real_literals() {
        let tokens = tokenize_source("3.14 0.5");
        assert_eq!(tokens[0].kind, TokenType::Literal(Literal::Real(3.14)));
        assert_eq!(tokens[1].kind, TokenType::Literal(Literal::Real(0.5)));
    }

    #[test]
    fn test_number_then_dot_without_digits() {
        // "3." is the integer 3 followed by a dot token
        let tokens = tokenize_source("3.");
        assert_eq!(tokens[0].kind, TokenType::Literal(Literal::Integer(3)));
        assert_eq!(tokens[1].kind, TokenType::Dot);
    }

    #[test]
    fn test_string_literals() {
        let tokens = tokenize_source("\"hello\" \"two words\"");
        assert_eq!(
            tokens[0].kind,
            TokenType::Literal(Literal::Str("hello".to_string()))
        );
        assert_eq!(
            tokens[1].kind,
            TokenType::Literal(Literal::Str("two words".to_string()))
        );
    }

    #[test]
    fn test_strings_have_no_escapes() {
        let tokens = tokenize_source(r#""a\b""#);
        assert_eq!(
            tokens[0].kind,
            TokenType::Literal(Literal::Str("a\\b".to_string()))
        );
    }

    #[test]
    fn test_unterminated_string_becomes_unknown_to_end_of_line() {
        let tokens = tokenize_source("OUTPUT \"oops\nOUTPUT 1");
        assert_eq!(tokens[0].kind, TokenType::Keyword(Keyword::Output));
        assert_eq!(tokens[1].kind, TokenType::Unknown);
        assert_eq!(tokens[1].text, "\"oops");
        assert_eq!(tokens[2].kind, TokenType::Newline);
        assert_eq!(tokens[3].kind, TokenType::Keyword(Keyword::Output));
    }

    #[test]
    fn test_char_literals() {
        let tokens = tokenize_source("'A' 'z'");
        assert_eq!(tokens[0].kind, TokenType::Literal(Literal::Char('A')));
        assert_eq!(tokens[1].kind, TokenType::Literal(Literal::Char('z')));
    }

    #[test]
    fn test_malformed_char_literal() {
        let tokens = tokenize_source("'ab'");
        assert_eq!(tokens[0].kind, TokenType::Unknown);
    }

    #[test]
    fn test_comment_is_kept_as_a_token() {
        let tokens = tokenize_source("x ← 1 // set up\nOUTPUT x");
        assert_eq!(tokens[3].kind, TokenType::Comment);
        assert_eq!(tokens[3].text, "// set up");
        assert_eq!(tokens[4].kind, TokenType::Newline);
    }

    #[test]
    fn test_newlines_are_tokens() {
        let tokens = tokenize_source("OUTPUT 1\nOUTPUT 2");
        assert_eq!(tokens[2].kind, TokenType::Newline);
        assert_eq!(tokens[2].line, 1);
        assert_eq!(tokens[3].line, 2);
    }

    #[test]
    fn test_unexpected_character_becomes_unknown() {
        let tokens = tokenize_source("x @ y");
        assert_eq!(tokens[0].kind, TokenType::Identifier);
        assert_eq!(tokens[1].kind, TokenType::Unknown);
        assert_eq!(tokens[1].text, "@");
        assert_eq!(tokens[2].kind, TokenType::Identifier);
    }

    #[test]
    fn test_oversized_integer_literal_is_unknown() {
        let tokens = tokenize_source("99999999999999999999");
        assert_eq!(tokens[0].kind, TokenType::Unknown);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize_source("IF x\nTHEN");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 4));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 1));
    }

    #[test]
    fn test_declare_statement() {
        let tokens = tokenize_source("DECLARE Score : INTEGER");
        assert_eq!(tokens[0].kind, TokenType::Keyword(Keyword::Declare));
        assert_eq!(tokens[1].kind, TokenType::Identifier);
        assert_eq!(tokens[1].text, "Score");
        assert_eq!(tokens[2].kind, TokenType::Colon);
        assert_eq!(tokens[3].kind, TokenType::Keyword(Keyword::Integer));
    }
}
