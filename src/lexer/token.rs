//! Token definitions for the pseudocode dialect
//!
//! This module defines all token types used in lexical analysis. Comments
//! and newlines are classified tokens rather than discarded trivia: the
//! parser uses newlines as statement terminators and the style checker
//! inspects the raw token stream.

use std::fmt;

/// A token with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenType,
    /// The exact source text, original casing preserved
    pub text: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenType, text: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}

/// Token types in the pseudocode dialect
#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Literals
    Literal(Literal),

    // Identifiers and keywords
    Identifier,
    Keyword(Keyword),

    // Arithmetic operators
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Ampersand, // & (string concatenation)

    // Comparison operators
    Equal,        // =
    NotEqual,     // <>
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=

    // Assignment
    Assign,      // ← (U+2190)
    ColonAssign, // := (not part of the dialect; kept so the style pass can flag it)

    // Delimiters
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Colon,        // :
    Dot,          // .

    // Special
    Comment,
    Newline,
    Unknown,
    Eof,
}

/// Keywords in the pseudocode dialect
///
/// Matched case-insensitively; the canonical spelling is all caps and the
/// style pass flags anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Declarations
    Declare,
    Constant,
    Type,
    EndType,
    Array,
    Of,

    // Selection
    If,
    Then,
    Else,
    EndIf,
    Case,
    Otherwise,
    EndCase,

    // Iteration
    For,
    To,
    Step,
    Next,
    While,
    Do,
    EndWhile,
    Repeat,
    Until,

    // Subroutines
    Procedure,
    EndProcedure,
    Function,
    Returns,
    EndFunction,
    Call,
    Return,
    ByVal,
    ByRef,

    // Console I/O
    Input,
    Output,

    // File handling
    OpenFile,
    ReadFile,
    WriteFile,
    CloseFile,
    Read,
    Write,
    Append,
    Eof,

    // Type names
    Integer,
    Real,
    String,
    Char,
    Boolean,
    Date,
    File,

    // Operators that are words
    And,
    Or,
    Not,
    Div,
    Mod,

    // Boolean literals
    True,
    False,
}

impl Keyword {
    /// Get keyword from source text, ignoring case
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DECLARE" => Some(Self::Declare),
            "CONSTANT" => Some(Self::Constant),
            "TYPE" => Some(Self::Type),
            "ENDTYPE" => Some(Self::EndType),
            "ARRAY" => Some(Self::Array),
            "OF" => Some(Self::Of),
            "IF" => Some(Self::If),
            "THEN" => Some(Self::Then),
            "ELSE" => Some(Self::Else),
            "ENDIF" => Some(Self::EndIf),
            "CASE" => Some(Self::Case),
            "OTHERWISE" => Some(Self::Otherwise),
            "ENDCASE" => Some(Self::EndCase),
            "FOR" => Some(Self::For),
            "TO" => Some(Self::To),
            "STEP" => Some(Self::Step),
            "NEXT" => Some(Self::Next),
            "WHILE" => Some(Self::While),
            "DO" => Some(Self::Do),
            "ENDWHILE" => Some(Self::EndWhile),
            "REPEAT" => Some(Self::Repeat),
            "UNTIL" => Some(Self::Until),
            "PROCEDURE" => Some(Self::Procedure),
            "ENDPROCEDURE" => Some(Self::EndProcedure),
            "FUNCTION" => Some(Self::Function),
            "RETURNS" => Some(Self::Returns),
            "ENDFUNCTION" => Some(Self::EndFunction),
            "CALL" => Some(Self::Call),
            "RETURN" => Some(Self::Return),
            "BYVAL" => Some(Self::ByVal),
            "BYREF" => Some(Self::ByRef),
            "INPUT" => Some(Self::Input),
            "OUTPUT" => Some(Self::Output),
            "OPENFILE" => Some(Self::OpenFile),
            "READFILE" => Some(Self::ReadFile),
            "WRITEFILE" => Some(Self::WriteFile),
            "CLOSEFILE" => Some(Self::CloseFile),
            "READ" => Some(Self::Read),
            "WRITE" => Some(Self::Write),
            "APPEND" => Some(Self::Append),
            "EOF" => Some(Self::Eof),
            "INTEGER" => Some(Self::Integer),
            "REAL" => Some(Self::Real),
            "STRING" => Some(Self::String),
            "CHAR" => Some(Self::Char),
            "BOOLEAN" => Some(Self::Boolean),
            "DATE" => Some(Self::Date),
            "FILE" => Some(Self::File),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "NOT" => Some(Self::Not),
            "DIV" => Some(Self::Div),
            "MOD" => Some(Self::Mod),
            "TRUE" => Some(Self::True),
            "FALSE" => Some(Self::False),
            _ => None,
        }
    }

    /// Canonical all-caps spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Declare => "DECLARE",
            Self::Constant => "CONSTANT",
            Self::Type => "TYPE",
            Self::EndType => "ENDTYPE",
            Self::Array => "ARRAY",
            Self::Of => "OF",
            Self::If => "IF",
            Self::Then => "THEN",
            Self::Else => "ELSE",
            Self::EndIf => "ENDIF",
            Self::Case => "CASE",
            Self::Otherwise => "OTHERWISE",
            Self::EndCase => "ENDCASE",
            Self::For => "FOR",
            Self::To => "TO",
            Self::Step => "STEP",
            Self::Next => "NEXT",
            Self::While => "WHILE",
            Self::Do => "DO",
            Self::EndWhile => "ENDWHILE",
            Self::Repeat => "REPEAT",
            Self::Until => "UNTIL",
            Self::Procedure => "PROCEDURE",
            Self::EndProcedure => "ENDPROCEDURE",
            Self::Function => "FUNCTION",
            Self::Returns => "RETURNS",
            Self::EndFunction => "ENDFUNCTION",
            Self::Call => "CALL",
            Self::Return => "RETURN",
            Self::ByVal => "BYVAL",
            Self::ByRef => "BYREF",
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
            Self::OpenFile => "OPENFILE",
            Self::ReadFile => "READFILE",
            Self::WriteFile => "WRITEFILE",
            Self::CloseFile => "CLOSEFILE",
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Append => "APPEND",
            Self::Eof => "EOF",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::String => "STRING",
            Self::Char => "CHAR",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::File => "FILE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::True => "TRUE",
            Self::False => "FALSE",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Literal token values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    Str(String),
    Char(char),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Real(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Char(c) => write!(f, "'{}'", c),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{}", lit),
            Self::Identifier => write!(f, "identifier"),
            Self::Keyword(kw) => write!(f, "keyword '{}'", kw),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Ampersand => write!(f, "&"),
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "<>"),
            Self::Less => write!(f, "<"),
            Self::LessEqual => write!(f, "<="),
            Self::Greater => write!(f, ">"),
            Self::GreaterEqual => write!(f, ">="),
            Self::Assign => write!(f, "←"),
            Self::ColonAssign => write!(f, ":="),
            Self::LeftParen => write!(f, "("),
            Self::RightParen => write!(f, ")"),
            Self::LeftBracket => write!(f, "["),
            Self::RightBracket => write!(f, "]"),
            Self::Comma => write!(f, ","),
            Self::Colon => write!(f, ":"),
            Self::Dot => write!(f, "."),
            Self::Comment => write!(f, "comment"),
            Self::Newline => write!(f, "newline"),
            Self::Unknown => write!(f, "unrecognized text"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_from_str() {
        assert_eq!(Keyword::from_str("DECLARE"), Some(Keyword::Declare));
        assert_eq!(Keyword::from_str("ENDWHILE"), Some(Keyword::EndWhile));
        assert_eq!(Keyword::from_str("OTHERWISE"), Some(Keyword::Otherwise));
        assert_eq!(Keyword::from_str("Score"), None);
        assert_eq!(Keyword::from_str("END"), None);
    }

    #[test]
    fn test_keyword_matching_ignores_case() {
        assert_eq!(Keyword::from_str("declare"), Some(Keyword::Declare));
        assert_eq!(Keyword::from_str("Endif"), Some(Keyword::EndIf));
        assert_eq!(Keyword::from_str("bYrEf"), Some(Keyword::ByRef));
    }

    #[test]
    fn test_keyword_as_str() {
        assert_eq!(Keyword::Declare.as_str(), "DECLARE");
        assert_eq!(Keyword::EndProcedure.as_str(), "ENDPROCEDURE");
        assert_eq!(Keyword::Div.as_str(), "DIV");
    }
}
