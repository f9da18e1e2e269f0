//! Error types for the pseudocode interpreter
//!
//! [`SyntaxError`] covers everything caught before execution (lexing and
//! parsing). [`RuntimeError`] covers everything that halts a run. Both are
//! folded into [`Diagnostic`] values for reporting, so callers see one
//! uniform finding list regardless of which stage complained.

use std::fmt;

pub mod diagnostic;

pub use diagnostic::{Diagnostic, DiagnosticKind};

/// Result type alias for interpreter operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// An error found while parsing source text.
///
/// The parser collects these instead of stopping at the first one, so a
/// single pass reports every malformed statement in the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
}

impl SyntaxError {
    /// Create a new syntax error
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.line, self.column)
    }
}

impl std::error::Error for SyntaxError {}

/// Errors raised while a program is executing
///
/// Exactly one of these terminates a run; output produced before it is
/// preserved. Every variant records the line of the statement that
/// triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Use of a name with no declaration in any enclosing scope
    NotDeclared { name: String, line: usize },

    /// Declaration of a name already bound in the current scope
    DuplicateDeclaration { name: String, line: usize },

    /// Assignment to a CONSTANT
    ConstantReassignment { name: String, line: usize },

    /// Array index outside the declared bounds
    IndexOutOfBounds {
        name: String,
        index: i64,
        lower: i64,
        upper: i64,
        line: usize,
    },

    /// Field access that the record type does not define, or field access
    /// on a value that is not a record
    InvalidFieldAccess {
        type_name: String,
        field: String,
        line: usize,
    },

    /// Call with the wrong number of arguments
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
        line: usize,
    },

    /// A function finished its body without executing RETURN
    MissingReturn { name: String, line: usize },

    /// File operation on a name with no open handle
    FileNotOpen { filename: String, line: usize },

    /// OPENFILE on a name that already has an open handle
    FileAlreadyOpen { filename: String, line: usize },

    /// File operation against the wrong open mode
    FileModeViolation {
        filename: String,
        mode: String,
        operation: String,
        line: usize,
    },

    /// READFILE with no lines left in the buffer
    ReadPastEof { filename: String, line: usize },

    /// Operand or assigned value of the wrong type
    TypeMismatch {
        expected: String,
        got: String,
        line: usize,
    },

    /// Division, DIV or MOD with a zero divisor
    DivisionByZero { line: usize },

    /// INTEGER arithmetic outside the representable range
    IntegerOverflow { line: usize },

    /// Call nesting beyond the configured depth limit
    CallDepthExceeded { limit: usize, line: usize },

    /// Statement limit exhausted (guard against runaway loops)
    StepLimitExceeded { limit: u64, line: usize },

    /// INPUT text that does not parse as the target's declared type
    InvalidInput {
        expected: String,
        text: String,
        line: usize,
    },

    /// Remaining dialect misuse with no dedicated variant
    Unsupported { message: String, line: usize },
}

impl RuntimeError {
    /// The line of the statement that raised the error
    pub fn line(&self) -> usize {
        match self {
            Self::NotDeclared { line, .. }
            | Self::DuplicateDeclaration { line, .. }
            | Self::ConstantReassignment { line, .. }
            | Self::IndexOutOfBounds { line, .. }
            | Self::InvalidFieldAccess { line, .. }
            | Self::ArityMismatch { line, .. }
            | Self::MissingReturn { line, .. }
            | Self::FileNotOpen { line, .. }
            | Self::FileAlreadyOpen { line, .. }
            | Self::FileModeViolation { line, .. }
            | Self::ReadPastEof { line, .. }
            | Self::TypeMismatch { line, .. }
            | Self::DivisionByZero { line }
            | Self::IntegerOverflow { line }
            | Self::CallDepthExceeded { line, .. }
            | Self::StepLimitExceeded { line, .. }
            | Self::InvalidInput { line, .. }
            | Self::Unsupported { line, .. } => *line,
        }
    }

    /// The descriptive text without the line suffix, for diagnostics that
    /// carry the line separately
    pub fn message(&self) -> String {
        match self {
            Self::NotDeclared { name, .. } => {
                format!("'{}' has not been declared", name)
            }
            Self::DuplicateDeclaration { name, .. } => {
                format!("'{}' is already declared in this scope", name)
            }
            Self::ConstantReassignment { name, .. } => {
                format!("cannot assign to constant '{}'", name)
            }
            Self::IndexOutOfBounds {
                name,
                index,
                lower,
                upper,
                ..
            } => {
                format!(
                    "index {} is outside the bounds {}:{} of '{}'",
                    index, lower, upper, name
                )
            }
            Self::InvalidFieldAccess {
                type_name, field, ..
            } => {
                format!("{} has no field '{}'", type_name, field)
            }
            Self::ArityMismatch {
                name,
                expected,
                got,
                ..
            } => {
                format!(
                    "'{}' expects {} argument{}, got {}",
                    name,
                    expected,
                    if *expected == 1 { "" } else { "s" },
                    got
                )
            }
            Self::MissingReturn { name, .. } => {
                format!("function '{}' ended without RETURN", name)
            }
            Self::FileNotOpen { filename, .. } => {
                format!("file \"{}\" is not open", filename)
            }
            Self::FileAlreadyOpen { filename, .. } => {
                format!("file \"{}\" is already open", filename)
            }
            Self::FileModeViolation {
                filename,
                mode,
                operation,
                ..
            } => {
                format!(
                    "cannot {} \"{}\" while it is open FOR {}",
                    operation, filename, mode
                )
            }
            Self::ReadPastEof { filename, .. } => {
                format!("attempted to read past the end of \"{}\"", filename)
            }
            Self::TypeMismatch { expected, got, .. } => {
                format!("expected {}, got {}", expected, got)
            }
            Self::DivisionByZero { .. } => "division by zero".to_string(),
            Self::IntegerOverflow { .. } => "INTEGER arithmetic overflowed".to_string(),
            Self::CallDepthExceeded { limit, .. } => {
                format!("call depth exceeded the limit of {}", limit)
            }
            Self::StepLimitExceeded { limit, .. } => {
                format!("execution exceeded the limit of {} statements", limit)
            }
            Self::InvalidInput { expected, text, .. } => {
                format!("INPUT expected {}, got \"{}\"", expected, text)
            }
            Self::Unsupported { message, .. } => message.clone(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}", self.message(), self.line())
    }
}

impl std::error::Error for RuntimeError {}
