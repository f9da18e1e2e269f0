//! Abstract Syntax Tree definitions
//!
//! This module defines the node types the parser produces. The tree is
//! immutable once built; every node records the source line it came from so
//! later stages can report positions without re-reading the source.

use std::fmt;

/// Root node representing a complete program
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// DECLARE name : Type, or CONSTANT name = value
    VariableDecl {
        name: String,
        type_name: Option<TypeName>,
        initializer: Option<Expr>,
        constant: bool,
        line: usize,
    },

    /// target ← value
    Assignment {
        target: Expr,
        value: Expr,
        line: usize,
    },

    /// IF condition THEN ... [ELSE ...] ENDIF
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
        line: usize,
    },

    /// CASE OF subject ... [OTHERWISE ...] ENDCASE
    Case {
        subject: Expr,
        arms: Vec<CaseArm>,
        otherwise: Option<Vec<Stmt>>,
        line: usize,
    },

    /// FOR variable ← start TO end [STEP step] ... NEXT
    ForLoop {
        variable: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
        line: usize,
    },

    /// WHILE condition DO ... ENDWHILE
    WhileLoop {
        condition: Expr,
        body: Vec<Stmt>,
        line: usize,
    },

    /// REPEAT ... UNTIL condition
    RepeatLoop {
        body: Vec<Stmt>,
        condition: Expr,
        line: usize,
    },

    /// PROCEDURE name(params) ... ENDPROCEDURE
    ProcedureDef {
        name: String,
        params: Vec<Param>,
        body: Vec<Stmt>,
        line: usize,
    },

    /// FUNCTION name(params) RETURNS Type ... ENDFUNCTION
    FunctionDef {
        name: String,
        params: Vec<Param>,
        returns: TypeName,
        body: Vec<Stmt>,
        line: usize,
    },

    /// CALL name or CALL name(args)
    ProcedureCall {
        name: String,
        args: Vec<Expr>,
        line: usize,
    },

    /// RETURN [value]
    Return {
        value: Option<Expr>,
        line: usize,
    },

    /// INPUT target
    Input { target: Expr, line: usize },

    /// OUTPUT value, value, ...
    Output { values: Vec<Expr>, line: usize },

    /// OPENFILE / READFILE / WRITEFILE / CLOSEFILE
    FileOp { op: FileOp, line: usize },

    /// TYPE name ... ENDTYPE
    RecordTypeDef {
        name: String,
        fields: Vec<(String, TypeName)>,
        line: usize,
    },
}

impl Stmt {
    /// The source line of the statement's opening keyword
    pub fn line(&self) -> usize {
        match self {
            Self::VariableDecl { line, .. }
            | Self::Assignment { line, .. }
            | Self::If { line, .. }
            | Self::Case { line, .. }
            | Self::ForLoop { line, .. }
            | Self::WhileLoop { line, .. }
            | Self::RepeatLoop { line, .. }
            | Self::ProcedureDef { line, .. }
            | Self::FunctionDef { line, .. }
            | Self::ProcedureCall { line, .. }
            | Self::Return { line, .. }
            | Self::Input { line, .. }
            | Self::Output { line, .. }
            | Self::FileOp { line, .. }
            | Self::RecordTypeDef { line, .. } => *line,
        }
    }
}

/// A file-handling operation
#[derive(Debug, Clone, PartialEq)]
pub enum FileOp {
    /// OPENFILE filename FOR mode
    Open { filename: Expr, mode: FileMode },
    /// READFILE filename, target
    Read { filename: Expr, target: Expr },
    /// WRITEFILE filename, value
    Write { filename: Expr, value: Expr },
    /// CLOSEFILE filename
    Close { filename: Expr },
}

/// The mode a file is opened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
    Append,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Append => "APPEND",
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One labelled arm of a CASE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub label: CaseLabel,
    pub body: Vec<Stmt>,
    pub line: usize,
}

/// A CASE arm label
#[derive(Debug, Clone, PartialEq)]
pub enum CaseLabel {
    /// A single value to match by equality
    Value(Expr),
    /// An inclusive range: from TO to
    Range(Expr, Expr),
}

/// How an argument is passed to a procedure or function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    ByVal,
    ByRef,
}

/// A declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub mode: PassMode,
    pub type_name: TypeName,
}

/// A type as written in source
#[derive(Debug, Clone, PartialEq)]
pub enum TypeName {
    Integer,
    Real,
    String,
    Char,
    Boolean,
    Date,
    /// ARRAY[l:u] OF Type or ARRAY[l:u, l:u] OF Type. Bounds are
    /// expressions evaluated once at declaration.
    Array {
        dims: Vec<(Expr, Expr)>,
        elem: Box<TypeName>,
    },
    /// A user-defined record type, by name
    Named(String),
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal { value: Literal, line: usize },

    /// Variable (or parameter, or constant) reference
    Identifier { name: String, line: usize },

    /// Binary operation. AND and OR short-circuit; everything else
    /// evaluates both sides.
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        line: usize,
    },

    /// Unary operation
    Unary {
        operator: UnaryOp,
        operand: Box<Expr>,
        line: usize,
    },

    /// array[i] or array[i, j]
    ArrayAccess {
        array: Box<Expr>,
        indices: Vec<Expr>,
        line: usize,
    },

    /// record.field
    RecordAccess {
        record: Box<Expr>,
        field: String,
        line: usize,
    },

    /// Function call: name(args). Only a bare name can be called.
    Call {
        name: String,
        args: Vec<Expr>,
        line: usize,
    },

    /// EOF(filename)
    EofCheck { filename: Box<Expr>, line: usize },
}

impl Expr {
    /// The source line of the expression
    pub fn line(&self) -> usize {
        match self {
            Self::Literal { line, .. }
            | Self::Identifier { line, .. }
            | Self::Binary { line, .. }
            | Self::Unary { line, .. }
            | Self::ArrayAccess { line, .. }
            | Self::RecordAccess { line, .. }
            | Self::Call { line, .. }
            | Self::EofCheck { line, .. } => *line,
        }
    }

    /// Whether the expression can stand on the left of ← (or as an INPUT
    /// or READFILE target). Index and field chains must bottom out at a
    /// variable, not a call.
    pub fn is_assignable(&self) -> bool {
        match self {
            Self::Identifier { .. } => true,
            Self::ArrayAccess { array, .. } => array.is_assignable(),
            Self::RecordAccess { record, .. } => record.is_assignable(),
            _ => false,
        }
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Real(f64),
    Str(String),
    Char(char),
    Boolean(bool),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntDivide,
    Modulo,
    Concat,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    /// The operator as written in source
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::IntDivide => "DIV",
            Self::Modulo => "MOD",
            Self::Concat => "&",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Not => "NOT",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
