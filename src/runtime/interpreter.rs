//! Tree-walking interpreter
//!
//! Executes a parsed program against a lexically scoped symbol table.
//! OUTPUT collects into a buffer, INPUT comes from a caller-supplied
//! provider and files live in an in-memory store, so runs are
//! deterministic and embeddable.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeResult};
use crate::parser::{
    BinaryOp, CaseLabel, Expr, FileOp, Literal, PassMode, Program, Stmt, TypeName, UnaryOp,
};
use crate::runtime::builtins::{self, Prng};
use crate::runtime::files::FileTable;
use crate::runtime::scope::{Binding, Entry, Subroutine, SymbolTable};
use crate::runtime::value::{
    coerce, default_value, ArrayValue, DateValue, RecordTypeData, TypeDesc, Value,
};

const DEFAULT_DEPTH_LIMIT: usize = 100;
const MAX_ARRAY_ELEMENTS: i64 = 1_000_000;

/// Control flow signal raised by RETURN
#[derive(Debug)]
enum Signal {
    None,
    Return(Option<Value>),
}

/// Tree-walking interpreter. State persists across `interpret` calls,
/// so a REPL can feed statements one at a time.
pub struct Interpreter<'a> {
    scopes: SymbolTable,
    files: FileTable,
    output: Vec<String>,
    input: Box<dyn FnMut() -> String + 'a>,
    signal: Signal,
    prng: Prng,
    call_depth: usize,
    depth_limit: usize,
    step_limit: Option<u64>,
    steps: u64,
}

impl<'a> Interpreter<'a> {
    pub fn new() -> Self {
        Self {
            scopes: SymbolTable::new(),
            files: FileTable::new(),
            output: Vec::new(),
            input: Box::new(String::new),
            signal: Signal::None,
            prng: Prng::new(0),
            call_depth: 0,
            depth_limit: DEFAULT_DEPTH_LIMIT,
            step_limit: None,
            steps: 0,
        }
    }

    /// Replaces the INPUT provider. Each call must yield one line.
    pub fn with_input(mut self, input: impl FnMut() -> String + 'a) -> Self {
        self.input = Box::new(input);
        self
    }

    /// Seeds RAND so runs can be replayed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.prng = Prng::new(seed);
        self
    }

    /// Caps the number of executed statements, to stop runaway loops
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Caps call nesting (default 100)
    pub fn with_call_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn into_output(self) -> Vec<String> {
        self.output
    }

    /// Runs a program. Top-level PROCEDURE and FUNCTION definitions
    /// are declared before anything executes, so calls may appear
    /// above the definition they refer to.
    pub fn interpret(&mut self, program: &Program) -> RuntimeResult<()> {
        for stmt in &program.statements {
            if matches!(stmt, Stmt::ProcedureDef { .. } | Stmt::FunctionDef { .. }) {
                self.declare_subroutine(stmt)?;
            }
        }
        for stmt in &program.statements {
            if matches!(stmt, Stmt::ProcedureDef { .. } | Stmt::FunctionDef { .. }) {
                continue;
            }
            self.execute_stmt(stmt)?;
        }
        Ok(())
    }

    fn declare_subroutine(&mut self, stmt: &Stmt) -> RuntimeResult<()> {
        let (name, params, returns, body, line) = match stmt {
            Stmt::ProcedureDef {
                name,
                params,
                body,
                line,
            } => (name, params, None, body, line),
            Stmt::FunctionDef {
                name,
                params,
                returns,
                body,
                line,
            } => (name, params, Some(returns.clone()), body, line),
            _ => return Ok(()),
        };
        let sub = Rc::new(Subroutine {
            name: name.clone(),
            params: params.clone(),
            returns,
            body: body.clone(),
            defined_in: self.scopes.current_index(),
            line: *line,
        });
        self.scopes.declare(name, Binding::Subroutine(sub), *line)
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> RuntimeResult<()> {
        self.steps += 1;
        if let Some(limit) = self.step_limit {
            if self.steps > limit {
                return Err(RuntimeError::StepLimitExceeded {
                    limit,
                    line: stmt.line(),
                });
            }
        }

        match stmt {
            Stmt::VariableDecl {
                name,
                type_name,
                initializer,
                constant,
                line,
            } => {
                if *constant {
                    let value = match initializer {
                        Some(expr) => self.eval_expr(expr)?,
                        None => {
                            return Err(RuntimeError::Unsupported {
                                message: format!("CONSTANT '{}' needs a value", name),
                                line: *line,
                            })
                        }
                    };
                    let desc = self.desc_of(&value, *line)?;
                    let entry = Entry::owned(desc, value, true);
                    self.scopes.declare(name, Binding::Variable(entry), *line)
                } else {
                    let desc = match type_name {
                        Some(type_name) => self.resolve_type(type_name, *line)?,
                        None => {
                            return Err(RuntimeError::Unsupported {
                                message: format!("DECLARE '{}' needs a type", name),
                                line: *line,
                            })
                        }
                    };
                    let value = default_value(&desc);
                    let entry = Entry::owned(desc, value, false);
                    self.scopes.declare(name, Binding::Variable(entry), *line)
                }
            }

            Stmt::Assignment {
                target,
                value,
                line,
            } => {
                let value = self.eval_expr(value)?;
                self.assign(target, value, *line)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.boolean_value(condition)? {
                    self.execute_block(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute_block(else_branch)?;
                }
                Ok(())
            }

            Stmt::Case {
                subject,
                arms,
                otherwise,
                ..
            } => {
                let subject = self.eval_expr(subject)?;
                for arm in arms {
                    let matched = match &arm.label {
                        CaseLabel::Value(expr) => {
                            let label = self.eval_expr(expr)?;
                            values_equal(&subject, &label, arm.line)?
                        }
                        CaseLabel::Range(from, to) => {
                            let from = self.eval_expr(from)?;
                            let to = self.eval_expr(to)?;
                            values_compare(&subject, &from, arm.line)? != Ordering::Less
                                && values_compare(&subject, &to, arm.line)? != Ordering::Greater
                        }
                    };
                    if matched {
                        return self.execute_block(&arm.body);
                    }
                }
                if let Some(otherwise) = otherwise {
                    return self.execute_block(otherwise);
                }
                Ok(())
            }

            Stmt::ForLoop {
                variable,
                start,
                end,
                step,
                body,
                line,
            } => {
                let first = self.integer_value(start, "an INTEGER bound")?;
                let last = self.integer_value(end, "an INTEGER bound")?;
                let stride = match step {
                    Some(expr) => self.integer_value(expr, "an INTEGER STEP")?,
                    None => 1,
                };
                self.set_loop_variable(variable, first, *line)?;
                loop {
                    let current = self.loop_variable(variable, *line)?;
                    let past_the_end = if stride >= 0 {
                        current > last
                    } else {
                        current < last
                    };
                    if past_the_end {
                        break;
                    }
                    self.execute_block(body)?;
                    if !matches!(self.signal, Signal::None) {
                        break;
                    }
                    let base = self.loop_variable(variable, *line)?;
                    match base.checked_add(stride) {
                        Some(next) => self.set_loop_variable(variable, next, *line)?,
                        None => return Err(RuntimeError::IntegerOverflow { line: *line }),
                    }
                }
                Ok(())
            }

            Stmt::WhileLoop {
                condition, body, ..
            } => {
                while self.boolean_value(condition)? {
                    self.execute_block(body)?;
                    if !matches!(self.signal, Signal::None) {
                        break;
                    }
                }
                Ok(())
            }

            Stmt::RepeatLoop {
                body, condition, ..
            } => {
                loop {
                    self.execute_block(body)?;
                    if !matches!(self.signal, Signal::None) {
                        break;
                    }
                    if self.boolean_value(condition)? {
                        break;
                    }
                }
                Ok(())
            }

            Stmt::ProcedureDef { .. } | Stmt::FunctionDef { .. } => self.declare_subroutine(stmt),

            Stmt::ProcedureCall { name, args, line } => {
                let sub = match self.scopes.lookup(name) {
                    Some(Binding::Subroutine(sub)) => Rc::clone(sub),
                    Some(other) => {
                        return Err(RuntimeError::Unsupported {
                            message: format!(
                                "CALL needs a procedure; '{}' is {}",
                                name,
                                other.describe()
                            ),
                            line: *line,
                        })
                    }
                    None if builtins::is_builtin(name) => {
                        return Err(RuntimeError::Unsupported {
                            message: format!("CALL is for procedures; '{}' is a function", name),
                            line: *line,
                        })
                    }
                    None => {
                        return Err(RuntimeError::NotDeclared {
                            name: name.clone(),
                            line: *line,
                        })
                    }
                };
                if sub.is_function() {
                    return Err(RuntimeError::Unsupported {
                        message: format!("CALL is for procedures; '{}' is a function", name),
                        line: *line,
                    });
                }
                self.call_subroutine(&sub, args, *line)?;
                Ok(())
            }

            Stmt::Return { value, line } => {
                if self.call_depth == 0 {
                    return Err(RuntimeError::Unsupported {
                        message: "RETURN used outside a procedure or function".to_string(),
                        line: *line,
                    });
                }
                let value = match value {
                    Some(expr) => Some(self.eval_expr(expr)?),
                    None => None,
                };
                self.signal = Signal::Return(value);
                Ok(())
            }

            Stmt::Input { target, line } => {
                let text = (self.input)();
                let destination = self.destination_mut(target)?;
                let value = parse_input(&text, destination, *line)?;
                *destination = value;
                Ok(())
            }

            Stmt::Output { values, .. } => {
                let mut rendered = String::new();
                for expr in values {
                    let value = self.eval_expr(expr)?;
                    if !value.is_plain() {
                        return Err(RuntimeError::Unsupported {
                            message: format!(
                                "cannot OUTPUT a value of type {}",
                                value.type_name()
                            ),
                            line: expr.line(),
                        });
                    }
                    rendered.push_str(&value.to_string());
                }
                self.output.push(rendered);
                Ok(())
            }

            Stmt::FileOp { op, line } => self.execute_file_op(op, *line),

            Stmt::RecordTypeDef { name, fields, line } => {
                let mut resolved = Vec::with_capacity(fields.len());
                for (field_name, type_name) in fields {
                    if resolved.iter().any(|(existing, _)| existing == field_name) {
                        return Err(RuntimeError::DuplicateDeclaration {
                            name: field_name.clone(),
                            line: *line,
                        });
                    }
                    let desc = self.resolve_type(type_name, *line)?;
                    resolved.push((field_name.clone(), desc));
                }
                let data = Rc::new(RecordTypeData {
                    name: name.clone(),
                    fields: resolved,
                });
                self.scopes.declare(name, Binding::RecordType(data), *line)
            }
        }
    }

    /// Runs the statements of a branch or loop body, stopping early
    /// when a RETURN signal is pending
    fn execute_block(&mut self, body: &[Stmt]) -> RuntimeResult<()> {
        for stmt in body {
            self.execute_stmt(stmt)?;
            if !matches!(self.signal, Signal::None) {
                break;
            }
        }
        Ok(())
    }

    fn execute_file_op(&mut self, op: &FileOp, line: usize) -> RuntimeResult<()> {
        match op {
            FileOp::Open { filename, mode } => {
                let filename = self.filename_value(filename)?;
                self.files.open(&filename, *mode, line)
            }
            FileOp::Read { filename, target } => {
                let filename = self.filename_value(filename)?;
                let text = self.files.read_line(&filename, line)?;
                let destination = self.destination_mut(target)?;
                let coerced = coerce(Value::Str(text), destination, line)?;
                *destination = coerced;
                Ok(())
            }
            FileOp::Write { filename, value } => {
                let filename = self.filename_value(filename)?;
                let value = self.eval_expr(value)?;
                if !value.is_plain() {
                    return Err(RuntimeError::Unsupported {
                        message: format!("cannot WRITEFILE a value of type {}", value.type_name()),
                        line,
                    });
                }
                self.files.write_line(&filename, value.to_string(), line)
            }
            FileOp::Close { filename } => {
                let filename = self.filename_value(filename)?;
                self.files.close(&filename, line)
            }
        }
    }

    fn call_subroutine(
        &mut self,
        sub: &Subroutine,
        args: &[Expr],
        line: usize,
    ) -> RuntimeResult<Option<Value>> {
        if args.len() != sub.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: sub.name.clone(),
                expected: sub.params.len(),
                got: args.len(),
                line,
            });
        }
        if self.call_depth >= self.depth_limit {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.depth_limit,
                line,
            });
        }

        // Arguments evaluate and BYREF targets resolve in the caller's
        // scope, before the new frame exists.
        let mut bound = Vec::with_capacity(sub.params.len());
        for (param, arg) in sub.params.iter().zip(args) {
            let desc = self.resolve_type(&param.type_name, line)?;
            match param.mode {
                PassMode::ByVal => {
                    let value = self.eval_expr(arg)?;
                    let template = default_value(&desc);
                    let value = coerce(value, &template, arg.line())?;
                    bound.push((param.name.clone(), Entry::owned(desc, value, false)));
                }
                PassMode::ByRef => {
                    let target = match arg {
                        Expr::Identifier { name, .. } => name,
                        other => {
                            return Err(RuntimeError::Unsupported {
                                message: format!(
                                    "BYREF parameter '{}' needs a variable, not an expression",
                                    param.name
                                ),
                                line: other.line(),
                            })
                        }
                    };
                    let (scope, owned) = self.scopes.owner_position(target, arg.line())?;
                    match self.scopes.entry_at(scope, &owned) {
                        Some(entry) if entry.constant => {
                            return Err(RuntimeError::Unsupported {
                                message: format!("cannot pass constant '{}' BYREF", target),
                                line: arg.line(),
                            })
                        }
                        Some(entry) if entry.type_desc != desc => {
                            return Err(RuntimeError::TypeMismatch {
                                expected: desc.name().to_string(),
                                got: entry.type_desc.name().to_string(),
                                line: arg.line(),
                            })
                        }
                        Some(_) => {}
                        None => {
                            return Err(RuntimeError::NotDeclared {
                                name: target.clone(),
                                line: arg.line(),
                            })
                        }
                    }
                    bound.push((param.name.clone(), Entry::alias(desc, scope, owned)));
                }
            }
        }

        self.scopes.push_frame(sub.defined_in);
        self.call_depth += 1;
        let result = self.run_subroutine_body(sub, bound, line);
        self.call_depth -= 1;
        self.scopes.pop_frame();
        result
    }

    fn run_subroutine_body(
        &mut self,
        sub: &Subroutine,
        bound: Vec<(String, Entry)>,
        line: usize,
    ) -> RuntimeResult<Option<Value>> {
        for (name, entry) in bound {
            self.scopes
                .declare(&name, Binding::Variable(entry), sub.line)?;
        }
        for stmt in &sub.body {
            self.execute_stmt(stmt)?;
            if !matches!(self.signal, Signal::None) {
                break;
            }
        }
        let signal = std::mem::replace(&mut self.signal, Signal::None);
        match signal {
            Signal::Return(Some(value)) => match &sub.returns {
                Some(returns) => {
                    let desc = self.resolve_type(returns, line)?;
                    let template = default_value(&desc);
                    Ok(Some(coerce(value, &template, line)?))
                }
                None => Err(RuntimeError::Unsupported {
                    message: format!("procedure '{}' cannot RETURN a value", sub.name),
                    line,
                }),
            },
            Signal::Return(None) | Signal::None => Ok(None),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_value(value)),

            Expr::Identifier { name, line } => self.scopes.read(name, *line),

            Expr::Unary {
                operator,
                operand,
                line,
            } => {
                let value = self.eval_expr(operand)?;
                eval_unary(*operator, value, *line)
            }

            Expr::Binary {
                left,
                operator,
                right,
                line,
            } => {
                if matches!(operator, BinaryOp::And | BinaryOp::Or) {
                    return self.eval_logical(left, *operator, right);
                }
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                eval_binary(left, *operator, right, *line)
            }

            Expr::ArrayAccess {
                array,
                indices,
                line,
            } => {
                let base = self.eval_expr(array)?;
                let mut evaluated = Vec::with_capacity(indices.len());
                for index in indices {
                    evaluated.push(self.integer_value(index, "an INTEGER index")?);
                }
                match base {
                    Value::Array(values) => {
                        if evaluated.len() != values.dims.len() {
                            return Err(index_count_mismatch(&values, evaluated.len(), *line));
                        }
                        match values.offset(&evaluated) {
                            Ok(offset) => Ok(values.elements[offset].clone()),
                            Err((index, lower, upper)) => Err(RuntimeError::IndexOutOfBounds {
                                name: root_name(array),
                                index,
                                lower,
                                upper,
                                line: *line,
                            }),
                        }
                    }
                    other => Err(RuntimeError::TypeMismatch {
                        expected: "an ARRAY".to_string(),
                        got: other.type_name().to_string(),
                        line: *line,
                    }),
                }
            }

            Expr::RecordAccess {
                record,
                field,
                line,
            } => {
                let base = self.eval_expr(record)?;
                match base {
                    Value::Record(value) => match value.field(field) {
                        Some(field_value) => Ok(field_value.clone()),
                        None => Err(RuntimeError::InvalidFieldAccess {
                            type_name: value.type_name.clone(),
                            field: field.clone(),
                            line: *line,
                        }),
                    },
                    other => Err(RuntimeError::InvalidFieldAccess {
                        type_name: other.type_name().to_string(),
                        field: field.clone(),
                        line: *line,
                    }),
                }
            }

            Expr::Call { name, args, line } => self.eval_call(name, args, *line),

            Expr::EofCheck { filename, line } => {
                let filename = self.filename_value(filename)?;
                self.files.eof(&filename, *line).map(Value::Boolean)
            }
        }
    }

    fn eval_logical(
        &mut self,
        left: &Expr,
        operator: BinaryOp,
        right: &Expr,
    ) -> RuntimeResult<Value> {
        let left = self.boolean_value(left)?;
        match operator {
            BinaryOp::And if !left => Ok(Value::Boolean(false)),
            BinaryOp::Or if left => Ok(Value::Boolean(true)),
            _ => Ok(Value::Boolean(self.boolean_value(right)?)),
        }
    }

    fn eval_call(&mut self, name: &str, args: &[Expr], line: usize) -> RuntimeResult<Value> {
        let sub = match self.scopes.lookup(name) {
            Some(Binding::Subroutine(sub)) => Some(Rc::clone(sub)),
            Some(other) => {
                return Err(RuntimeError::Unsupported {
                    message: format!("'{}' is {} and cannot be called", name, other.describe()),
                    line,
                })
            }
            None => None,
        };
        match sub {
            Some(sub) if sub.is_function() => match self.call_subroutine(&sub, args, line)? {
                Some(value) => Ok(value),
                None => Err(RuntimeError::MissingReturn {
                    name: name.to_string(),
                    line,
                }),
            },
            Some(_) => Err(RuntimeError::Unsupported {
                message: format!("'{}' is a procedure; call it with CALL", name),
                line,
            }),
            None => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                match builtins::call(name, &values, &mut self.prng, line) {
                    Some(result) => result,
                    None => Err(RuntimeError::NotDeclared {
                        name: name.to_string(),
                        line,
                    }),
                }
            }
        }
    }

    fn assign(&mut self, target: &Expr, value: Value, line: usize) -> RuntimeResult<()> {
        let destination = self.destination_mut(target)?;
        let coerced = coerce(value, destination, line)?;
        *destination = coerced;
        Ok(())
    }

    /// Mutable access to the storage a target expression names.
    /// Indices evaluate before the walk down into the value.
    fn destination_mut(&mut self, target: &Expr) -> RuntimeResult<&mut Value> {
        let (root, line, steps) = self.target_path(target)?;
        let mut value = self.scopes.value_mut(&root, line)?;
        for step in &steps {
            value = apply_step(value, step, &root)?;
        }
        Ok(value)
    }

    fn target_path(&mut self, target: &Expr) -> RuntimeResult<(String, usize, Vec<PathStep>)> {
        match target {
            Expr::Identifier { name, line } => Ok((name.clone(), *line, Vec::new())),
            Expr::ArrayAccess {
                array,
                indices,
                line,
            } => {
                let (root, root_line, mut steps) = self.target_path(array)?;
                let mut evaluated = Vec::with_capacity(indices.len());
                for index in indices {
                    evaluated.push(self.integer_value(index, "an INTEGER index")?);
                }
                steps.push(PathStep::Index {
                    indices: evaluated,
                    line: *line,
                });
                Ok((root, root_line, steps))
            }
            Expr::RecordAccess {
                record,
                field,
                line,
            } => {
                let (root, root_line, mut steps) = self.target_path(record)?;
                steps.push(PathStep::Field {
                    name: field.clone(),
                    line: *line,
                });
                Ok((root, root_line, steps))
            }
            other => Err(RuntimeError::Unsupported {
                message: "this expression cannot be assigned to".to_string(),
                line: other.line(),
            }),
        }
    }

    /// Resolves a written type to a concrete one, evaluating array
    /// bounds now
    fn resolve_type(&mut self, type_name: &TypeName, line: usize) -> RuntimeResult<TypeDesc> {
        Ok(match type_name {
            TypeName::Integer => TypeDesc::Integer,
            TypeName::Real => TypeDesc::Real,
            TypeName::String => TypeDesc::Str,
            TypeName::Char => TypeDesc::Char,
            TypeName::Boolean => TypeDesc::Boolean,
            TypeName::Date => TypeDesc::Date,
            TypeName::Array { dims, elem } => {
                let mut resolved = Vec::with_capacity(dims.len());
                let mut size: i64 = 1;
                for (lower, upper) in dims {
                    let lower = self.integer_value(lower, "an INTEGER bound")?;
                    let upper = self.integer_value(upper, "an INTEGER bound")?;
                    if lower > upper {
                        return Err(RuntimeError::Unsupported {
                            message: format!("array bounds {}:{} are reversed", lower, upper),
                            line,
                        });
                    }
                    let span = match upper.checked_sub(lower).and_then(|d| d.checked_add(1)) {
                        Some(span) => span,
                        None => return Err(array_too_large(line)),
                    };
                    size = match size.checked_mul(span) {
                        Some(size) if size <= MAX_ARRAY_ELEMENTS => size,
                        _ => return Err(array_too_large(line)),
                    };
                    resolved.push((lower, upper));
                }
                TypeDesc::Array {
                    dims: resolved,
                    elem: Box::new(self.resolve_type(elem, line)?),
                }
            }
            TypeName::Named(name) => match self.scopes.lookup(name) {
                Some(Binding::RecordType(data)) => TypeDesc::Record(Rc::clone(data)),
                Some(other) => {
                    return Err(RuntimeError::TypeMismatch {
                        expected: "a record type".to_string(),
                        got: format!("{} '{}'", other.describe(), name),
                        line,
                    })
                }
                None => {
                    return Err(RuntimeError::NotDeclared {
                        name: name.clone(),
                        line,
                    })
                }
            },
        })
    }

    /// The concrete type of a value, for CONSTANT declarations
    fn desc_of(&self, value: &Value, line: usize) -> RuntimeResult<TypeDesc> {
        Ok(match value {
            Value::Integer(_) => TypeDesc::Integer,
            Value::Real(_) => TypeDesc::Real,
            Value::Str(_) => TypeDesc::Str,
            Value::Char(_) => TypeDesc::Char,
            Value::Boolean(_) => TypeDesc::Boolean,
            Value::Date(_) => TypeDesc::Date,
            Value::Array(array) => {
                let elem = match array.elements.first() {
                    Some(first) => self.desc_of(first, line)?,
                    None => TypeDesc::Integer,
                };
                TypeDesc::Array {
                    dims: array.dims.clone(),
                    elem: Box::new(elem),
                }
            }
            Value::Record(record) => match self.scopes.lookup(&record.type_name) {
                Some(Binding::RecordType(data)) => TypeDesc::Record(Rc::clone(data)),
                _ => {
                    return Err(RuntimeError::NotDeclared {
                        name: record.type_name.clone(),
                        line,
                    })
                }
            },
        })
    }

    fn boolean_value(&mut self, expr: &Expr) -> RuntimeResult<bool> {
        match self.eval_expr(expr)? {
            Value::Boolean(b) => Ok(b),
            other => Err(RuntimeError::TypeMismatch {
                expected: "a BOOLEAN".to_string(),
                got: other.type_name().to_string(),
                line: expr.line(),
            }),
        }
    }

    fn integer_value(&mut self, expr: &Expr, what: &str) -> RuntimeResult<i64> {
        match self.eval_expr(expr)? {
            Value::Integer(n) => Ok(n),
            other => Err(RuntimeError::TypeMismatch {
                expected: what.to_string(),
                got: other.type_name().to_string(),
                line: expr.line(),
            }),
        }
    }

    fn filename_value(&mut self, expr: &Expr) -> RuntimeResult<String> {
        match self.eval_expr(expr)? {
            Value::Str(s) => Ok(s),
            Value::Char(c) => Ok(c.to_string()),
            other => Err(RuntimeError::TypeMismatch {
                expected: "a STRING filename".to_string(),
                got: other.type_name().to_string(),
                line: expr.line(),
            }),
        }
    }

    fn loop_variable(&mut self, name: &str, line: usize) -> RuntimeResult<i64> {
        match self.scopes.read(name, line)? {
            Value::Integer(n) => Ok(n),
            other => Err(RuntimeError::TypeMismatch {
                expected: "an INTEGER loop variable".to_string(),
                got: other.type_name().to_string(),
                line,
            }),
        }
    }

    /// FOR control variables spring into being as INTEGERs when no
    /// declaration exists yet, and stay visible after the loop
    fn set_loop_variable(&mut self, name: &str, value: i64, line: usize) -> RuntimeResult<()> {
        if self.scopes.lookup(name).is_none() {
            let entry = Entry::owned(TypeDesc::Integer, Value::Integer(value), false);
            return self.scopes.declare(name, Binding::Variable(entry), line);
        }
        let destination = self.scopes.value_mut(name, line)?;
        let coerced = coerce(Value::Integer(value), destination, line)?;
        *destination = coerced;
        Ok(())
    }
}

enum PathStep {
    Index { indices: Vec<i64>, line: usize },
    Field { name: String, line: usize },
}

fn apply_step<'v>(value: &'v mut Value, step: &PathStep, root: &str) -> RuntimeResult<&'v mut Value> {
    match step {
        PathStep::Index { indices, line } => match value {
            Value::Array(array) => {
                if indices.len() != array.dims.len() {
                    return Err(index_count_mismatch(array, indices.len(), *line));
                }
                match array.offset(indices) {
                    Ok(offset) => Ok(&mut array.elements[offset]),
                    Err((index, lower, upper)) => Err(RuntimeError::IndexOutOfBounds {
                        name: root.to_string(),
                        index,
                        lower,
                        upper,
                        line: *line,
                    }),
                }
            }
            other => Err(RuntimeError::TypeMismatch {
                expected: "an ARRAY".to_string(),
                got: other.type_name().to_string(),
                line: *line,
            }),
        },
        PathStep::Field { name, line } => match value {
            Value::Record(record) => {
                let type_name = record.type_name.clone();
                match record.field_mut(name) {
                    Some(field) => Ok(field),
                    None => Err(RuntimeError::InvalidFieldAccess {
                        type_name,
                        field: name.clone(),
                        line: *line,
                    }),
                }
            }
            other => Err(RuntimeError::InvalidFieldAccess {
                type_name: other.type_name().to_string(),
                field: name.clone(),
                line: *line,
            }),
        },
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Integer(n) => Value::Integer(*n),
        Literal::Real(x) => Value::Real(*x),
        Literal::Str(s) => Value::Str(s.clone()),
        Literal::Char(c) => Value::Char(*c),
        Literal::Boolean(b) => Value::Boolean(*b),
    }
}

fn eval_unary(operator: UnaryOp, value: Value, line: usize) -> RuntimeResult<Value> {
    match operator {
        UnaryOp::Negate => match value {
            Value::Integer(n) => match n.checked_neg() {
                Some(negated) => Ok(Value::Integer(negated)),
                None => Err(RuntimeError::IntegerOverflow { line }),
            },
            Value::Real(x) => Ok(Value::Real(-x)),
            other => Err(RuntimeError::TypeMismatch {
                expected: "a number".to_string(),
                got: other.type_name().to_string(),
                line,
            }),
        },
        UnaryOp::Not => match value {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            other => Err(RuntimeError::TypeMismatch {
                expected: "a BOOLEAN".to_string(),
                got: other.type_name().to_string(),
                line,
            }),
        },
    }
}

fn eval_binary(left: Value, operator: BinaryOp, right: Value, line: usize) -> RuntimeResult<Value> {
    match operator {
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply => {
            arithmetic(left, operator, right, line)
        }
        BinaryOp::Divide => divide(left, right, line),
        BinaryOp::IntDivide | BinaryOp::Modulo => integer_division(left, operator, right, line),
        BinaryOp::Concat => concat(left, right, line),
        BinaryOp::Equal => Ok(Value::Boolean(values_equal(&left, &right, line)?)),
        BinaryOp::NotEqual => Ok(Value::Boolean(!values_equal(&left, &right, line)?)),
        BinaryOp::Less => Ok(Value::Boolean(
            values_compare(&left, &right, line)? == Ordering::Less,
        )),
        BinaryOp::LessEqual => Ok(Value::Boolean(
            values_compare(&left, &right, line)? != Ordering::Greater,
        )),
        BinaryOp::Greater => Ok(Value::Boolean(
            values_compare(&left, &right, line)? == Ordering::Greater,
        )),
        BinaryOp::GreaterEqual => Ok(Value::Boolean(
            values_compare(&left, &right, line)? != Ordering::Less,
        )),
        BinaryOp::And | BinaryOp::Or => match (left, right) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(
                if operator == BinaryOp::And {
                    a && b
                } else {
                    a || b
                },
            )),
            (Value::Boolean(_), other) | (other, _) => Err(RuntimeError::TypeMismatch {
                expected: "a BOOLEAN".to_string(),
                got: other.type_name().to_string(),
                line,
            }),
        },
    }
}

fn arithmetic(left: Value, operator: BinaryOp, right: Value, line: usize) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            let result = match operator {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            match result {
                Some(n) => Ok(Value::Integer(n)),
                None => Err(RuntimeError::IntegerOverflow { line }),
            }
        }
        (left, right) => {
            let (x, y) = number_pair(left, right, operator, line)?;
            Ok(Value::Real(match operator {
                BinaryOp::Add => x + y,
                BinaryOp::Subtract => x - y,
                _ => x * y,
            }))
        }
    }
}

/// `/` always yields a REAL, even for two INTEGER operands
fn divide(left: Value, right: Value, line: usize) -> RuntimeResult<Value> {
    let (x, y) = number_pair(left, right, BinaryOp::Divide, line)?;
    if y == 0.0 {
        return Err(RuntimeError::DivisionByZero { line });
    }
    Ok(Value::Real(x / y))
}

/// DIV and MOD on INTEGERs with floor semantics: the quotient rounds
/// toward negative infinity and the remainder takes the divisor's sign
fn integer_division(
    left: Value,
    operator: BinaryOp,
    right: Value,
    line: usize,
) -> RuntimeResult<Value> {
    let (a, b) = match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => (*a, *b),
        _ => {
            return Err(RuntimeError::TypeMismatch {
                expected: format!("INTEGER operands for {}", operator),
                got: format!("{} and {}", left.type_name(), right.type_name()),
                line,
            })
        }
    };
    if b == 0 {
        return Err(RuntimeError::DivisionByZero { line });
    }
    let quotient = match a.checked_div(b) {
        Some(q) => q,
        None => return Err(RuntimeError::IntegerOverflow { line }),
    };
    let remainder = a % b;
    let (quotient, remainder) = if remainder != 0 && (remainder < 0) != (b < 0) {
        (quotient - 1, remainder + b)
    } else {
        (quotient, remainder)
    };
    Ok(match operator {
        BinaryOp::IntDivide => Value::Integer(quotient),
        _ => Value::Integer(remainder),
    })
}

fn concat(left: Value, right: Value, line: usize) -> RuntimeResult<Value> {
    match (as_text(&left), as_text(&right)) {
        (Some(a), Some(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        _ => Err(RuntimeError::TypeMismatch {
            expected: "text on both sides of &".to_string(),
            got: format!("{} and {}", left.type_name(), right.type_name()),
            line,
        }),
    }
}

fn number_pair(
    left: Value,
    right: Value,
    operator: BinaryOp,
    line: usize,
) -> RuntimeResult<(f64, f64)> {
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => Ok((*a as f64, *b as f64)),
        (Value::Integer(a), Value::Real(b)) => Ok((*a as f64, *b)),
        (Value::Real(a), Value::Integer(b)) => Ok((*a, *b as f64)),
        (Value::Real(a), Value::Real(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::TypeMismatch {
            expected: format!("numbers on both sides of {}", operator),
            got: format!("{} and {}", left.type_name(), right.type_name()),
            line,
        }),
    }
}

/// Equality crosses INTEGER and REAL; CHAR and STRING compare as text
fn values_equal(a: &Value, b: &Value, line: usize) -> RuntimeResult<bool> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(x == y),
        (Value::Real(x), Value::Real(y)) => Ok(x == y),
        (Value::Integer(x), Value::Real(y)) => Ok(*x as f64 == *y),
        (Value::Real(x), Value::Integer(y)) => Ok(*x == *y as f64),
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x == y),
        (Value::Date(x), Value::Date(y)) => Ok(x == y),
        (Value::Str(_) | Value::Char(_), Value::Str(_) | Value::Char(_)) => {
            Ok(as_text(a) == as_text(b))
        }
        _ => Err(comparison_mismatch(a, b, line)),
    }
}

fn values_compare(a: &Value, b: &Value, line: usize) -> RuntimeResult<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(x.cmp(y)),
        (Value::Real(x), Value::Real(y)) => Ok(x.partial_cmp(y).unwrap_or(Ordering::Equal)),
        (Value::Integer(x), Value::Real(y)) => {
            Ok((*x as f64).partial_cmp(y).unwrap_or(Ordering::Equal))
        }
        (Value::Real(x), Value::Integer(y)) => {
            Ok(x.partial_cmp(&(*y as f64)).unwrap_or(Ordering::Equal))
        }
        (Value::Date(x), Value::Date(y)) => Ok(x.cmp(y)),
        (Value::Str(_) | Value::Char(_), Value::Str(_) | Value::Char(_)) => {
            Ok(as_text(a).cmp(&as_text(b)))
        }
        _ => Err(comparison_mismatch(a, b, line)),
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Char(c) => Some(c.to_string()),
        _ => None,
    }
}

fn comparison_mismatch(a: &Value, b: &Value, line: usize) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: "two comparable values of the same type".to_string(),
        got: format!("{} and {}", a.type_name(), b.type_name()),
        line,
    }
}

fn index_count_mismatch(array: &ArrayValue, got: usize, line: usize) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected: if array.dims.len() == 1 {
            "1 index".to_string()
        } else {
            format!("{} indices", array.dims.len())
        },
        got: got.to_string(),
        line,
    }
}

fn root_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier { name, .. } => name.clone(),
        Expr::ArrayAccess { array, .. } => root_name(array),
        Expr::RecordAccess { record, .. } => root_name(record),
        _ => "array".to_string(),
    }
}

fn array_too_large(line: usize) -> RuntimeError {
    RuntimeError::Unsupported {
        message: format!("array would exceed {} elements", MAX_ARRAY_ELEMENTS),
        line,
    }
}

fn parse_input(text: &str, template: &Value, line: usize) -> RuntimeResult<Value> {
    let invalid = |expected: &str| RuntimeError::InvalidInput {
        expected: expected.to_string(),
        text: text.to_string(),
        line,
    };
    match template {
        Value::Integer(_) => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid("INTEGER")),
        Value::Real(_) => text
            .trim()
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| invalid("REAL")),
        Value::Str(_) => Ok(Value::Str(text.to_string())),
        Value::Char(_) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err(invalid("CHAR")),
            }
        }
        Value::Boolean(_) => {
            let trimmed = text.trim();
            if trimmed.eq_ignore_ascii_case("TRUE") {
                Ok(Value::Boolean(true))
            } else if trimmed.eq_ignore_ascii_case("FALSE") {
                Ok(Value::Boolean(false))
            } else {
                Err(invalid("BOOLEAN"))
            }
        }
        Value::Date(_) => match DateValue::parse(text.trim()) {
            Some(date) => Ok(Value::Date(date)),
            None => Err(invalid("DATE")),
        },
        Value::Array(_) | Value::Record(_) => Err(RuntimeError::Unsupported {
            message: format!("cannot INPUT a whole {}", template.type_name()),
            line,
        }),
    }
}
