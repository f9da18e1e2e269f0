//! Lexically scoped symbol table
//!
//! One namespace holds variables, constants, procedures, functions and
//! record types. Call frames chain to the scope their subroutine was
//! defined in, not to the caller, and a BYREF parameter is an alias
//! slot that resolves to the variable that owns the storage.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeResult};
use crate::parser::{Param, Stmt, TypeName};
use crate::runtime::value::{RecordTypeData, TypeDesc, Value};

/// A PROCEDURE or FUNCTION captured at its definition
#[derive(Debug)]
pub struct Subroutine {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: Option<TypeName>,
    pub body: Vec<Stmt>,
    /// Index of the scope the definition ran in; call frames chain here
    pub defined_in: usize,
    pub line: usize,
}

impl Subroutine {
    pub fn is_function(&self) -> bool {
        self.returns.is_some()
    }
}

/// What a name is bound to
#[derive(Debug)]
pub enum Binding {
    Variable(Entry),
    Subroutine(Rc<Subroutine>),
    RecordType(Rc<RecordTypeData>),
}

impl Binding {
    pub fn describe(&self) -> &'static str {
        match self {
            Binding::Variable(_) => "a variable",
            Binding::Subroutine(sub) if sub.is_function() => "a function",
            Binding::Subroutine(_) => "a procedure",
            Binding::RecordType(_) => "a type",
        }
    }
}

/// A variable or constant binding
#[derive(Debug)]
pub struct Entry {
    pub type_desc: TypeDesc,
    pub constant: bool,
    pub slot: Slot,
}

impl Entry {
    pub fn owned(type_desc: TypeDesc, value: Value, constant: bool) -> Self {
        Self {
            type_desc,
            constant,
            slot: Slot::Owned(value),
        }
    }

    pub fn alias(type_desc: TypeDesc, scope: usize, name: String) -> Self {
        Self {
            type_desc,
            constant: false,
            slot: Slot::Alias { scope, name },
        }
    }
}

/// Where a binding's value lives
#[derive(Debug)]
pub enum Slot {
    Owned(Value),
    Alias { scope: usize, name: String },
}

#[derive(Debug)]
struct Scope {
    bindings: HashMap<String, Binding>,
    parent: Option<usize>,
}

/// The scope stack. Index 0 is the global scope and is never popped.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                bindings: HashMap::new(),
                parent: None,
            }],
        }
    }

    pub fn current_index(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn push_frame(&mut self, parent: usize) {
        self.scopes.push(Scope {
            bindings: HashMap::new(),
            parent: Some(parent),
        });
    }

    pub fn pop_frame(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Binds a name in the innermost scope
    pub fn declare(&mut self, name: &str, binding: Binding, line: usize) -> RuntimeResult<()> {
        let index = self.current_index();
        let scope = &mut self.scopes[index];
        if scope.bindings.contains_key(name) {
            return Err(RuntimeError::DuplicateDeclaration {
                name: name.to_string(),
                line,
            });
        }
        scope.bindings.insert(name.to_string(), binding);
        Ok(())
    }

    /// The innermost binding for a name, walking the parent chain
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.find(name).map(|(_, binding)| binding)
    }

    fn find(&self, name: &str) -> Option<(usize, &Binding)> {
        let mut index = self.current_index();
        loop {
            let scope = &self.scopes[index];
            if let Some(binding) = scope.bindings.get(name) {
                return Some((index, binding));
            }
            index = scope.parent?;
        }
    }

    /// A copy of a variable's value, read through any alias links
    pub fn read(&self, name: &str, line: usize) -> RuntimeResult<Value> {
        let (scope, owned) = self.owner_position(name, line)?;
        match self.entry_at(scope, &owned).map(|entry| &entry.slot) {
            Some(Slot::Owned(value)) => Ok(value.clone()),
            _ => Err(RuntimeError::NotDeclared {
                name: name.to_string(),
                line,
            }),
        }
    }

    /// Mutable access to a variable's storage, for assignment, INPUT
    /// and READFILE targets
    pub fn value_mut(&mut self, name: &str, line: usize) -> RuntimeResult<&mut Value> {
        let (scope, owned) = self.writable_owner(name, line)?;
        match self
            .scopes
            .get_mut(scope)
            .and_then(|s| s.bindings.get_mut(&owned))
        {
            Some(Binding::Variable(Entry {
                slot: Slot::Owned(value),
                ..
            })) => Ok(value),
            _ => Err(RuntimeError::NotDeclared { name: owned, line }),
        }
    }

    /// The scope index and name of the slot that owns a variable's
    /// storage. Alias links are flattened when created, so the walk is
    /// short, but chains are followed all the way regardless.
    pub fn owner_position(&self, name: &str, line: usize) -> RuntimeResult<(usize, String)> {
        let (mut scope, binding) = self.find(name).ok_or_else(|| RuntimeError::NotDeclared {
            name: name.to_string(),
            line,
        })?;
        let mut entry = match binding {
            Binding::Variable(entry) => entry,
            other => return Err(Self::not_a_variable(name, other, line)),
        };
        let mut owned = name.to_string();
        loop {
            match &entry.slot {
                Slot::Owned(_) => return Ok((scope, owned)),
                Slot::Alias {
                    scope: target_scope,
                    name: target_name,
                } => {
                    scope = *target_scope;
                    owned = target_name.clone();
                    entry = match self.scopes.get(scope).and_then(|s| s.bindings.get(&owned)) {
                        Some(Binding::Variable(entry)) => entry,
                        _ => return Err(RuntimeError::NotDeclared { name: owned, line }),
                    };
                }
            }
        }
    }

    pub fn entry_at(&self, scope: usize, name: &str) -> Option<&Entry> {
        match self.scopes.get(scope)?.bindings.get(name)? {
            Binding::Variable(entry) => Some(entry),
            _ => None,
        }
    }

    fn writable_owner(&self, name: &str, line: usize) -> RuntimeResult<(usize, String)> {
        if let Some((_, Binding::Variable(entry))) = self.find(name) {
            if entry.constant {
                return Err(RuntimeError::ConstantReassignment {
                    name: name.to_string(),
                    line,
                });
            }
        }
        let (scope, owned) = self.owner_position(name, line)?;
        if let Some(entry) = self.entry_at(scope, &owned) {
            if entry.constant {
                return Err(RuntimeError::ConstantReassignment {
                    name: name.to_string(),
                    line,
                });
            }
        }
        Ok((scope, owned))
    }

    fn not_a_variable(name: &str, binding: &Binding, line: usize) -> RuntimeError {
        RuntimeError::Unsupported {
            message: format!("'{}' is {}, not a variable", name, binding.describe()),
            line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(value: Value) -> Binding {
        let desc = match &value {
            Value::Integer(_) => TypeDesc::Integer,
            Value::Str(_) => TypeDesc::Str,
            _ => TypeDesc::Boolean,
        };
        Binding::Variable(Entry::owned(desc, value, false))
    }

    #[test]
    fn test_declare_and_read() {
        let mut table = SymbolTable::new();
        table.declare("x", plain(Value::Integer(5)), 1).unwrap();
        assert_eq!(table.read("x", 2), Ok(Value::Integer(5)));
    }

    #[test]
    fn test_duplicate_declaration_in_same_scope() {
        let mut table = SymbolTable::new();
        table.declare("x", plain(Value::Integer(1)), 1).unwrap();
        assert_eq!(
            table.declare("x", plain(Value::Integer(2)), 2),
            Err(RuntimeError::DuplicateDeclaration {
                name: "x".into(),
                line: 2
            })
        );
    }

    #[test]
    fn test_shadowing_inside_a_frame() {
        let mut table = SymbolTable::new();
        table.declare("x", plain(Value::Integer(1)), 1).unwrap();
        table.push_frame(0);
        table.declare("x", plain(Value::Integer(2)), 2).unwrap();
        assert_eq!(table.read("x", 3), Ok(Value::Integer(2)));
        table.pop_frame();
        assert_eq!(table.read("x", 4), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_frames_chain_to_the_defining_scope_not_the_caller() {
        let mut table = SymbolTable::new();
        table.declare("g", plain(Value::Integer(10)), 1).unwrap();
        table.push_frame(0);
        table.declare("local", plain(Value::Integer(1)), 2).unwrap();
        table.push_frame(0);
        assert_eq!(table.read("g", 3), Ok(Value::Integer(10)));
        assert_eq!(
            table.read("local", 3),
            Err(RuntimeError::NotDeclared {
                name: "local".into(),
                line: 3
            })
        );
    }

    #[test]
    fn test_constant_rejects_writes() {
        let mut table = SymbolTable::new();
        let binding = Binding::Variable(Entry::owned(TypeDesc::Integer, Value::Integer(3), true));
        table.declare("Max", binding, 1).unwrap();
        assert_eq!(
            table.value_mut("Max", 2).unwrap_err(),
            RuntimeError::ConstantReassignment {
                name: "Max".into(),
                line: 2
            }
        );
    }

    #[test]
    fn test_alias_reads_and_writes_the_owner() {
        let mut table = SymbolTable::new();
        table.declare("x", plain(Value::Integer(1)), 1).unwrap();
        table.push_frame(0);
        let alias = Binding::Variable(Entry::alias(TypeDesc::Integer, 0, "x".into()));
        table.declare("p", alias, 2).unwrap();
        assert_eq!(table.read("p", 3), Ok(Value::Integer(1)));
        *table.value_mut("p", 4).unwrap() = Value::Integer(9);
        table.pop_frame();
        assert_eq!(table.read("x", 5), Ok(Value::Integer(9)));
    }

    #[test]
    fn test_alias_chains_resolve_to_the_root() {
        let mut table = SymbolTable::new();
        table.declare("x", plain(Value::Integer(1)), 1).unwrap();
        table.push_frame(0);
        let first = Binding::Variable(Entry::alias(TypeDesc::Integer, 0, "x".into()));
        table.declare("p", first, 2).unwrap();
        table.push_frame(1);
        let second = Binding::Variable(Entry::alias(TypeDesc::Integer, 1, "p".into()));
        table.declare("q", second, 3).unwrap();
        assert_eq!(table.owner_position("q", 4), Ok((0, "x".into())));
        *table.value_mut("q", 5).unwrap() = Value::Integer(7);
        assert_eq!(table.read("x", 6), Ok(Value::Integer(7)));
    }

    #[test]
    fn test_not_declared() {
        let mut table = SymbolTable::new();
        assert_eq!(
            table.read("missing", 1),
            Err(RuntimeError::NotDeclared {
                name: "missing".into(),
                line: 1
            })
        );
        assert!(table.value_mut("missing", 2).is_err());
    }

    #[test]
    fn test_subroutine_name_is_not_a_variable() {
        let mut table = SymbolTable::new();
        let sub = Rc::new(Subroutine {
            name: "Show".into(),
            params: vec![],
            returns: None,
            body: vec![],
            defined_in: 0,
            line: 1,
        });
        table.declare("Show", Binding::Subroutine(sub), 1).unwrap();
        let err = table.read("Show", 2).unwrap_err();
        assert_eq!(
            err.message(),
            "'Show' is a procedure, not a variable".to_string()
        );
    }
}
