//! Runtime module
//!
//! Values, scopes, the in-memory file store, built-in functions and the
//! tree-walking interpreter that executes parsed programs.

pub mod builtins;
pub mod files;
pub mod interpreter;
pub mod scope;
pub mod value;

pub use builtins::Prng;
pub use files::FileTable;
pub use interpreter::Interpreter;
pub use scope::{Binding, Entry, Slot, Subroutine, SymbolTable};
pub use value::{
    coerce, default_value, ArrayValue, DateValue, RecordTypeData, RecordValue, TypeDesc, Value,
};
