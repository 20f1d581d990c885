//! Canopy sandboxed evaluator
//!
//! Evaluates rewritten formula text under a restricted expression grammar:
//! no imports, no attribute access, no definitions, no statements of any
//! kind. Only an allow-listed symbol table of arithmetic and aggregation
//! functions is callable, and every evaluation runs under a wall-clock
//! ceiling.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interp;
pub mod parser;
pub mod screen;
pub mod value;

pub use ast::{BinaryOp, CompareOp, Expr, UnaryOp};
pub use error::{EvalError, Result};
pub use interp::{Interpreter, Scope};
pub use parser::parse;
pub use value::EvalValue;
