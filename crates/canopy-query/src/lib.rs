//! Canopy path-filter query language
//!
//! Tokenizes and parses filter expressions into an AST, evaluates the AST
//! against tree records, and exposes the scoped `filter` operation used by
//! the variable resolver.
//!
//! Supported operations:
//! - comparisons `== != >= <= > <`
//! - logical `and` / `or` (short-circuit, at the current record)
//! - `contains(x, y)` substring containment
//! - positional functions `first` / `last` (document order) and
//!   `firstc` / `lastc` (creation order)

pub mod ast;
pub mod error;
pub mod eval;
pub mod filter;
pub mod lexer;
pub mod parser;
pub mod search;

pub use ast::{CompareOp, FilterExpr, Selector};
pub use error::{QueryError, Result};
pub use eval::evaluate;
pub use filter::{QueryEngine, QueryHit};
pub use lexer::{lex, Token};
pub use parser::parse;
