//! Canopy formula parsing and scheduling
//!
//! Scans user-authored formula text for aggregate-function calls, extracts
//! the coded variable tokens they reference, and levels the resulting
//! dependency graph into execution groups the engine can run in order.

pub mod classify;
pub mod error;
pub mod extract;
pub mod filter_vars;
pub mod parser;
pub mod spec;

pub use classify::ExecutionClassifier;
pub use error::{FormulaError, Result};
pub use extract::extract_variables;
pub use parser::{FormulaConfig, FormulaParser};
pub use spec::{AggregateCall, FormulaGroup, FormulaSpec, ParsedFormula, UpdateTarget};
