//! Canopy formula engine
//!
//! Orchestrates the full pipeline: parse every formula once, level the
//! dependency graph, then per level resolve variables through the path
//! query language, evaluate instances in parallel in the sandbox, and
//! commit results into the tree for the next level to read.
//!
//! A run always terminates with one success-or-error outcome per
//! attempted formula×instance pair; only malformed input is fatal.

pub mod bind;
pub mod config;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod resolve;

pub use canopy_formula::{FormulaGroup, FormulaSpec, UpdateTarget};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use outcome::{FormulaOutcome, OutcomeStatus, RunReport};
