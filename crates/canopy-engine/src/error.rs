//! Run-fatal errors.
//!
//! Everything else in the pipeline degrades to per-instance outcomes;
//! only malformed input or missing configuration aborts a run.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("malformed tree: {0}")]
    MalformedTree(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),
}
