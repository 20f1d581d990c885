//! Formula parsing errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FormulaError>;

/// Errors localized to one formula; the run skips the formula and carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("unbalanced parentheses in aggregate call starting at byte {pos}")]
    UnbalancedParens { pos: usize },
}
