//! Query errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors surfaced by the filter language.
///
/// A failed parse poisons only the expression being parsed; callers treat
/// the query as matching nothing and report the error per formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("unrecognized input at byte {pos}")]
    Lex { pos: usize },

    #[error("syntax error: {message}")]
    Syntax { message: String },

    #[error("unknown positional function: {name}")]
    UnknownSelector { name: String },
}

impl QueryError {
    pub fn syntax(message: impl Into<String>) -> Self {
        QueryError::Syntax {
            message: message.into(),
        }
    }
}
