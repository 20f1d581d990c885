//! Evaluator errors.
//!
//! Every variant is instance-scoped: the owning run records the message
//! against the one formula/instance pair and keeps going.

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("blocked construct: {construct}")]
    Blocked { construct: String },

    #[error("unknown symbol: {name}")]
    UnknownSymbol { name: String },

    #[error("evaluation exceeded {limit:?}")]
    Timeout { limit: Duration },

    #[error("division by zero")]
    DivisionByZero,

    #[error("{function} expects {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    #[error("numeric error: {message}")]
    Numeric { message: String },
}

impl EvalError {
    pub fn blocked(construct: impl Into<String>) -> Self {
        EvalError::Blocked {
            construct: construct.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        EvalError::Numeric {
            message: message.into(),
        }
    }
}
