//! Runtime values inside the sandbox.

use std::fmt;

use crate::error::{EvalError, Result};

/// A value produced or consumed during evaluation.
///
/// Aggregate bindings arrive as `Array`; bare variable bindings as
/// scalars. Arrays hold plain numbers only.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Number(f64),
    Array(Vec<f64>),
    Str(String),
    Bool(bool),
}

impl EvalValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            EvalValue::Number(_) => "number",
            EvalValue::Array(_) => "array",
            EvalValue::Str(_) => "string",
            EvalValue::Bool(_) => "bool",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            EvalValue::Number(n) => *n != 0.0,
            EvalValue::Array(v) => !v.is_empty(),
            EvalValue::Str(s) => !s.is_empty(),
            EvalValue::Bool(b) => *b,
        }
    }

    pub fn as_number(&self) -> Result<f64> {
        match self {
            EvalValue::Number(n) => Ok(*n),
            EvalValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            other => Err(EvalError::type_mismatch(format!(
                "expected a number, got {}",
                other.type_name()
            ))),
        }
    }

    /// Numeric view: scalars become single-element arrays.
    pub fn as_array(&self) -> Result<Vec<f64>> {
        match self {
            EvalValue::Array(v) => Ok(v.clone()),
            EvalValue::Number(n) => Ok(vec![*n]),
            EvalValue::Bool(b) => Ok(vec![if *b { 1.0 } else { 0.0 }]),
            other => Err(EvalError::type_mismatch(format!(
                "expected numbers, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for EvalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalValue::Number(n) => write!(f, "{n}"),
            EvalValue::Str(s) => write!(f, "{s}"),
            EvalValue::Bool(b) => write!(f, "{b}"),
            EvalValue::Array(v) => {
                write!(f, "[")?;
                for (i, n) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{n}")?;
                }
                write!(f, "]")
            }
        }
    }
}
