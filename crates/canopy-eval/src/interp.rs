//! The tree-walking interpreter.
//!
//! Each evaluation gets a fresh scope of bound names and runs under a
//! wall-clock deadline checked at every AST node. Scopes are never shared
//! across instances.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use crate::builtins;
use crate::error::{EvalError, Result};
use crate::parser::parse;
use crate::screen::screen;
use crate::value::EvalValue;

/// Bound names for one evaluation.
pub type Scope = HashMap<String, EvalValue>;

const DEFAULT_MAX_TIME: Duration = Duration::from_secs(5);

/// Sandboxed expression interpreter.
#[derive(Debug, Clone)]
pub struct Interpreter {
    max_time: Duration,
    strict: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Strict (read-only) interpreter with the default 5s ceiling.
    pub fn new() -> Self {
        Self {
            max_time: DEFAULT_MAX_TIME,
            strict: true,
        }
    }

    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    /// Allow assignment-shaped text through the screen.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Screen, parse, and evaluate `source` against `scope`.
    pub fn evaluate(&self, source: &str, scope: &Scope) -> Result<EvalValue> {
        screen(source, self.strict)?;
        let expr = parse(source)?;
        let deadline = Instant::now() + self.max_time;
        let result = self.eval(&expr, scope, deadline);
        trace!(source, ok = result.is_ok(), "evaluated");
        result
    }

    fn eval(&self, expr: &Expr, scope: &Scope, deadline: Instant) -> Result<EvalValue> {
        if Instant::now() >= deadline {
            return Err(EvalError::Timeout {
                limit: self.max_time,
            });
        }
        match expr {
            Expr::Number(n) => Ok(EvalValue::Number(*n)),
            Expr::Str(s) => Ok(EvalValue::Str(s.clone())),
            Expr::Bool(b) => Ok(EvalValue::Bool(*b)),
            Expr::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item, scope, deadline)?.as_number()?);
                }
                Ok(EvalValue::Array(out))
            }
            Expr::Name(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnknownSymbol { name: name.clone() }),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope, deadline)?;
                match op {
                    UnaryOp::Not => Ok(EvalValue::Bool(!value.truthy())),
                    UnaryOp::Neg => match value {
                        EvalValue::Array(v) => {
                            Ok(EvalValue::Array(v.into_iter().map(|n| -n).collect()))
                        }
                        other => Ok(EvalValue::Number(-other.as_number()?)),
                    },
                }
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => {
                    let lhs = self.eval(left, scope, deadline)?;
                    if !lhs.truthy() {
                        return Ok(EvalValue::Bool(false));
                    }
                    let rhs = self.eval(right, scope, deadline)?;
                    Ok(EvalValue::Bool(rhs.truthy()))
                }
                BinaryOp::Or => {
                    let lhs = self.eval(left, scope, deadline)?;
                    if lhs.truthy() {
                        return Ok(EvalValue::Bool(true));
                    }
                    let rhs = self.eval(right, scope, deadline)?;
                    Ok(EvalValue::Bool(rhs.truthy()))
                }
                _ => {
                    let lhs = self.eval(left, scope, deadline)?;
                    let rhs = self.eval(right, scope, deadline)?;
                    apply_binary(*op, &lhs, &rhs)
                }
            },
            Expr::Compare { op, left, right } => {
                let lhs = self.eval(left, scope, deadline)?;
                let rhs = self.eval(right, scope, deadline)?;
                compare(*op, &lhs, &rhs).map(EvalValue::Bool)
            }
            Expr::Call { name, args } => {
                let Some(builtin) = builtins::lookup(name) else {
                    return Err(EvalError::UnknownSymbol { name: name.clone() });
                };
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval(arg, scope, deadline)?);
                }
                builtin(&evaluated)
            }
            Expr::Conditional {
                then,
                cond,
                otherwise,
            } => {
                if self.eval(cond, scope, deadline)?.truthy() {
                    self.eval(then, scope, deadline)
                } else {
                    self.eval(otherwise, scope, deadline)
                }
            }
        }
    }
}

fn apply_binary(op: BinaryOp, lhs: &EvalValue, rhs: &EvalValue) -> Result<EvalValue> {
    if op == BinaryOp::Add {
        if let (EvalValue::Str(a), EvalValue::Str(b)) = (lhs, rhs) {
            return Ok(EvalValue::Str(format!("{a}{b}")));
        }
    }
    let apply = |a: f64, b: f64| -> Result<f64> {
        match op {
            BinaryOp::Add => Ok(a + b),
            BinaryOp::Sub => Ok(a - b),
            BinaryOp::Mul => Ok(a * b),
            BinaryOp::Div => {
                if b == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }
            BinaryOp::Mod => {
                if b == 0.0 {
                    Err(EvalError::DivisionByZero)
                } else {
                    Ok(a % b)
                }
            }
            BinaryOp::Pow => Ok(a.powf(b)),
            BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited by the caller"),
        }
    };
    match (lhs, rhs) {
        (EvalValue::Array(a), EvalValue::Array(b)) => {
            if a.len() != b.len() {
                return Err(EvalError::type_mismatch(format!(
                    "array lengths differ: {} vs {}",
                    a.len(),
                    b.len()
                )));
            }
            let out = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| apply(*x, *y))
                .collect::<Result<Vec<f64>>>()?;
            Ok(EvalValue::Array(out))
        }
        (EvalValue::Array(a), scalar) => {
            let b = scalar.as_number()?;
            let out = a.iter().map(|x| apply(*x, b)).collect::<Result<Vec<f64>>>()?;
            Ok(EvalValue::Array(out))
        }
        (scalar, EvalValue::Array(b)) => {
            let a = scalar.as_number()?;
            let out = b.iter().map(|y| apply(a, *y)).collect::<Result<Vec<f64>>>()?;
            Ok(EvalValue::Array(out))
        }
        (a, b) => Ok(EvalValue::Number(apply(a.as_number()?, b.as_number()?)?)),
    }
}

fn compare(op: CompareOp, lhs: &EvalValue, rhs: &EvalValue) -> Result<bool> {
    use std::cmp::Ordering;
    let ordering = match (lhs, rhs) {
        (EvalValue::Str(a), EvalValue::Str(b)) => Some(a.cmp(b)),
        (EvalValue::Array(a), EvalValue::Array(b)) => {
            // whole-array equality only
            return match op {
                CompareOp::Eq => Ok(a == b),
                CompareOp::Ne => Ok(a != b),
                _ => Err(EvalError::type_mismatch("ordering over arrays".to_string())),
            };
        }
        (EvalValue::Str(_), _) | (_, EvalValue::Str(_)) | (EvalValue::Array(_), _)
        | (_, EvalValue::Array(_)) => None,
        (a, b) => {
            let (a, b) = (a.as_number()?, b.as_number()?);
            Some(a.partial_cmp(&b).unwrap_or(Ordering::Less))
        }
    };
    let Some(ordering) = ordering else {
        // mixed types: equal never, unequal always, ordering is an error
        return match op {
            CompareOp::Eq => Ok(false),
            CompareOp::Ne => Ok(true),
            _ => Err(EvalError::type_mismatch(format!(
                "cannot order {} against {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        };
    };
    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Lt => ordering == Ordering::Less,
    })
}
