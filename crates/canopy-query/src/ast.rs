//! Filter expression AST.

use std::fmt;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
        };
        f.write_str(s)
    }
}

/// Positional selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Earliest field in document order.
    First,
    /// Latest field in document order.
    Last,
    /// Head after sorting by creation timestamp, descending.
    FirstByCreation,
    /// Head after sorting by creation timestamp, ascending.
    LastByCreation,
}

impl Selector {
    /// The function name as written in filter and return-path text.
    pub fn name(&self) -> &'static str {
        match self {
            Selector::First => "first",
            Selector::Last => "last",
            Selector::FirstByCreation => "firstc",
            Selector::LastByCreation => "lastc",
        }
    }

    pub fn from_name(name: &str) -> Option<Selector> {
        match name {
            "first" => Some(Selector::First),
            "last" => Some(Selector::Last),
            "firstc" => Some(Selector::FirstByCreation),
            "lastc" => Some(Selector::LastByCreation),
            _ => None,
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Or(Box<FilterExpr>, Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Compare {
        op: CompareOp,
        lhs: Box<FilterExpr>,
        rhs: Box<FilterExpr>,
    },
    /// Substring containment over the stringified operands.
    Contains(Box<FilterExpr>, Box<FilterExpr>),
    /// In a filter, true only for the extremal instance of `path`.
    Positional { selector: Selector, path: String },
    Ident(String),
    Number(i64),
    Str(String),
    Bool(bool),
}
