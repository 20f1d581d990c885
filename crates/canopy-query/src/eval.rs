//! Filter expression evaluation against a single record.
//!
//! Identifier resolution is record-local: the record's own fields first,
//! then a tagged child group, then the descendants' fields. The
//! scope slice is only consulted by positional predicates, which test
//! whether the current record holds the extremal value.
//!
//! Comparisons fail closed: incompatible operand types compare false
//! instead of raising.

use canopy_tree::{TreeNode, Value};

use crate::ast::{CompareOp, FilterExpr};
use crate::search;

/// Evaluate a filter expression to a boolean at `record`.
pub fn evaluate(expr: &FilterExpr, record: &TreeNode, scope: &[&TreeNode]) -> bool {
    truthy(&eval_value(expr, record, scope))
}

/// Evaluate a sub-expression to a value.
pub fn eval_value(expr: &FilterExpr, record: &TreeNode, scope: &[&TreeNode]) -> Value {
    match expr {
        FilterExpr::Or(lhs, rhs) => {
            Value::Bool(evaluate(lhs, record, scope) || evaluate(rhs, record, scope))
        }
        FilterExpr::And(lhs, rhs) => {
            Value::Bool(evaluate(lhs, record, scope) && evaluate(rhs, record, scope))
        }
        FilterExpr::Compare { op, lhs, rhs } => {
            let lhs = eval_value(lhs, record, scope);
            let rhs = eval_value(rhs, record, scope);
            Value::Bool(compare(*op, &lhs, &rhs))
        }
        FilterExpr::Contains(haystack, needle) => {
            let haystack = eval_value(haystack, record, scope).to_string();
            let needle = eval_value(needle, record, scope).to_string();
            Value::Bool(!needle.is_empty() && haystack.contains(&needle))
        }
        FilterExpr::Positional { selector, path } => {
            // "is this record the extremal instance of `path`"
            let Some(extremal) = search::select_value(scope, path, *selector) else {
                return Value::Bool(false);
            };
            let own = resolve_ident(record, path);
            Value::Bool(compare(CompareOp::Eq, &own, &extremal))
        }
        FilterExpr::Ident(name) => resolve_ident(record, name),
        FilterExpr::Number(n) => Value::Number(*n as f64),
        FilterExpr::Str(s) => Value::Text(s.clone()),
        FilterExpr::Bool(b) => Value::Bool(*b),
    }
}

/// Resolve an identifier at a record: own fields, then a child group
/// tagged with the path, then the descendants' fields in document order.
/// The descent runs on a work stack so filter depth is bounded by the
/// tree size, not the call stack.
fn resolve_ident(record: &TreeNode, path: &str) -> Value {
    let mut stack = vec![record];
    while let Some(node) = stack.pop() {
        if let Some(field) = node.field(path) {
            return field.value_or_default();
        }
        for group in &node.children {
            if group.path == path {
                if let Some(field) = group.nodes.iter().flat_map(|n| n.fields.iter()).next() {
                    return field.value_or_default();
                }
            }
        }
        for group in node.children.iter().rev() {
            for child in group.nodes.iter().rev() {
                stack.push(child);
            }
        }
    }
    Value::Null
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        Value::Text(s) => !s.is_empty(),
        Value::Series(v) => !v.is_empty(),
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (numeric(lhs), numeric(rhs)) {
        return match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Ge => a >= b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Lt => a < b,
        };
    }
    if let (Value::Text(a), Value::Text(b)) = (lhs, rhs) {
        return match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Ge => a >= b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Lt => a < b,
        };
    }
    // incompatible operand types
    false
}

/// Numeric view of a value, accepting numeric-looking text.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) | Value::Bool(_) => value.as_number(),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
