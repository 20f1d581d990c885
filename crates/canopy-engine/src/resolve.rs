//! Variable resolution for one formula×instance pair.
//!
//! Aggregate calls resolve across the whole tree (global) or locked to
//! the instance's subtree (`_node`). Bare variables resolve record-first
//! with global fallback. Every resolved variable is substituted into the
//! formula text under a freshly minted bound name and bound in the scope
//! handed to the evaluator.

use canopy_eval::{EvalValue, Scope};
use canopy_formula::filter_vars;
use canopy_formula::ParsedFormula;
use canopy_query::QueryEngine;
use canopy_tree::{Tree, Value};
use tracing::trace;

use crate::bind::BindCounter;

/// Rewrite the formula for one instance and build its evaluation scope.
///
/// Errors are instance-scoped messages, recorded as a per-instance
/// outcome by the caller.
pub fn resolve(
    tree: &Tree,
    query: &mut QueryEngine,
    counter: &mut BindCounter,
    parsed: &ParsedFormula,
    formula_text: &str,
    record_id: &str,
) -> Result<(String, Scope), String> {
    let mut text = formula_text.trim();
    text = text.strip_prefix("return ").unwrap_or(text).trim();
    let mut text = text.to_string();
    let mut scope = Scope::new();

    for call in &parsed.aggr {
        let filter = match call.filter.as_deref() {
            Some(raw) => Some(resolve_filter_vars(tree, query, raw, record_id)?),
            None => None,
        };

        let mut eval_text = call.eval.clone();
        for var in &call.vars {
            let hits = if call.global {
                query
                    .filter(tree, &[var.clone()], None, filter.as_deref(), false)
            } else {
                query
                    .filter(tree, &[var.clone()], Some(record_id), filter.as_deref(), true)
            }
            .map_err(|e| e.to_string())?;

            let mut values: Vec<f64> = hits
                .iter()
                .find(|h| h.path == *var)
                .map(|h| numeric_values(&h.values))
                .unwrap_or_default();
            if values.is_empty() {
                // empty resolution binds a single-element zero array
                values.push(0.0);
            }
            let bound = counter.mint(var);
            eval_text = eval_text.replace(var.as_str(), &bound);
            scope.insert(bound, EvalValue::Array(values));
        }
        text = text.replace(&call.base, &eval_text);
    }

    for var in &parsed.vars {
        let hits = query
            .filter(
                tree,
                &[format!("first({var})")],
                Some(record_id),
                None,
                false,
            )
            .map_err(|e| e.to_string())?;
        let value = hits
            .first()
            .and_then(|h| h.values.first())
            .map(scalar_binding)
            .unwrap_or(EvalValue::Number(0.0));
        let bound = counter.mint(var);
        text = text.replace(var.as_str(), &bound);
        scope.insert(bound, value);
    }

    trace!(record_id, bound = scope.len(), "formula resolved");
    Ok((text, scope))
}

/// Substitute right-hand-side variable tokens in a filter with the
/// concrete values they hold at this record.
fn resolve_filter_vars(
    tree: &Tree,
    query: &mut QueryEngine,
    filter: &str,
    record_id: &str,
) -> Result<String, String> {
    let mut resolved = filter.to_string();
    for var in filter_vars::unique_rhs_vars(filter) {
        let hits = query
            .filter(
                tree,
                &[format!("first({var})")],
                Some(record_id),
                None,
                false,
            )
            .map_err(|e| e.to_string())?;
        let rendered = hits
            .first()
            .and_then(|h| h.values.first())
            .map(render_literal)
            .unwrap_or_else(|| "''".to_string());
        let highlighted = filter_vars::highlight(&resolved, &var);
        resolved = filter_vars::fill(&highlighted, &rendered);
    }
    Ok(resolved)
}

/// Numeric view of resolved values; non-numeric text is skipped.
fn numeric_values(values: &[Value]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::Number(n) => out.push(*n),
            Value::Bool(b) => out.push(if *b { 1.0 } else { 0.0 }),
            Value::Series(v) => out.extend(v.iter().copied()),
            Value::Text(s) => {
                if let Ok(n) = s.trim().parse::<f64>() {
                    out.push(n);
                }
            }
            Value::Null => {}
        }
    }
    out
}

/// A scalar binding for a bare variable; never an unbound null.
fn scalar_binding(value: &Value) -> EvalValue {
    match value {
        Value::Number(n) => EvalValue::Number(*n),
        Value::Bool(b) => EvalValue::Bool(*b),
        Value::Series(v) => EvalValue::Array(v.clone()),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) => EvalValue::Number(n),
            Err(_) => EvalValue::Str(s.clone()),
        },
        Value::Null => EvalValue::Number(0.0),
    }
}

/// Render a value as a filter-language literal, quoting non-numerics.
fn render_literal(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(_) => s.trim().to_string(),
            Err(_) => format!("'{s}'"),
        },
        Value::Null => "''".to_string(),
        Value::Series(_) => "''".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use canopy_formula::{FormulaConfig, FormulaParser};
    use canopy_tree::{ChildGroup, Field, FieldType, TreeNode};

    use super::*;

    fn leaf(id: &str, fields: &[(&str, Value)]) -> TreeNode {
        let mut node = TreeNode::new(id);
        for (path, value) in fields {
            let field_type = match value {
                Value::Number(_) => FieldType::Numeric,
                _ => FieldType::String,
            };
            node.fields.push(Field::new(*path, field_type, value.clone()));
        }
        node
    }

    fn tree() -> Tree {
        let mut root = TreeNode::new("ROOT");
        root.children.push(ChildGroup {
            path: "e00100v".to_string(),
            nodes: vec![
                leaf(
                    "VEH-1",
                    &[
                        ("e00001v", Value::Text("Automovel".to_string())),
                        ("e00002v", Value::Number(10.0)),
                    ],
                ),
                leaf(
                    "VEH-2",
                    &[
                        ("e00001v", Value::Text("Truck".to_string())),
                        ("e00002v", Value::Number(25.0)),
                    ],
                ),
            ],
        });
        Tree::new(vec![root])
    }

    fn parse(text: &str) -> ParsedFormula {
        FormulaParser::new(FormulaConfig::default())
            .parse(text)
            .unwrap()
    }

    #[test]
    fn global_aggregate_binds_all_values() {
        let tree = tree();
        let mut query = QueryEngine::new();
        let mut counter = BindCounter::new();
        let parsed = parse("sum(e00002v)");
        let (text, scope) =
            resolve(&tree, &mut query, &mut counter, &parsed, "sum(e00002v)", "VEH-1").unwrap();
        assert_eq!(text, "sum(e00002v_0)");
        assert_eq!(
            scope.get("e00002v_0"),
            Some(&EvalValue::Array(vec![10.0, 25.0]))
        );
    }

    #[test]
    fn filtered_aggregate_restricts_values() {
        let tree = tree();
        let mut query = QueryEngine::new();
        let mut counter = BindCounter::new();
        let formula = "sum(e00002v, e00001v == 'Truck')";
        let parsed = parse(formula);
        let (_, scope) =
            resolve(&tree, &mut query, &mut counter, &parsed, formula, "VEH-1").unwrap();
        assert_eq!(
            scope.get("e00002v_0"),
            Some(&EvalValue::Array(vec![25.0]))
        );
    }

    #[test]
    fn node_scoped_aggregate_sees_only_the_record() {
        let tree = tree();
        let mut query = QueryEngine::new();
        let mut counter = BindCounter::new();
        let formula = "sum_node(e00002v)";
        let parsed = parse(formula);
        let (text, scope) =
            resolve(&tree, &mut query, &mut counter, &parsed, formula, "VEH-2").unwrap();
        assert_eq!(text, "sum(e00002v_0)");
        assert_eq!(scope.get("e00002v_0"), Some(&EvalValue::Array(vec![25.0])));
    }

    #[test]
    fn empty_resolution_binds_zero_array() {
        let tree = tree();
        let mut query = QueryEngine::new();
        let mut counter = BindCounter::new();
        let formula = "sum_node(e09999v)";
        let parsed = parse(formula);
        let (_, scope) =
            resolve(&tree, &mut query, &mut counter, &parsed, formula, "VEH-1").unwrap();
        assert_eq!(scope.get("e09999v_0"), Some(&EvalValue::Array(vec![0.0])));
    }

    #[test]
    fn bare_variable_binds_record_scalar() {
        let tree = tree();
        let mut query = QueryEngine::new();
        let mut counter = BindCounter::new();
        let formula = "e00002v * 2";
        let parsed = parse(formula);
        let (text, scope) =
            resolve(&tree, &mut query, &mut counter, &parsed, formula, "VEH-2").unwrap();
        assert_eq!(text, "e00002v_0 * 2");
        assert_eq!(scope.get("e00002v_0"), Some(&EvalValue::Number(25.0)));
    }

    #[test]
    fn filter_rhs_variable_is_substituted() {
        let mut tree = tree();
        // give the root a comparison source field
        tree.roots[0].fields.push(Field::new(
            "e00009v",
            FieldType::String,
            Value::Text("Truck".to_string()),
        ));
        let mut query = QueryEngine::new();
        let mut counter = BindCounter::new();
        let formula = "count(e00002v, e00001v == e00009v)";
        let parsed = parse(formula);
        let (_, scope) =
            resolve(&tree, &mut query, &mut counter, &parsed, formula, "VEH-1").unwrap();
        // only VEH-2 matches e00001v == 'Truck'
        assert_eq!(scope.get("e00002v_0"), Some(&EvalValue::Array(vec![25.0])));
    }
}
