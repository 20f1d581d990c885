//! Aggregate-call extraction from formula text.
//!
//! A greedy left-to-right scan tests each position for an allow-listed
//! aggregate name followed by `(`. On a match the call body is isolated by
//! parenthesis balancing and split from its filter at the first top-level
//! comma; the scan then continues inside the body, so calls nested in
//! another call's argument are discovered too.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{FormulaError, Result};
use crate::extract::{
    balance_parentheses, extract_variables, find_top_level_commas, normalize_comparisons,
};
use crate::spec::{AggregateCall, ParsedFormula};

/// Allow-listed aggregate function names.
///
/// Configured, not hard-coded: deployments can trim or extend the list.
#[derive(Debug, Clone)]
pub struct FormulaConfig {
    /// Names recognized as aggregate calls. `_node` variants aggregate
    /// within the current record instead of globally.
    pub aggregate_functions: Vec<String>,
    /// Subset whose `eval` form is the bare argument rather than a call.
    pub positional_functions: Vec<String>,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        let aggregate_functions = [
            "sum", "avg", "count", "max", "min", "abs", "len", "round", "first", "last",
            "firstc", "lastc", "sum_node", "avg_node", "count_node", "max_node", "min_node",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let positional_functions = ["first", "last", "firstc", "lastc"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            aggregate_functions,
            positional_functions,
        }
    }
}

/// Parses formula text into its aggregate calls, bare variables, and
/// dependency list.
#[derive(Debug, Clone)]
pub struct FormulaParser {
    config: FormulaConfig,
    /// Names sorted longest-first so `sum_node` wins over `sum`.
    names: Vec<String>,
}

impl Default for FormulaParser {
    fn default() -> Self {
        Self::new(FormulaConfig::default())
    }
}

impl FormulaParser {
    pub fn new(config: FormulaConfig) -> Self {
        let mut names = config.aggregate_functions.clone();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { config, names }
    }

    pub fn parse(&self, formula: &str) -> Result<ParsedFormula> {
        let text = formula.trim();
        let text = text.strip_prefix("return ").unwrap_or(text).trim();

        let aggr = self.extract_aggregates(text)?;

        // tokens left after aggregate text is removed, minus anything an
        // aggregate argument or filter already claims
        let mut residue = text.to_string();
        for call in &aggr {
            residue = residue.replace(&call.base, " ");
        }
        let claimed: HashSet<&str> = aggr
            .iter()
            .flat_map(|c| c.vars.iter().chain(c.filter_vars.iter()))
            .map(String::as_str)
            .collect();
        let vars: Vec<String> = extract_variables(&residue)
            .into_iter()
            .filter(|v| !claimed.contains(v.as_str()))
            .collect();

        let mut dag_paths: Vec<String> = Vec::new();
        let push_unique = |list: &mut Vec<String>, var: &str| {
            if !list.iter().any(|v| v == var) {
                list.push(var.to_string());
            }
        };
        for call in &aggr {
            for var in &call.vars {
                push_unique(&mut dag_paths, var);
            }
        }
        for call in &aggr {
            for var in &call.filter_vars {
                push_unique(&mut dag_paths, var);
            }
        }
        for var in &vars {
            push_unique(&mut dag_paths, var);
        }

        debug!(
            aggregates = aggr.len(),
            bare_vars = vars.len(),
            deps = dag_paths.len(),
            "formula parsed"
        );
        Ok(ParsedFormula {
            aggr,
            vars,
            dag_paths,
        })
    }

    fn extract_aggregates(&self, text: &str) -> Result<Vec<AggregateCall>> {
        let mut aggr = Vec::new();
        let mut i = 0;
        while i < text.len() {
            let Some(name) = self.match_name_at(text, i) else {
                i += text[i..].chars().next().map_or(1, char::len_utf8);
                continue;
            };
            let after_name = i + name.len();
            let ws = text[after_name..].len() - text[after_name..].trim_start().len();
            let open = after_name + ws;
            let Some((close, body)) = balance_parentheses(text, open) else {
                return Err(FormulaError::UnbalancedParens { pos: open });
            };

            let (argument, filter) = match find_top_level_commas(body).first() {
                Some(&comma) => (
                    body[..comma].trim(),
                    Some(normalize_comparisons(body[comma + 1..].trim())),
                ),
                None => (body.trim(), None),
            };
            let filter_vars = filter
                .as_deref()
                .map(extract_variables)
                .unwrap_or_default();
            let eval = if self.is_positional(name) {
                argument.to_string()
            } else {
                format!("{}({argument})", name.replace("_node", ""))
            };
            aggr.push(AggregateCall {
                base: text[i..=close].to_string(),
                eval,
                vars: extract_variables(argument),
                global: !name.contains("_node"),
                filter,
                filter_vars,
            });
            // continue just past the name so nested calls in the body are
            // found on later iterations
            i = after_name;
        }
        Ok(aggr)
    }

    /// The allow-listed name starting at byte `i`, if it stands alone and
    /// a `(` follows.
    fn match_name_at<'a>(&'a self, text: &str, i: usize) -> Option<&'a str> {
        let prev_ok = i == 0 || {
            let prev = text.as_bytes()[i - 1];
            !prev.is_ascii_alphanumeric() && prev != b'_'
        };
        if !prev_ok {
            return None;
        }
        let rest = &text[i..];
        self.names
            .iter()
            .find(|name| {
                rest.starts_with(name.as_str())
                    && rest[name.len()..].trim_start().starts_with('(')
            })
            .map(String::as_str)
    }

    fn is_positional(&self, name: &str) -> bool {
        self.config.positional_functions.iter().any(|p| p == name)
    }
}
