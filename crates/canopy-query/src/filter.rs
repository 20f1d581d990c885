//! Scoped filter queries over the tree.
//!
//! `QueryEngine::filter` resolves return paths inside a record's subtree
//! first, falling back to the whole tree for anything the subtree cannot
//! satisfy. `lock_scope` disables the fallback and reports the miss as an
//! explicit empty hit instead.
//!
//! Results are cached by query shape. The tree mutates between execution
//! groups, so the owner must call `invalidate` at every group boundary.

use std::collections::HashMap;

use canopy_tree::{Tree, TreeNode, Value};
use tracing::{debug, trace};

use crate::ast::{FilterExpr, Selector};
use crate::error::{QueryError, Result};
use crate::eval::evaluate;
use crate::parser::parse;
use crate::search;

/// Values resolved for one requested return path.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    /// The return-path entry exactly as requested, selector wrapper included.
    pub path: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    paths: Vec<String>,
    record_id: Option<String>,
    filter: Option<String>,
    lock_scope: bool,
}

/// One requested return path, selector wrapper unwrapped.
struct ReturnPath<'a> {
    requested: &'a str,
    token: &'a str,
    selector: Option<Selector>,
}

/// Filter query front end with a per-group result cache.
#[derive(Debug, Default)]
pub struct QueryEngine {
    cache: HashMap<CacheKey, Vec<QueryHit>>,
}

impl QueryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all cached results. Must run whenever the tree has mutated.
    pub fn invalidate(&mut self) {
        trace!(entries = self.cache.len(), "query cache invalidated");
        self.cache.clear();
    }

    /// Resolve `return_paths` against the tree.
    ///
    /// With `record_id`, resolution happens inside that record's subtree;
    /// unsatisfied paths fall back to the whole tree unless `lock_scope`
    /// is set. Paths with no values are omitted from the result, except
    /// under `lock_scope` where they come back with an empty value list.
    pub fn filter(
        &mut self,
        tree: &Tree,
        return_paths: &[String],
        record_id: Option<&str>,
        filter_expr: Option<&str>,
        lock_scope: bool,
    ) -> Result<Vec<QueryHit>> {
        let key = CacheKey {
            paths: return_paths.to_vec(),
            record_id: record_id.map(str::to_string),
            filter: filter_expr.map(str::to_string),
            lock_scope,
        };
        if let Some(hits) = self.cache.get(&key) {
            trace!(?return_paths, "query cache hit");
            return Ok(hits.clone());
        }

        let parsed_filter = match filter_expr {
            Some(text) => Some(parse(text)?),
            None => None,
        };
        let parsed_paths = return_paths
            .iter()
            .map(|p| parse_return_path(p))
            .collect::<Result<Vec<_>>>()?;

        let record_scope: Option<Vec<&TreeNode>> = record_id
            .and_then(|id| tree.find_by_id(id))
            .map(|node| node.subtree());
        if record_id.is_some() && record_scope.is_none() {
            debug!(record_id, "record not found, scope resolves empty");
        }

        let mut global_matches: Option<Vec<&TreeNode>> = None;
        let mut hits = Vec::new();
        for path in &parsed_paths {
            let mut values = match &record_scope {
                Some(scope) => {
                    let matches = matching_nodes(scope, parsed_filter.as_ref());
                    extract_values(&matches, path)
                }
                None => Vec::new(),
            };

            if values.is_empty() && !lock_scope {
                let matches = global_matches.get_or_insert_with(|| {
                    matching_nodes(&tree.nodes(), parsed_filter.as_ref())
                });
                values = extract_values(matches, path);
            }

            if values.is_empty() && !lock_scope {
                continue;
            }
            hits.push(QueryHit {
                path: path.requested.to_string(),
                values,
            });
        }

        debug!(
            paths = return_paths.len(),
            hits = hits.len(),
            record_id,
            lock_scope,
            "filter resolved"
        );
        self.cache.insert(key, hits.clone());
        Ok(hits)
    }
}

/// Records in `scope` satisfying the filter; all of them when no filter.
fn matching_nodes<'t>(
    scope: &[&'t TreeNode],
    filter: Option<&FilterExpr>,
) -> Vec<&'t TreeNode> {
    match filter {
        Some(expr) => scope
            .iter()
            .copied()
            .filter(|node| evaluate(expr, node, scope))
            .collect(),
        None => scope.to_vec(),
    }
}

fn extract_values(matches: &[&TreeNode], path: &ReturnPath<'_>) -> Vec<Value> {
    match path.selector {
        Some(selector) => search::select_value(matches, path.token, selector)
            .into_iter()
            .collect(),
        None => search::collect_values(matches, path.token),
    }
}

/// Split `first(e00001v)` style wrappers off a return path.
fn parse_return_path(requested: &str) -> Result<ReturnPath<'_>> {
    let trimmed = requested.trim();
    if let Some(open) = trimmed.find('(') {
        let Some(inner) = trimmed[open + 1..].strip_suffix(')') else {
            return Err(QueryError::syntax(format!(
                "unterminated return path: {requested}"
            )));
        };
        let name = trimmed[..open].trim();
        let Some(selector) = Selector::from_name(name) else {
            return Err(QueryError::UnknownSelector {
                name: name.to_string(),
            });
        };
        return Ok(ReturnPath {
            requested,
            token: inner.trim(),
            selector: Some(selector),
        });
    }
    Ok(ReturnPath {
        requested,
        token: trimmed,
        selector: None,
    })
}

#[cfg(test)]
mod tests {
    use canopy_tree::{ChildGroup, Field, FieldType};

    use super::*;

    fn leaf(id: &str, creation: &str, fields: &[(&str, Value)]) -> TreeNode {
        let mut node = TreeNode::new(id);
        node.creation = creation.to_string();
        for (path, value) in fields {
            let field_type = match value {
                Value::Number(_) => FieldType::Numeric,
                _ => FieldType::String,
            };
            node.fields.push(Field::new(*path, field_type, value.clone()));
        }
        node
    }

    /// Root with two vehicle records and one unrelated record.
    fn fleet_tree() -> Tree {
        let mut root = TreeNode::new("ROOT");
        root.children.push(ChildGroup {
            path: "e00100v".to_string(),
            nodes: vec![
                leaf(
                    "VEH-1",
                    "2023-01-01 08:00:00",
                    &[
                        ("e00001v", Value::Text("Automovel".to_string())),
                        ("e00002v", Value::Number(10.0)),
                    ],
                ),
                leaf(
                    "VEH-2",
                    "2024-01-01 08:00:00",
                    &[
                        ("e00001v", Value::Text("Heavy Truck".to_string())),
                        ("e00002v", Value::Number(25.0)),
                    ],
                ),
            ],
        });
        root.children.push(ChildGroup {
            path: "e00200v".to_string(),
            nodes: vec![leaf(
                "DRV-1",
                "2022-06-01 08:00:00",
                &[("e00003v", Value::Number(7.0))],
            )],
        });
        Tree::new(vec![root])
    }

    #[test]
    fn collects_all_values_without_filter() {
        let tree = fleet_tree();
        let mut engine = QueryEngine::new();
        let hits = engine
            .filter(&tree, &["e00002v".to_string()], None, None, false)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].values, vec![Value::Number(10.0), Value::Number(25.0)]);
    }

    #[test]
    fn filter_restricts_matches() {
        let tree = fleet_tree();
        let mut engine = QueryEngine::new();
        let hits = engine
            .filter(
                &tree,
                &["e00002v".to_string()],
                None,
                Some("contains(e00001v, 'Truck')"),
                false,
            )
            .unwrap();
        assert_eq!(hits[0].values, vec![Value::Number(25.0)]);
    }

    #[test]
    fn record_scope_with_global_fallback() {
        let tree = fleet_tree();
        let mut engine = QueryEngine::new();
        // e00003v lives outside VEH-1's subtree: falls back to the tree
        let hits = engine
            .filter(&tree, &["first(e00003v)".to_string()], Some("VEH-1"), None, false)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].values, vec![Value::Number(7.0)]);
    }

    #[test]
    fn lock_scope_yields_explicit_empty_hit() {
        let tree = fleet_tree();
        let mut engine = QueryEngine::new();
        let hits = engine
            .filter(&tree, &["first(e00003v)".to_string()], Some("VEH-1"), None, true)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "first(e00003v)");
        assert!(hits[0].values.is_empty());
    }

    #[test]
    fn unsatisfied_paths_are_omitted_when_unlocked() {
        let tree = fleet_tree();
        let mut engine = QueryEngine::new();
        let hits = engine
            .filter(&tree, &["e09999v".to_string()], None, None, false)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn positional_return_paths() {
        let tree = fleet_tree();
        let mut engine = QueryEngine::new();
        let hits = engine
            .filter(
                &tree,
                &["lastc(e00002v)".to_string(), "last(e00002v)".to_string()],
                None,
                None,
                false,
            )
            .unwrap();
        // lastc: oldest by creation; last: latest in document order
        assert_eq!(hits[0].values, vec![Value::Number(10.0)]);
        assert_eq!(hits[1].values, vec![Value::Number(25.0)]);
    }

    #[test]
    fn bad_filter_text_is_an_error() {
        let tree = fleet_tree();
        let mut engine = QueryEngine::new();
        let result = engine.filter(
            &tree,
            &["e00001v".to_string()],
            None,
            Some("e00001v == "),
            false,
        );
        assert!(result.is_err());
    }

    #[test]
    fn cache_replays_until_invalidated() {
        let mut tree = fleet_tree();
        let mut engine = QueryEngine::new();
        let paths = vec!["e00002v".to_string()];
        let before = engine.filter(&tree, &paths, None, None, false).unwrap();

        tree.write_field("e00100v", "VEH-1", "e00002v", Value::Number(99.0));
        // stale until the owner invalidates at the group boundary
        let stale = engine.filter(&tree, &paths, None, None, false).unwrap();
        assert_eq!(before, stale);

        engine.invalidate();
        let fresh = engine.filter(&tree, &paths, None, None, false).unwrap();
        assert_eq!(fresh[0].values[0], Value::Number(99.0));
    }
}
