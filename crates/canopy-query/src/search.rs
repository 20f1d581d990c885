//! Positional value search over a document-ordered node slice.
//!
//! The slice is whatever scope the caller resolved: a record's subtree or
//! the whole tree. Absent values are substituted with the field type's
//! default so selectors never yield raw null.

use canopy_tree::{TreeNode, Value};

use crate::ast::Selector;

/// All values for `path`, in document order.
pub fn collect_values(nodes: &[&TreeNode], path: &str) -> Vec<Value> {
    nodes
        .iter()
        .filter_map(|node| node.field(path))
        .map(|field| field.value_or_default())
        .collect()
}

/// One value for `path` chosen by the selector, if any field matched.
pub fn select_value(nodes: &[&TreeNode], path: &str, selector: Selector) -> Option<Value> {
    match selector {
        Selector::First => nodes
            .iter()
            .find_map(|node| node.field(path))
            .map(|field| field.value_or_default()),
        Selector::Last => nodes
            .iter()
            .rev()
            .find_map(|node| node.field(path))
            .map(|field| field.value_or_default()),
        Selector::FirstByCreation => head_by_creation(nodes, path, true),
        Selector::LastByCreation => head_by_creation(nodes, path, false),
    }
}

/// Head of the (value, creation) pairs sorted by creation timestamp.
///
/// Creation timestamps are `YYYY-MM-DD HH:MM:SS` strings, so lexicographic
/// order is chronological order.
fn head_by_creation(nodes: &[&TreeNode], path: &str, descending: bool) -> Option<Value> {
    let mut pairs: Vec<(&str, Value)> = nodes
        .iter()
        .filter_map(|node| {
            node.field(path)
                .map(|field| (node.creation.as_str(), field.value_or_default()))
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    if descending {
        pairs.reverse();
    }
    pairs.into_iter().next().map(|(_, value)| value)
}
