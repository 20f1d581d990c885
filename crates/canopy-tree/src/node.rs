//! Tree nodes and traversal
//!
//! A `TreeNode` is one record instance; its children are grouped into
//! `ChildGroup`s tagged with the coded path of the child collection.
//! Traversals use an explicit work stack so deeply nested trees cannot
//! exhaust the call stack.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::value::{FieldType, Value, SENTINEL_DATETIME};

/// One field of a record instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Coded token of the fixed shape `e` + 5 digits + `v`.
    pub path: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub value: Value,
}

impl Field {
    pub fn new(path: impl Into<String>, field_type: FieldType, value: Value) -> Self {
        Self {
            path: path.into(),
            field_type,
            value,
        }
    }

    /// The field value, substituting the type default for null.
    pub fn value_or_default(&self) -> Value {
        if self.value.is_null() {
            self.field_type.default_value()
        } else {
            self.value.clone()
        }
    }
}

/// A tagged collection of child instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildGroup {
    /// Coded path of the child collection.
    pub path: String,
    #[serde(default)]
    pub nodes: Vec<TreeNode>,
}

/// One record instance in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Opaque identifier; empty for synthesized placeholder instances.
    #[serde(default)]
    pub id: String,
    /// Creation timestamp, sentinel when absent.
    #[serde(default = "default_creation")]
    pub creation: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub children: Vec<ChildGroup>,
}

fn default_creation() -> String {
    SENTINEL_DATETIME.to_string()
}

impl TreeNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            creation: default_creation(),
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up a field by its coded path.
    pub fn field(&self, path: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.path == path)
    }

    pub fn field_mut(&mut self, path: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.path == path)
    }

    pub fn has_children(&self) -> bool {
        self.children.iter().any(|g| !g.nodes.is_empty())
    }

    /// A node is empty when it has no id, no field holding a non-default
    /// value, and no children worth keeping.
    pub fn is_empty(&self) -> bool {
        if !self.id.trim().is_empty() {
            return false;
        }
        if self.fields.iter().any(|f| !f.value.is_default()) {
            return false;
        }
        !self.has_children()
    }

    /// Prune empty descendants, bottom-up.
    pub fn compact(&mut self) {
        for group in &mut self.children {
            for node in &mut group.nodes {
                node.compact();
            }
            group.nodes.retain(|n| !n.is_empty());
        }
        self.children.retain(|g| !g.nodes.is_empty());
    }

    /// The node and all descendants in document order.
    pub fn subtree(&self) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            for group in node.children.iter().rev() {
                for child in group.nodes.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }
}

/// The whole entity tree handed over by the ingestion boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    #[serde(default)]
    pub roots: Vec<TreeNode>,
}

impl Tree {
    pub fn new(roots: Vec<TreeNode>) -> Self {
        Self { roots }
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> Vec<&TreeNode> {
        let mut out = Vec::new();
        for root in &self.roots {
            out.extend(root.subtree());
        }
        out
    }

    /// Find a record instance by id anywhere in the tree.
    pub fn find_by_id(&self, record_id: &str) -> Option<&TreeNode> {
        self.nodes().into_iter().find(|n| n.id == record_id)
    }

    /// Find the child group carrying a given collection tag.
    pub fn find_group(&self, path: &str) -> Option<&ChildGroup> {
        let mut stack: Vec<&TreeNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            for group in &node.children {
                if group.path == path {
                    return Some(group);
                }
                stack.extend(group.nodes.iter());
            }
        }
        None
    }

    /// Write a value into the field `field_path` of the instance
    /// `record_id` inside the group tagged `group_path`.
    ///
    /// Returns false when no matching field exists.
    pub fn write_field(
        &mut self,
        group_path: &str,
        record_id: &str,
        field_path: &str,
        value: Value,
    ) -> bool {
        let mut stack: Vec<&mut TreeNode> = self.roots.iter_mut().collect();
        while let Some(node) = stack.pop() {
            for group in &mut node.children {
                if group.path != group_path {
                    continue;
                }
                let field = group
                    .nodes
                    .iter_mut()
                    .filter(|child| child.id == record_id)
                    .find_map(|child| child.field_mut(field_path));
                if let Some(field) = field {
                    field.value = value;
                    return true;
                }
            }
            for group in node.children.iter_mut().rev() {
                stack.extend(group.nodes.iter_mut().rev());
            }
        }
        debug!(group_path, record_id, field_path, "write target not found");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str, path: &str, value: Value) -> TreeNode {
        let mut node = TreeNode::new(id);
        node.fields.push(Field::new(path, FieldType::Numeric, value));
        node
    }

    #[test]
    fn empty_node_detection() {
        let placeholder = TreeNode::new("");
        assert!(placeholder.is_empty());

        let mut defaults_only = TreeNode::new("");
        defaults_only
            .fields
            .push(Field::new("e00001v", FieldType::Numeric, Value::Number(0.0)));
        assert!(defaults_only.is_empty());

        let named = TreeNode::new("REC-1");
        assert!(!named.is_empty());

        let valued = leaf("", "e00001v", Value::Number(4.0));
        assert!(!valued.is_empty());
    }

    #[test]
    fn compact_prunes_placeholders_but_keeps_parents_with_children() {
        let mut parent = TreeNode::new("");
        parent.children.push(ChildGroup {
            path: "e00100v".to_string(),
            nodes: vec![TreeNode::new(""), leaf("REC-1", "e00001v", Value::Number(2.0))],
        });
        parent.compact();
        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].nodes.len(), 1);
        assert_eq!(parent.children[0].nodes[0].id, "REC-1");
        // the parent itself survives: it still has a child worth keeping
        assert!(!parent.is_empty());
    }

    #[test]
    fn subtree_is_document_ordered() {
        let mut root = TreeNode::new("A");
        root.children.push(ChildGroup {
            path: "g".to_string(),
            nodes: vec![TreeNode::new("B"), TreeNode::new("C")],
        });
        let ids: Vec<&str> = root.subtree().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn find_and_write() {
        let mut root = TreeNode::new("root");
        root.children.push(ChildGroup {
            path: "e00200v".to_string(),
            nodes: vec![leaf("REC-7", "e00001v", Value::Number(1.0))],
        });
        let mut tree = Tree::new(vec![root]);

        assert!(tree.find_by_id("REC-7").is_some());
        assert!(tree.write_field("e00200v", "REC-7", "e00001v", Value::Number(9.0)));
        let node = tree.find_by_id("REC-7").unwrap();
        assert_eq!(node.field("e00001v").unwrap().value, Value::Number(9.0));

        assert!(!tree.write_field("e00200v", "REC-7", "e99999v", Value::Number(1.0)));
    }

    #[test]
    fn write_reaches_deeply_nested_records() {
        let mut node = leaf("TARGET", "e00001v", Value::Number(0.0));
        for depth in 0..50_000 {
            let mut parent = TreeNode::new(format!("N{depth}"));
            parent.children.push(ChildGroup {
                path: "e00300v".to_string(),
                nodes: vec![node],
            });
            node = parent;
        }
        let mut tree = Tree::new(vec![node]);

        assert!(tree.write_field("e00300v", "TARGET", "e00001v", Value::Number(7.0)));
        assert_eq!(
            tree.find_by_id("TARGET").unwrap().field("e00001v").unwrap().value,
            Value::Number(7.0)
        );

        // dismantle level by level; dropping the whole chain at once would
        // recurse through the drop glue
        let mut nodes = tree.roots;
        while let Some(mut n) = nodes.pop() {
            for mut group in n.children.drain(..) {
                nodes.append(&mut group.nodes);
            }
        }
    }
}
