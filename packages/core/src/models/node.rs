//! Node Data Structures
//!
//! This module defines the persisted `Node` record and the nested `NodeTree`
//! shape returned when a whole tree is fetched.
//!
//! # Architecture
//!
//! - **Numeric ids**: Ids are stable `i64` values. Ids for nodes created by the
//!   staging client are assigned by the client and kept by the server.
//! - **Soft removal**: Nodes are never physically deleted. `is_removed` is a
//!   flag that cascades to every descendant.
//! - **Single root**: At most one non-removed node has `parent_id = None`.
//!
//! # Examples
//!
//! ```rust
//! use treestage_core::models::{Node, NodeTree};
//!
//! let root = Node::root(1, "Root");
//! let child = Node::new(2, Some(1), "Child");
//!
//! let tree = NodeTree::new(root, vec![NodeTree::leaf(child)]);
//! assert_eq!(tree.len(), 2);
//! ```

use crate::assembler::TreeItem;
use serde::{Deserialize, Serialize};

/// Persisted tree node.
///
/// Serialized in camelCase (`id`, `parentId`, `name`, `isRemoved`) so the wire
/// format matches what browser clients expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique, stable identifier
    pub id: i64,

    /// Parent node id (`None` means this node is a root)
    pub parent_id: Option<i64>,

    /// Display name
    pub name: String,

    /// Soft-removal flag, inherited by all descendants once applied
    #[serde(default)]
    pub is_removed: bool,
}

impl Node {
    /// Create a live (not removed) node
    pub fn new(id: i64, parent_id: Option<i64>, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            is_removed: false,
        }
    }

    /// Create a live root node
    pub fn root(id: i64, name: impl Into<String>) -> Self {
        Self::new(id, None, name)
    }

    /// Builder-style helper used mostly by tests and seeding
    pub fn removed(mut self) -> Self {
        self.is_removed = true;
        self
    }

    /// Check if this node is a root (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl TreeItem for Node {
    fn item_id(&self) -> i64 {
        self.id
    }

    fn parent_item_id(&self) -> Option<i64> {
        self.parent_id
    }
}

/// A node together with its recursively loaded children.
///
/// The node fields are flattened into the same JSON object as `children`, so a
/// tree serializes as `{"id":1,"parentId":null,"name":"Root","isRemoved":false,"children":[...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTree {
    #[serde(flatten)]
    pub node: Node,

    #[serde(default)]
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    pub fn new(node: Node, children: Vec<NodeTree>) -> Self {
        Self { node, children }
    }

    /// A tree consisting of a single node
    pub fn leaf(node: Node) -> Self {
        Self::new(node, Vec::new())
    }

    /// Depth-first search for a node by id
    pub fn find(&self, id: i64) -> Option<&NodeTree> {
        if self.node.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Total number of nodes in this tree (including the root)
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(NodeTree::len).sum::<usize>()
    }

    /// A tree always holds at least its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Flatten into a pre-order list of nodes (parents before children)
    pub fn flatten(&self) -> Vec<Node> {
        let mut out = Vec::with_capacity(self.len());
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Node>) {
        out.push(self.node.clone());
        for child in &self.children {
            child.flatten_into(out);
        }
    }
}

/// A single column update. Only the named column is written, every other
/// column of the row is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeField {
    Name(String),
    Removed(bool),
}

/// Field-level update addressed to one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub id: i64,
    pub field: NodeField,
}

impl FieldUpdate {
    pub fn rename(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            field: NodeField::Name(name.into()),
        }
    }

    pub fn mark_removed(id: i64) -> Self {
        Self {
            id,
            field: NodeField::Removed(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_serialization_uses_camel_case() {
        let node = Node::new(21, Some(2), "Node 2.1");
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["id"], 21);
        assert_eq!(json["parentId"], 2);
        assert_eq!(json["name"], "Node 2.1");
        assert_eq!(json["isRemoved"], false);
    }

    #[test]
    fn test_node_deserialization_defaults_removed_flag() {
        let node: Node = serde_json::from_str(r#"{"id":1,"parentId":null,"name":"Root"}"#).unwrap();
        assert!(node.is_root());
        assert!(!node.is_removed);
    }

    #[test]
    fn test_node_tree_is_flattened_on_the_wire() {
        let tree = NodeTree::new(
            Node::root(1, "Root"),
            vec![NodeTree::leaf(Node::new(2, Some(1), "Child").removed())],
        );

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["children"][0]["id"], 2);
        assert_eq!(json["children"][0]["isRemoved"], true);

        let back: NodeTree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_node_tree_find_and_flatten() {
        let tree = NodeTree::new(
            Node::root(1, "Root"),
            vec![
                NodeTree::new(
                    Node::new(2, Some(1), "A"),
                    vec![NodeTree::leaf(Node::new(4, Some(2), "A.1"))],
                ),
                NodeTree::leaf(Node::new(3, Some(1), "B")),
            ],
        );

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.find(4).map(|t| t.node.name.as_str()), Some("A.1"));
        assert!(tree.find(99).is_none());

        let ids: Vec<i64> = tree.flatten().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
    }
}
