//! Fixed seed tree written by a store reset

use super::Node;

/// The tree a reset recreates:
///
/// ```text
/// Root (1)
/// ├── Node 1 (2)
/// └── Node 2 (3)
///     ├── Node 2.1 (4)
///     │   ├── Node 2.1.1 (5)
///     │   └── Node 2.1.2 (6)
///     └── Node 2.2 (7)
/// ```
///
/// Nodes are listed parents-first so they can be inserted in order.
pub fn seed_tree() -> Vec<Node> {
    vec![
        Node::root(1, "Root"),
        Node::new(2, Some(1), "Node 1"),
        Node::new(3, Some(1), "Node 2"),
        Node::new(4, Some(3), "Node 2.1"),
        Node::new(5, Some(4), "Node 2.1.1"),
        Node::new(6, Some(4), "Node 2.1.2"),
        Node::new(7, Some(3), "Node 2.2"),
    ]
}
