//! Data Models
//!
//! This module contains the core data structures shared by the server and the
//! staging client:
//!
//! - `Node` / `NodeTree` - Persisted node record and its nested form
//! - `ChangeSet` / `NewNodeDto` - Payload of one submit
//! - `FieldUpdate` / `NodeField` - Column-precise store updates

mod change_set;
mod node;
mod seed;

pub use change_set::{ChangeSet, NewNodeDto};
pub use node::{FieldUpdate, Node, NodeField, NodeTree};
pub use seed::seed_tree;
