//! Staged node: a server node (or a new one) plus its pending edit state

use crate::assembler::TreeItem;
use crate::models::Node;
use serde::{Deserialize, Serialize};

/// What the user asked for on a node that the server has not confirmed yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnsavedState {
    #[default]
    Unmodified,
    /// Created locally, not yet persisted; carries a temporary id
    New,
    Renamed,
    /// Explicitly deleted by the user
    Removed,
}

/// A node held by the staging cache
///
/// `unsaved_state` and `is_removed` are independent: the first records the
/// user's pending intent, the second what is believed true on the server,
/// including removal inherited from a staged ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    name: String,
    original_name: String,
    pub unsaved_state: UnsavedState,
    pub is_removed: bool,
}

impl StagedNode {
    /// Wrap a node pulled from the server
    pub fn from_server(node: &Node) -> Self {
        Self {
            id: node.id,
            parent_id: node.parent_id,
            name: node.name.clone(),
            original_name: node.name.clone(),
            unsaved_state: UnsavedState::Unmodified,
            is_removed: node.is_removed,
        }
    }

    /// A locally created node named after its temporary id
    pub fn new_local(id: i64, parent_id: i64) -> Self {
        let name = format!("New Node ({})", id);
        Self {
            id,
            parent_id: Some(parent_id),
            original_name: name.clone(),
            name,
            unsaved_state: UnsavedState::New,
            is_removed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Set the live name. An unmodified node whose name now differs from the
    /// original becomes `Renamed`; every other state is kept.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        if self.unsaved_state == UnsavedState::Unmodified && self.name != self.original_name {
            self.unsaved_state = UnsavedState::Renamed;
        }
    }

    pub fn is_new(&self) -> bool {
        self.unsaved_state == UnsavedState::New
    }

    /// Live name differs from the name last confirmed by the server
    pub fn has_name_change(&self) -> bool {
        self.name != self.original_name
    }

    /// Forget pending intent after a successful submit. `is_removed` is kept.
    pub fn reset_unsaved_state(&mut self) {
        self.unsaved_state = UnsavedState::Unmodified;
        self.original_name = self.name.clone();
    }
}

impl TreeItem for StagedNode {
    fn item_id(&self) -> i64 {
        self.id
    }

    fn parent_item_id(&self) -> Option<i64> {
        self.parent_id
    }
}

/// Nested, owned snapshot of the staged forest for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedTree {
    #[serde(flatten)]
    pub node: StagedNode,
    pub children: Vec<StagedTree>,
}
