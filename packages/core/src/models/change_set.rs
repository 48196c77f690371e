//! Change-set wire payload
//!
//! A `ChangeSet` carries every staged edit of one submit: a forest of new
//! nodes, a rename map and the set of explicitly removed ids.

use crate::assembler::TreeItem;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Description of a node to insert, with nested children.
///
/// `id` is assigned by the client and kept by the server. `parent_id` points
/// either at an already persisted node or at another node of the same batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNodeDto {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub children: Vec<NewNodeDto>,
}

impl NewNodeDto {
    pub fn new(id: i64, parent_id: Option<i64>, name: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<NewNodeDto>) -> Self {
        self.children = children;
        self
    }
}

impl TreeItem for NewNodeDto {
    fn item_id(&self) -> i64 {
        self.id
    }

    fn parent_item_id(&self) -> Option<i64> {
        self.parent_id
    }
}

/// All staged edits of one submit
///
/// `nodes_to_update` is keyed by the decimal string form of the id because
/// JSON object keys are strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    #[serde(default)]
    pub nodes_to_remove: BTreeSet<i64>,

    #[serde(default)]
    pub nodes_to_insert: Vec<NewNodeDto>,

    #[serde(default)]
    pub nodes_to_update: BTreeMap<String, String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_to_remove.is_empty()
            && self.nodes_to_insert.is_empty()
            && self.nodes_to_update.is_empty()
    }

    pub fn with_insert(mut self, node: NewNodeDto) -> Self {
        self.nodes_to_insert.push(node);
        self
    }

    pub fn with_rename(mut self, id: i64, name: impl Into<String>) -> Self {
        self.nodes_to_update.insert(id.to_string(), name.into());
        self
    }

    pub fn with_remove(mut self, id: i64) -> Self {
        self.nodes_to_remove.insert(id);
        self
    }
}
