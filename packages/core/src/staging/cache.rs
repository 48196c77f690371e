//! Staging Cache
//!
//! Client-side overlay over the part of the server tree the user has touched.
//! Nodes are pulled in one at a time (`add_db_node`) or created locally
//! (`add_new_node`), and every edit is recorded as an `UnsavedState` instead of
//! being sent to the server. `get_change_model` turns the overlay into the
//! smallest `ChangeSet` that reproduces it.
//!
//! # Structure
//!
//! The cache owns a flat `Vec<StagedNode>`. Parent → children structure is a
//! derived `Forest` rebuilt after every structural change, and child → parent
//! navigation is the plain `parent_id` lookup. A pulled node whose parent was
//! never pulled is a root of the staged forest.
//!
//! # Removal
//!
//! `is_removed` always holds for every staged descendant of a removed node,
//! including descendants pulled after the removal. New nodes that end up
//! removed are dropped from the cache since the server never saw them.

use crate::assembler::{assemble, Forest};
use crate::models::{ChangeSet, NewNodeDto, Node};
use crate::staging::error::StagingError;
use crate::staging::node::{StagedNode, StagedTree, UnsavedState};
use chrono::Utc;
use std::collections::{HashMap, HashSet};

/// Issues temporary ids for locally created nodes
///
/// Ids start at the current unix time in milliseconds and strictly increase,
/// so they never repeat within a session and do not collide with ids that
/// earlier sessions already persisted.
#[derive(Debug, Clone, Default)]
pub struct TempIdGenerator {
    last: i64,
}

impl TempIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id, strictly greater than both the previous id and `floor`
    pub fn next_above(&mut self, floor: i64) -> i64 {
        let id = Utc::now()
            .timestamp_millis()
            .max(self.last.saturating_add(1))
            .max(floor.saturating_add(1));
        self.last = id;
        id
    }
}

#[derive(Debug, Default)]
pub struct StagingCache {
    nodes: Vec<StagedNode>,
    positions: HashMap<i64, usize>,
    forest: Forest,
    ids: TempIdGenerator,
}

impl StagingCache {
    pub fn new() -> Self {
        Self::default()
    }

    //
    // MUTATIONS
    //

    /// Create a New node under `parent_id` and return its temporary id
    ///
    /// # Errors
    ///
    /// - `UnknownNode` if the parent is not staged
    /// - `ParentRemoved` if the parent is removed
    pub fn add_new_node(&mut self, parent_id: i64) -> Result<i64, StagingError> {
        let parent_idx = self.position(parent_id)?;
        if self.nodes[parent_idx].is_removed {
            return Err(StagingError::ParentRemoved { id: parent_id });
        }

        let floor = self.nodes.iter().map(|node| node.id).max().unwrap_or(0);
        let id = self.ids.next_above(floor);

        self.nodes.push(StagedNode::new_local(id, parent_id));
        self.rebuild();
        Ok(id)
    }

    /// Stage a node fetched from the server
    ///
    /// Returns `false` (and changes nothing) if the id is already staged.
    pub fn add_db_node(&mut self, node: &Node) -> bool {
        if self.positions.contains_key(&node.id) {
            return false;
        }

        self.nodes.push(StagedNode::from_server(node));
        self.rebuild();
        self.inherit_removed();
        self.purge_removed_new_nodes();
        true
    }

    /// Delete a staged node
    ///
    /// A New node is dropped together with its staged subtree. Any other node
    /// becomes `Removed` and its staged descendants are flagged removed.
    /// Removing a node that is already removed does nothing.
    pub fn remove_node(&mut self, id: i64) -> Result<(), StagingError> {
        let idx = self.position(id)?;

        if self.nodes[idx].is_new() {
            let doomed: HashSet<i64> = self
                .subtree(idx)
                .into_iter()
                .map(|i| self.nodes[i].id)
                .collect();
            self.nodes.retain(|node| !doomed.contains(&node.id));
            self.rebuild();
            return Ok(());
        }

        if self.nodes[idx].is_removed {
            return Ok(());
        }

        self.nodes[idx].unsaved_state = UnsavedState::Removed;
        self.mark_subtree_removed(idx);
        self.purge_removed_new_nodes();
        Ok(())
    }

    /// Change the live name of a staged node
    pub fn rename_node(&mut self, id: i64, name: impl Into<String>) -> Result<(), StagingError> {
        let idx = self.position(id)?;
        self.nodes[idx].set_name(name);
        Ok(())
    }

    /// Mark nodes the server reports as removed, with their staged subtrees
    ///
    /// Ids that are not staged are ignored.
    pub fn mark_nodes_as_removed(&mut self, ids: &[i64]) {
        for id in ids {
            if let Some(&idx) = self.positions.get(id) {
                self.mark_subtree_removed(idx);
            }
        }
        self.purge_removed_new_nodes();
    }

    /// Forget all pending intent after a successful submit
    pub fn reset_unsaved_state_for_all_nodes(&mut self) {
        for node in &mut self.nodes {
            node.reset_unsaved_state();
        }
    }

    /// Drop every staged node
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.rebuild();
    }

    //
    // CHANGE MODEL
    //

    /// The minimal change set reproducing the staged edits
    ///
    /// - New nodes become a nested insert forest keyed by their temporary ids
    /// - Renamed nodes, and Removed nodes whose name changed, become updates
    /// - Removed nodes are listed for removal; descendants removed only by
    ///   inheritance are left to the server cascade
    pub fn get_change_model(&self) -> ChangeSet {
        let new_nodes: Vec<&StagedNode> = self.nodes.iter().filter(|node| node.is_new()).collect();
        let nodes_to_insert = assemble(&new_nodes).fold(&new_nodes, |node, children| {
            NewNodeDto::new(node.id, node.parent_id, node.name()).with_children(children)
        });

        let mut change_set = ChangeSet {
            nodes_to_insert,
            ..ChangeSet::default()
        };

        for node in &self.nodes {
            let emits_rename = match node.unsaved_state {
                UnsavedState::Renamed => true,
                UnsavedState::Removed => node.has_name_change(),
                UnsavedState::New | UnsavedState::Unmodified => false,
            };
            if emits_rename {
                change_set
                    .nodes_to_update
                    .insert(node.id.to_string(), node.name().to_string());
            }
            if node.unsaved_state == UnsavedState::Removed {
                change_set.nodes_to_remove.insert(node.id);
            }
        }

        change_set
    }

    /// Staged ids whose removed state may have changed on the server
    ///
    /// When a removal is pending, the server cascade may reach staged nodes
    /// whose removed ancestor was never pulled. Those sit under staged forest
    /// roots that have a parent id. Returns every such live root together
    /// with its live staged descendants, or nothing when no node is pending
    /// removal.
    pub fn get_node_ids_which_need_to_refresh_removed_state(&self) -> Vec<i64> {
        let removal_pending = self
            .nodes
            .iter()
            .any(|node| node.unsaved_state == UnsavedState::Removed);
        if !removal_pending {
            return Vec::new();
        }

        let mut ids = Vec::new();
        for &root in self.forest.roots() {
            let node = &self.nodes[root];
            if node.parent_id.is_none() || node.is_removed {
                continue;
            }
            ids.push(node.id);
            ids.extend(
                self.forest
                    .descendants(root)
                    .into_iter()
                    .map(|idx| &self.nodes[idx])
                    .filter(|node| !node.is_removed)
                    .map(|node| node.id),
            );
        }
        ids
    }

    //
    // READ ACCESS
    //

    pub fn get(&self, id: i64) -> Option<&StagedNode> {
        self.positions.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, id: i64) -> bool {
        self.positions.contains_key(&id)
    }

    /// Flat list in staging order
    pub fn nodes(&self) -> &[StagedNode] {
        &self.nodes
    }

    pub fn roots(&self) -> Vec<&StagedNode> {
        self.forest
            .roots()
            .iter()
            .map(|&idx| &self.nodes[idx])
            .collect()
    }

    pub fn children_of(&self, id: i64) -> Vec<&StagedNode> {
        match self.positions.get(&id) {
            Some(&idx) => self
                .forest
                .children_of(idx)
                .iter()
                .map(|&child| &self.nodes[child])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Nested snapshot of the staged forest
    pub fn tree(&self) -> Vec<StagedTree> {
        self.forest.fold(&self.nodes, |node, children| StagedTree {
            node: node.clone(),
            children,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    //
    // INTERNALS
    //

    fn position(&self, id: i64) -> Result<usize, StagingError> {
        self.positions
            .get(&id)
            .copied()
            .ok_or_else(|| StagingError::unknown_node(id))
    }

    fn rebuild(&mut self) {
        self.positions = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect();
        self.forest = assemble(&self.nodes);
    }

    fn subtree(&self, idx: usize) -> Vec<usize> {
        let mut out = vec![idx];
        out.extend(self.forest.descendants(idx));
        out
    }

    fn mark_subtree_removed(&mut self, idx: usize) {
        for i in self.subtree(idx) {
            self.nodes[i].is_removed = true;
        }
    }

    /// Push `is_removed` down from every removed node to its descendants
    fn inherit_removed(&mut self) {
        let mut stack: Vec<(usize, bool)> = self
            .forest
            .roots()
            .iter()
            .map(|&root| (root, false))
            .collect();

        while let Some((idx, parent_removed)) = stack.pop() {
            if parent_removed {
                self.nodes[idx].is_removed = true;
            }
            let removed = self.nodes[idx].is_removed;
            stack.extend(
                self.forest
                    .children_of(idx)
                    .iter()
                    .map(|&child| (child, removed)),
            );
        }
    }

    fn purge_removed_new_nodes(&mut self) {
        self.nodes.retain(|node| !(node.is_new() && node.is_removed));
        self.rebuild();
    }
}
