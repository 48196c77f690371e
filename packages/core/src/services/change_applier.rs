//! Change Applier
//!
//! Applies one `ChangeSet` in three phases: insert, rename, remove. Each phase
//! is validated against the store first and then written in a single
//! transaction. A failing phase aborts the phases after it; phases already
//! written stay committed.
//!
//! The remove phase flags exactly the requested ids and then hands them to the
//! `CascadeRemover`, which takes care of the descendants.

use crate::db::{NodeStore, WriteOutcome};
use crate::models::{ChangeSet, FieldUpdate, NewNodeDto, Node};
use crate::services::cascade_remover::{CascadeRemover, CascadeReport};
use crate::services::error::TreeServiceError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Summary of one applied change set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub inserted: usize,
    pub renamed: usize,
    pub removed_roots: usize,
    pub cascade: CascadeReport,
}

pub struct ChangeApplier {
    store: Arc<dyn NodeStore>,
    cascade: CascadeRemover,
}

impl ChangeApplier {
    pub fn new(store: Arc<dyn NodeStore>, cascade: CascadeRemover) -> Self {
        Self { store, cascade }
    }

    /// Apply `changes` phase by phase: insert, then rename, then remove
    pub async fn apply(&self, changes: &ChangeSet) -> Result<ApplyReport, TreeServiceError> {
        let inserted = self.insert_phase(&changes.nodes_to_insert).await?;
        let renamed = self.update_phase(changes).await?;
        let (removed_roots, cascade) = self.remove_phase(changes).await?;

        Ok(ApplyReport {
            inserted,
            renamed,
            removed_roots,
            cascade,
        })
    }

    async fn insert_phase(&self, forest: &[NewNodeDto]) -> Result<usize, TreeServiceError> {
        let rows = flatten_insert_forest(forest);
        if rows.is_empty() {
            return Ok(0);
        }

        let mut batch_ids: HashSet<i64> = HashSet::with_capacity(rows.len());
        let mut batch_root: Option<i64> = None;
        for node in &rows {
            if !batch_ids.insert(node.id) {
                return Err(TreeServiceError::consistency(format!(
                    "insert id {} appears more than once",
                    node.id
                )));
            }
            if self.store.get_node(node.id).await?.is_some() {
                return Err(TreeServiceError::consistency(format!(
                    "insert id {} already exists",
                    node.id
                )));
            }

            // Rows are parents-first, so an in-batch parent is already in `batch_ids`
            match node.parent_id {
                Some(parent_id) if parent_id != node.id && batch_ids.contains(&parent_id) => {}
                Some(parent_id) => match self.store.get_node(parent_id).await? {
                    None => {
                        return Err(TreeServiceError::consistency(format!(
                            "insert {} references unknown parent {}",
                            node.id, parent_id
                        )));
                    }
                    Some(parent) if parent.is_removed => {
                        tracing::warn!("Insert rejected: parent {} is removed", parent_id);
                        return Err(TreeServiceError::consistency(format!(
                            "insert {} under removed parent {}",
                            node.id, parent_id
                        )));
                    }
                    Some(_) => {}
                },
                None => {
                    if batch_root.replace(node.id).is_some() || self.has_live_root().await? {
                        tracing::warn!("Insert rejected: {} would be a second root", node.id);
                        return Err(TreeServiceError::consistency(format!(
                            "insert {} would add a second live root",
                            node.id
                        )));
                    }
                }
            }
        }

        let count = rows.len();
        self.store.bulk_insert(rows).await?;
        Ok(count)
    }

    async fn has_live_root(&self) -> Result<bool, TreeServiceError> {
        let roots = self.store.get_roots().await?;
        Ok(roots.iter().any(|root| !root.is_removed))
    }

    async fn update_phase(&self, changes: &ChangeSet) -> Result<usize, TreeServiceError> {
        let updates = changes
            .nodes_to_update
            .iter()
            .map(|(key, name)| {
                key.trim()
                    .parse::<i64>()
                    .map(|id| FieldUpdate::rename(id, name.clone()))
                    .map_err(|_| {
                        TreeServiceError::invalid_change_set(format!(
                            "update key {:?} is not a node id",
                            key
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if updates.is_empty() {
            return Ok(0);
        }

        let count = updates.len();
        match self.store.set_fields(updates).await? {
            WriteOutcome::Applied { .. } => Ok(count),
            WriteOutcome::MissingNode { id } => {
                tracing::warn!("Rename rejected: node {} does not exist", id);
                Err(TreeServiceError::missing_node(id, "update"))
            }
        }
    }

    async fn remove_phase(
        &self,
        changes: &ChangeSet,
    ) -> Result<(usize, CascadeReport), TreeServiceError> {
        if changes.nodes_to_remove.is_empty() {
            return Ok((0, CascadeReport::default()));
        }

        let updates = changes
            .nodes_to_remove
            .iter()
            .map(|&id| FieldUpdate::mark_removed(id))
            .collect::<Vec<_>>();

        if let WriteOutcome::MissingNode { id } = self.store.set_fields(updates).await? {
            tracing::warn!("Remove rejected: node {} does not exist", id);
            return Err(TreeServiceError::missing_node(id, "remove"));
        }

        let report = self
            .cascade
            .cascade(changes.nodes_to_remove.iter().copied())
            .await?;
        Ok((changes.nodes_to_remove.len(), report))
    }
}

/// Flatten an insert forest depth-first, parents before children
///
/// A child's parent is always the enclosing descriptor, whatever its own
/// `parent_id` says. Uses an explicit stack so deep forests cannot overflow.
pub fn flatten_insert_forest(forest: &[NewNodeDto]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut stack: Vec<(&NewNodeDto, Option<i64>)> = forest
        .iter()
        .rev()
        .map(|dto| (dto, dto.parent_id))
        .collect();

    while let Some((dto, parent_id)) = stack.pop() {
        out.push(Node::new(dto.id, parent_id, dto.name.clone()));
        stack.extend(dto.children.iter().rev().map(|child| (child, Some(dto.id))));
    }

    out
}
