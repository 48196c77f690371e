//! Tree Service - Server-Side Facade
//!
//! This module provides the operations the HTTP layer exposes:
//!
//! - Fetch the live root with its full recursive subtree
//! - Fetch a single node by id
//! - Apply a staged `ChangeSet`
//! - Reset the store to the fixed seed tree
//! - Filter a list of ids down to the ones currently removed
//!
//! # Root Detection
//!
//! The root is the unique node with `parent_id IS NULL` that is not removed.
//! Removed roots are ignored; two live roots are a consistency violation.
//! Removed descendants of the live root are still returned so clients can
//! render their state.

use crate::assembler::assemble;
use crate::config::{ConfigError, TreeServiceConfig};
use crate::db::NodeStore;
use crate::models::{seed_tree, ChangeSet, Node, NodeTree};
use crate::services::cascade_remover::CascadeRemover;
use crate::services::change_applier::{ApplyReport, ChangeApplier};
use crate::services::error::TreeServiceError;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::instrument;

pub struct TreeService {
    store: Arc<dyn NodeStore>,
    applier: ChangeApplier,
    config: TreeServiceConfig,
}

impl TreeService {
    /// Create a tree service over `store`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` does not validate.
    pub fn new(store: Arc<dyn NodeStore>, config: TreeServiceConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cascade = CascadeRemover::new(store.clone(), &config);
        let applier = ChangeApplier::new(store.clone(), cascade);
        Ok(Self {
            store,
            applier,
            config,
        })
    }

    /// The live root and every descendant, nested
    ///
    /// Returns `Ok(None)` when the store holds no live root.
    #[instrument(skip(self))]
    pub async fn get_root_with_children(&self) -> Result<Option<NodeTree>, TreeServiceError> {
        let mut live_roots = self
            .store
            .get_roots()
            .await?
            .into_iter()
            .filter(|node| !node.is_removed);

        let root = match (live_roots.next(), live_roots.next()) {
            (None, _) => return Ok(None),
            (Some(root), None) => root,
            (Some(first), Some(second)) => {
                tracing::warn!(
                    "Found more than one live root ({} and {})",
                    first.id,
                    second.id
                );
                return Err(TreeServiceError::consistency(format!(
                    "more than one live root: {} and {}",
                    first.id, second.id
                )));
            }
        };

        let nodes = self.load_subtree(root).await?;
        let forest = assemble(&nodes);
        let mut trees = forest.fold(&nodes, |node, children| {
            NodeTree::new(node.clone(), children)
        });

        // The root is the first node loaded, so it heads the first tree
        if trees.is_empty() {
            return Ok(None);
        }
        Ok(Some(trees.swap_remove(0)))
    }

    /// Breadth-first load of `root` and its descendants, page by page
    async fn load_subtree(&self, root: Node) -> Result<Vec<Node>, TreeServiceError> {
        let limit = self.config.cascade_batch_size as u64;
        let mut nodes = vec![root];
        let mut queue = VecDeque::from([0usize]);

        while let Some(idx) = queue.pop_front() {
            let parent_id = nodes[idx].id;
            let mut offset = 0;
            loop {
                let page = self.store.children_of(parent_id, offset, limit).await?;
                let fetched = page.len() as u64;
                for child in page {
                    if child.id == parent_id {
                        continue;
                    }
                    queue.push_back(nodes.len());
                    nodes.push(child);
                }
                if fetched < limit {
                    break;
                }
                offset += fetched;
            }
        }

        Ok(nodes)
    }

    /// A single node without children
    #[instrument(skip(self))]
    pub async fn get_node(&self, id: i64) -> Result<Node, TreeServiceError> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| TreeServiceError::node_not_found(id))
    }

    /// Apply one change set: insert, then rename, then remove with cascade
    #[instrument(skip(self, changes), fields(
        inserts = changes.nodes_to_insert.len(),
        updates = changes.nodes_to_update.len(),
        removes = changes.nodes_to_remove.len()
    ))]
    pub async fn apply_changes(&self, changes: &ChangeSet) -> Result<ApplyReport, TreeServiceError> {
        let report = self.applier.apply(changes).await?;
        tracing::info!(
            "Applied change set: {} inserted, {} renamed, {} removed ({} descendants flagged)",
            report.inserted,
            report.renamed,
            report.removed_roots,
            report.cascade.nodes_flagged
        );
        Ok(report)
    }

    /// Replace the whole store with the seed tree
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<(), TreeServiceError> {
        self.store.replace_all(seed_tree()).await?;
        tracing::info!("Tree reset to seed state");
        Ok(())
    }

    /// The subset of `ids` that are currently removed
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn filter_removed(&self, ids: Vec<i64>) -> Result<Vec<i64>, TreeServiceError> {
        Ok(self.store.filter_removed(ids).await?)
    }

    /// Seed the store if it holds no nodes at all
    ///
    /// Returns `true` if the seed tree was written.
    pub async fn seed_if_empty(&self) -> Result<bool, TreeServiceError> {
        // Every stored node descends from some root, so no roots means no rows
        if !self.store.get_roots().await?.is_empty() {
            return Ok(false);
        }
        self.reset().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseService, TursoStore};
    use crate::models::NewNodeDto;
    use tempfile::TempDir;

    async fn create_test_service(batch: usize) -> (TreeService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(Arc::new(db)));
        let config = TreeServiceConfig::default().with_cascade_batch_size(batch);
        (TreeService::new(store, config).unwrap(), temp_dir)
    }

    #[tokio::test]
    async fn test_empty_store_has_no_root() {
        let (service, _temp) = create_test_service(64).await;
        assert!(service.get_root_with_children().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_root_tree_is_fully_nested() {
        // Small pages force the loader to walk several pages per parent
        let (service, _temp) = create_test_service(2).await;
        assert!(service.seed_if_empty().await.unwrap());
        assert!(!service.seed_if_empty().await.unwrap());

        let tree = service.get_root_with_children().await.unwrap().unwrap();

        assert_eq!(tree.node.id, 1);
        assert_eq!(tree.len(), 7);
        let child_ids: Vec<i64> = tree.children.iter().map(|c| c.node.id).collect();
        assert_eq!(child_ids, vec![2, 3]);
        let node_21 = tree.find(4).unwrap();
        assert_eq!(node_21.children.len(), 2);
    }

    #[tokio::test]
    async fn test_removed_descendants_stay_in_tree() {
        let (service, _temp) = create_test_service(64).await;
        service.reset().await.unwrap();
        service
            .apply_changes(&ChangeSet::new().with_remove(4))
            .await
            .unwrap();

        let tree = service.get_root_with_children().await.unwrap().unwrap();
        assert_eq!(tree.len(), 7);
        assert!(tree.find(5).unwrap().node.is_removed);
        assert!(!tree.find(7).unwrap().node.is_removed);
    }

    #[tokio::test]
    async fn test_removed_root_is_ignored_and_two_live_roots_conflict() {
        let (service, _temp) = create_test_service(64).await;
        service.reset().await.unwrap();

        service
            .apply_changes(&ChangeSet::new().with_insert(NewNodeDto::new(50, None, "Second")))
            .await
            .unwrap();
        assert!(matches!(
            service.get_root_with_children().await,
            Err(TreeServiceError::ConsistencyViolation(_))
        ));

        service
            .apply_changes(&ChangeSet::new().with_remove(1))
            .await
            .unwrap();
        let tree = service.get_root_with_children().await.unwrap().unwrap();
        assert_eq!(tree.node.id, 50);
    }

    #[tokio::test]
    async fn test_get_node_and_filter_removed() {
        let (service, _temp) = create_test_service(64).await;
        service.reset().await.unwrap();

        assert_eq!(service.get_node(7).await.unwrap().name, "Node 2.2");
        assert!(matches!(
            service.get_node(99).await,
            Err(TreeServiceError::NodeNotFound { id: 99 })
        ));

        service
            .apply_changes(&ChangeSet::new().with_remove(3))
            .await
            .unwrap();
        let removed = service.filter_removed(vec![2, 5, 7, 99]).await.unwrap();
        assert_eq!(removed, vec![5, 7]);
    }

    #[tokio::test]
    async fn test_reset_discards_applied_changes() {
        let (service, _temp) = create_test_service(64).await;
        service.reset().await.unwrap();
        service
            .apply_changes(
                &ChangeSet::new()
                    .with_insert(NewNodeDto::new(100, Some(1), "Temp"))
                    .with_remove(2),
            )
            .await
            .unwrap();

        service.reset().await.unwrap();

        assert!(matches!(
            service.get_node(100).await,
            Err(TreeServiceError::NodeNotFound { .. })
        ));
        assert!(!service.get_node(2).await.unwrap().is_removed);
    }

    #[tokio::test]
    async fn test_rejected_root_insert_keeps_tree_readable() {
        let (service, _temp) = create_test_service(64).await;
        service.reset().await.unwrap();

        let result = service
            .apply_changes(&ChangeSet::new().with_insert(NewNodeDto::new(100, None, "Rival")))
            .await;

        assert!(matches!(
            result,
            Err(TreeServiceError::ConsistencyViolation(_))
        ));
        let root = service.get_root_with_children().await.unwrap().unwrap();
        assert_eq!(root.node.id, 1);
        assert_eq!(root.len(), 7);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let db = runtime
            .block_on(DatabaseService::new(temp_dir.path().join("test.db")))
            .unwrap();
        let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(Arc::new(db)));

        let result = TreeService::new(store, TreeServiceConfig::default().with_cascade_batch_size(1));
        assert!(result.is_err());
    }
}
