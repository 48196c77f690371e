//! Cascade Remover
//!
//! Flags every transitive descendant of a set of already-removed nodes as
//! removed. The walk is breadth-first over an explicit queue, and children are
//! read and written in pages of `cascade_batch_size`, so neither the call stack
//! nor memory grows with the depth or the size of the store.
//!
//! Each page is written in its own transaction. If the store fails mid-way the
//! committed pages stay flagged; running the same cascade again skips nothing
//! and re-flags them as no-op writes, so a retried request converges.

use crate::config::TreeServiceConfig;
use crate::db::{NodeStore, WriteOutcome};
use crate::models::FieldUpdate;
use crate::services::error::TreeServiceError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Summary of one cascade run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    /// Ids the cascade was seeded with
    pub roots: usize,
    /// Pages written (one transaction each)
    pub pages: usize,
    /// Descendants flagged, no-op rewrites included
    pub nodes_flagged: usize,
}

pub struct CascadeRemover {
    store: Arc<dyn NodeStore>,
    batch_size: usize,
}

impl CascadeRemover {
    pub fn new(store: Arc<dyn NodeStore>, config: &TreeServiceConfig) -> Self {
        Self {
            store,
            batch_size: config.cascade_batch_size,
        }
    }

    /// Flag all descendants of `roots` as removed
    ///
    /// The roots themselves are expected to be flagged already.
    pub async fn cascade<I>(&self, roots: I) -> Result<CascadeReport, TreeServiceError>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut queue: VecDeque<i64> = roots.into_iter().collect();
        let mut report = CascadeReport {
            roots: queue.len(),
            ..CascadeReport::default()
        };
        let limit = self.batch_size as u64;

        while let Some(parent_id) = queue.pop_front() {
            let total = self.store.count_children(parent_id).await?;
            let mut offset = 0;

            while offset < total {
                let page = self.store.children_of(parent_id, offset, limit).await?;
                if page.is_empty() {
                    break;
                }

                let updates = page
                    .iter()
                    .map(|child| FieldUpdate::mark_removed(child.id))
                    .collect::<Vec<_>>();

                if let WriteOutcome::MissingNode { id } = self.store.set_fields(updates).await? {
                    return Err(TreeServiceError::consistency(format!(
                        "node {} disappeared during cascade under {}",
                        id, parent_id
                    )));
                }

                tracing::debug!(
                    "Cascade page under {}: offset {}, {} children",
                    parent_id,
                    offset,
                    page.len()
                );

                report.pages += 1;
                report.nodes_flagged += page.len();
                offset += page.len() as u64;

                // A self-parented row would re-enqueue itself forever
                queue.extend(
                    page.iter()
                        .map(|child| child.id)
                        .filter(|&id| id != parent_id),
                );
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseService, TursoStore};
    use crate::models::{seed_tree, Node, NodeField};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Delegating store that records the size of every bulk write
    struct RecordingStore {
        inner: TursoStore,
        writes: Mutex<Vec<usize>>,
        fail_after_writes: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl NodeStore for RecordingStore {
        async fn get_node(&self, id: i64) -> anyhow::Result<Option<Node>> {
            self.inner.get_node(id).await
        }

        async fn get_roots(&self) -> anyhow::Result<Vec<Node>> {
            self.inner.get_roots().await
        }

        async fn children_of(
            &self,
            parent_id: i64,
            offset: u64,
            limit: u64,
        ) -> anyhow::Result<Vec<Node>> {
            self.inner.children_of(parent_id, offset, limit).await
        }

        async fn count_children(&self, parent_id: i64) -> anyhow::Result<u64> {
            self.inner.count_children(parent_id).await
        }

        async fn bulk_insert(&self, nodes: Vec<Node>) -> anyhow::Result<()> {
            self.inner.bulk_insert(nodes).await
        }

        async fn set_fields(&self, updates: Vec<FieldUpdate>) -> anyhow::Result<WriteOutcome> {
            {
                let mut writes = self.writes.lock().unwrap();
                if Some(writes.len()) == *self.fail_after_writes.lock().unwrap() {
                    anyhow::bail!("simulated store outage");
                }
                writes.push(updates.len());
            }
            self.inner.set_fields(updates).await
        }

        async fn filter_removed(&self, ids: Vec<i64>) -> anyhow::Result<Vec<i64>> {
            self.inner.filter_removed(ids).await
        }

        async fn replace_all(&self, nodes: Vec<Node>) -> anyhow::Result<()> {
            self.inner.replace_all(nodes).await
        }
    }

    async fn create_test_store(
        nodes: Vec<Node>,
        fail_after_writes: Option<usize>,
    ) -> (Arc<RecordingStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let inner = TursoStore::new(Arc::new(db));
        inner.replace_all(nodes).await.unwrap();
        let store = RecordingStore {
            inner,
            writes: Mutex::new(Vec::new()),
            fail_after_writes: Mutex::new(fail_after_writes),
        };
        (Arc::new(store), temp_dir)
    }

    fn remover(store: Arc<RecordingStore>, batch: usize) -> CascadeRemover {
        let config = TreeServiceConfig::default().with_cascade_batch_size(batch);
        CascadeRemover::new(store, &config)
    }

    async fn removed_ids(store: &RecordingStore) -> Vec<i64> {
        store.filter_removed((1..=7).collect()).await.unwrap()
    }

    #[tokio::test]
    async fn test_cascade_flags_whole_subtree_only() {
        let (store, _temp) = create_test_store(seed_tree(), None).await;
        store.set_field(3, NodeField::Removed(true)).await.unwrap();

        let report = remover(store.clone(), 64).cascade([3]).await.unwrap();

        assert_eq!(report.roots, 1);
        assert_eq!(report.nodes_flagged, 4);
        assert_eq!(removed_ids(&store).await, vec![3, 4, 5, 6, 7]);
        // Node 1 (id 2) is a sibling and stays untouched
        assert!(!store.get_node(2).await.unwrap().unwrap().is_removed);
        assert!(!store.get_node(1).await.unwrap().unwrap().is_removed);
    }

    #[tokio::test]
    async fn test_cascade_pages_respect_batch_size() {
        let mut nodes = vec![Node::root(1, "Root")];
        nodes.extend((10..15).map(|id| Node::new(id, Some(1), format!("Child {}", id))));
        let (store, _temp) = create_test_store(nodes, None).await;

        let report = remover(store.clone(), 2).cascade([1]).await.unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.nodes_flagged, 5);
        assert_eq!(*store.writes.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_cascade_is_idempotent() {
        let (store, _temp) = create_test_store(seed_tree(), None).await;
        store.set_field(3, NodeField::Removed(true)).await.unwrap();

        let cascade = remover(store.clone(), 2);
        let first = cascade.cascade([3]).await.unwrap();
        let after_first = removed_ids(&store).await;
        let second = cascade.cascade([3]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(removed_ids(&store).await, after_first);
    }

    #[tokio::test]
    async fn test_leaf_terminates_without_writes() {
        let (store, _temp) = create_test_store(seed_tree(), None).await;

        let report = remover(store.clone(), 64).cascade([5]).await.unwrap();

        assert_eq!(report.pages, 0);
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_cascade_resumes_on_retry() {
        let (store, _temp) = create_test_store(seed_tree(), Some(1)).await;
        store.inner.set_field(3, NodeField::Removed(true)).await.unwrap();

        let result = remover(store.clone(), 64).cascade([3]).await;
        assert!(matches!(result, Err(TreeServiceError::Store(_))));
        // First page (children of 3) committed before the failure
        assert_eq!(removed_ids(&store).await, vec![3, 4, 7]);

        *store.fail_after_writes.lock().unwrap() = None;
        remover(store.clone(), 64).cascade([3]).await.unwrap();
        assert_eq!(removed_ids(&store).await, vec![3, 4, 5, 6, 7]);
    }
}
