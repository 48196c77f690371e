//! TursoStore - NodeStore Implementation for the libsql Backend
//!
//! This module implements the `NodeStore` trait on top of `DatabaseService`.
//!
//! # Design Principles
//!
//! 1. **Pure Delegation**: All SQL lives in `DatabaseService`
//! 2. **Row Conversion**: Handles libsql::Row → Node model conversion
//! 3. **No Business Logic**: Validation and cascading live in the services

use crate::db::node_store::NodeStore;
use crate::db::{DatabaseService, DbInsertNodeParams, WriteOutcome};
use crate::models::{FieldUpdate, Node};
use anyhow::{Context, Result};
use async_trait::async_trait;
use libsql::Row;
use std::sync::Arc;

/// TursoStore implements NodeStore for the libsql backend
pub struct TursoStore {
    /// Underlying database service
    db: Arc<DatabaseService>,
}

impl TursoStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Total number of stored nodes, removed ones included
    pub async fn count_nodes(&self) -> Result<u64> {
        self.db
            .db_count_nodes()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count nodes: {}", e))
    }

    /// Convert libsql::Row to Node model
    ///
    /// # Row Format
    ///
    /// Expected columns (in order):
    /// - id (INTEGER)
    /// - parent_id (INTEGER, nullable)
    /// - name (TEXT)
    /// - is_removed (INTEGER 0/1)
    fn row_to_node(row: &Row) -> Result<Node> {
        let id: i64 = row.get(0).context("Failed to get id")?;
        let parent_id: Option<i64> = row.get(1).context("Failed to get parent_id")?;
        let name: String = row.get(2).context("Failed to get name")?;
        let is_removed: i64 = row.get(3).context("Failed to get is_removed")?;

        Ok(Node {
            id,
            parent_id,
            name,
            is_removed: is_removed != 0,
        })
    }

    async fn collect_nodes(mut rows: libsql::Rows) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read row: {}", e))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    fn insert_params(nodes: &[Node]) -> Vec<DbInsertNodeParams<'_>> {
        nodes
            .iter()
            .map(|node| DbInsertNodeParams {
                id: node.id,
                parent_id: node.parent_id,
                name: &node.name,
                is_removed: node.is_removed,
            })
            .collect()
    }
}

#[async_trait]
impl NodeStore for TursoStore {
    async fn get_node(&self, id: i64) -> Result<Option<Node>> {
        match self
            .db
            .db_get_node(id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get node: {}", e))?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn get_roots(&self) -> Result<Vec<Node>> {
        let rows = self
            .db
            .db_get_roots()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get roots: {}", e))?;
        Self::collect_nodes(rows).await
    }

    async fn children_of(&self, parent_id: i64, offset: u64, limit: u64) -> Result<Vec<Node>> {
        let rows = self
            .db
            .db_get_children_page(parent_id, offset, limit)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get children of {}: {}", parent_id, e))?;
        Self::collect_nodes(rows).await
    }

    async fn count_children(&self, parent_id: i64) -> Result<u64> {
        self.db
            .db_count_children(parent_id)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to count children of {}: {}", parent_id, e))
    }

    async fn bulk_insert(&self, nodes: Vec<Node>) -> Result<()> {
        let params = Self::insert_params(&nodes);
        self.db
            .db_batch_insert_nodes(&params)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to insert nodes: {}", e))
    }

    async fn set_fields(&self, updates: Vec<FieldUpdate>) -> Result<WriteOutcome> {
        self.db
            .db_batch_set_fields(&updates)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to update nodes: {}", e))
    }

    async fn filter_removed(&self, ids: Vec<i64>) -> Result<Vec<i64>> {
        self.db
            .db_filter_removed(&ids)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to filter removed ids: {}", e))
    }

    async fn replace_all(&self, nodes: Vec<Node>) -> Result<()> {
        let params = Self::insert_params(&nodes);
        self.db
            .db_replace_all(&params)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to replace nodes: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{seed_tree, NodeField};
    use tempfile::TempDir;

    async fn create_test_store() -> (TursoStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (TursoStore::new(Arc::new(db)), temp_dir)
    }

    #[tokio::test]
    async fn test_round_trip_through_store() {
        let (store, _temp) = create_test_store().await;
        store.replace_all(seed_tree()).await.unwrap();

        let node = store.get_node(4).await.unwrap().unwrap();
        assert_eq!(node, Node::new(4, Some(3), "Node 2.1"));
        assert!(store.get_node(404).await.unwrap().is_none());

        let roots = store.get_roots().await.unwrap();
        assert_eq!(roots, vec![Node::root(1, "Root")]);
    }

    #[tokio::test]
    async fn test_set_field_touches_only_its_column() {
        let (store, _temp) = create_test_store().await;
        store.replace_all(seed_tree()).await.unwrap();

        store
            .set_field(5, NodeField::Removed(true))
            .await
            .unwrap();
        let outcome = store
            .set_field(5, NodeField::Name("Leaf".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Applied { rows: 1 });

        let node = store.get_node(5).await.unwrap().unwrap();
        assert_eq!(node.name, "Leaf");
        assert_eq!(node.parent_id, Some(4));
        assert!(node.is_removed);
    }

    #[tokio::test]
    async fn test_replace_all_discards_previous_rows() {
        let (store, _temp) = create_test_store().await;
        store
            .bulk_insert(vec![Node::root(100, "Old root"), Node::new(101, Some(100), "Old")])
            .await
            .unwrap();

        store.replace_all(seed_tree()).await.unwrap();

        assert!(store.get_node(100).await.unwrap().is_none());
        assert_eq!(store.count_nodes().await.unwrap(), 7);
        assert_eq!(store.count_children(3).await.unwrap(), 2);
    }
}
