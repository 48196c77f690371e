//! Transport seam between the editor session and the tree server
//!
//! `TreeApi` is implemented over HTTP by the server crate and in-process by
//! `LocalTreeApi`, which calls a `TreeService` directly.

use crate::models::{ChangeSet, Node, NodeTree};
use crate::services::{TreeService, TreeServiceError};
use crate::staging::error::ApiError;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TreeApi: Send + Sync {
    /// The live root with its whole subtree, or `None` for an empty tree
    async fn get_root(&self) -> Result<Option<NodeTree>, ApiError>;

    /// A single node without children
    async fn get_node(&self, id: i64) -> Result<Node, ApiError>;

    async fn apply_changes(&self, changes: &ChangeSet) -> Result<(), ApiError>;

    /// Restore the server tree to its seed state
    async fn reset(&self) -> Result<(), ApiError>;

    /// The subset of `ids` currently removed on the server
    async fn filter_removed(&self, ids: Vec<i64>) -> Result<Vec<i64>, ApiError>;
}

impl From<TreeServiceError> for ApiError {
    fn from(err: TreeServiceError) -> Self {
        match err {
            TreeServiceError::NodeNotFound { id } => ApiError::NotFound { id },
            TreeServiceError::ConsistencyViolation(_) => ApiError::server(409, err.to_string()),
            TreeServiceError::InvalidChangeSet(_) => ApiError::server(400, err.to_string()),
            TreeServiceError::Database(_) | TreeServiceError::Store(_) => {
                ApiError::server(500, err.to_string())
            }
        }
    }
}

/// `TreeApi` backed by an in-process `TreeService`
#[derive(Clone)]
pub struct LocalTreeApi {
    service: Arc<TreeService>,
}

impl LocalTreeApi {
    pub fn new(service: Arc<TreeService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TreeApi for LocalTreeApi {
    async fn get_root(&self) -> Result<Option<NodeTree>, ApiError> {
        Ok(self.service.get_root_with_children().await?)
    }

    async fn get_node(&self, id: i64) -> Result<Node, ApiError> {
        Ok(self.service.get_node(id).await?)
    }

    async fn apply_changes(&self, changes: &ChangeSet) -> Result<(), ApiError> {
        self.service.apply_changes(changes).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), ApiError> {
        Ok(self.service.reset().await?)
    }

    async fn filter_removed(&self, ids: Vec<i64>) -> Result<Vec<i64>, ApiError> {
        Ok(self.service.filter_removed(ids).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(TreeServiceError::node_not_found(3)),
            ApiError::NotFound { id: 3 }
        );
        assert!(matches!(
            ApiError::from(TreeServiceError::consistency("x")),
            ApiError::Server { status: 409, .. }
        ));
        assert!(matches!(
            ApiError::from(TreeServiceError::invalid_change_set("x")),
            ApiError::Server { status: 400, .. }
        ));
        assert!(matches!(
            ApiError::from(TreeServiceError::Store(anyhow::anyhow!("down"))),
            ApiError::Server { status: 500, .. }
        ));
    }
}
