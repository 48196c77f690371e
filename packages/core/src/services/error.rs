//! Service Layer Error Types
//!
//! This module defines error types for service-layer operations. Each variant
//! maps to one class of request failure (see the HTTP mapping in the server
//! crate).

use crate::db::DatabaseError;
use thiserror::Error;

/// Tree service operation errors
#[derive(Error, Debug)]
pub enum TreeServiceError {
    /// The request references state that contradicts the stored tree
    /// (unknown id, duplicate insert id, dangling insert parent, two live roots)
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    /// The change set itself is malformed
    #[error("Invalid change set: {0}")]
    InvalidChangeSet(String),

    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: i64 },

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Store-level failure reported through the `NodeStore` trait
    #[error("Store operation failed: {0}")]
    Store(#[from] anyhow::Error),
}

impl TreeServiceError {
    /// Create a consistency violation error
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::ConsistencyViolation(msg.into())
    }

    /// Create an invalid change set error
    pub fn invalid_change_set(msg: impl Into<String>) -> Self {
        Self::InvalidChangeSet(msg.into())
    }

    /// Create a node not found error
    pub fn node_not_found(id: i64) -> Self {
        Self::NodeNotFound { id }
    }

    /// Unknown id referenced by an update or remove
    pub fn missing_node(id: i64, phase: &str) -> Self {
        Self::ConsistencyViolation(format!("{} references unknown node {}", phase, id))
    }

    /// True for failures of the storage backend rather than of the request
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Store(_))
    }
}
