//! NodeStore Trait - Database Abstraction Layer
//!
//! This module defines the `NodeStore` trait that abstracts persistence of the
//! node tree. The cascade remover, the change applier and the tree service only
//! talk to this trait, never to SQL directly.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All methods are async so that embedded and networked
//!    backends fit the same interface
//! 2. **Ownership Semantics**: Methods take ownership of values to avoid
//!    unnecessary cloning (caller can clone if needed)
//! 3. **Error Handling**: Uses `anyhow::Result` for flexible error context;
//!    expected outcomes such as an unknown id are values, not errors
//! 4. **Bounded Reads**: Children are read page by page, there is no
//!    "load everything" method
//!
//! # Examples
//!
//! ```rust,no_run
//! use treestage_core::db::{DatabaseService, NodeStore, TursoStore};
//! use treestage_core::models::Node;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/tree.db")).await?);
//!     let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));
//!
//!     store.bulk_insert(vec![Node::root(1, "Root")]).await?;
//!     let root = store.get_node(1).await?;
//!     assert!(root.is_some());
//!     Ok(())
//! }
//! ```

use crate::db::WriteOutcome;
use crate::models::{FieldUpdate, Node, NodeField};
use anyhow::Result;
use async_trait::async_trait;

/// Abstraction layer for node persistence operations
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow usage in async contexts where
/// futures may be moved between threads.
///
/// # Method Categories
///
/// - **Reads**: point get, roots, paged children, child count, removed filter
/// - **Writes**: bulk insert, field-level update, bulk field-level update
/// - **Lifecycle**: replace everything (reset)
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Get node by ID
    ///
    /// # Returns
    ///
    /// - `Ok(Some(node))` if node exists
    /// - `Ok(None)` if node doesn't exist (not an error)
    /// - `Err(_)` if database error occurs
    async fn get_node(&self, id: i64) -> Result<Option<Node>>;

    /// Every node without a parent, removed ones included, ordered by id
    async fn get_roots(&self) -> Result<Vec<Node>>;

    /// One page of direct children of `parent_id`, ordered by id
    ///
    /// Ordering is stable under field updates, so callers can walk all
    /// children with increasing `offset` while flagging them.
    async fn children_of(&self, parent_id: i64, offset: u64, limit: u64) -> Result<Vec<Node>>;

    /// Number of direct children of `parent_id`
    async fn count_children(&self, parent_id: i64) -> Result<u64>;

    /// Insert nodes in one unit of work
    ///
    /// Nodes must be ordered parents-first. Fails (and writes nothing) on a
    /// duplicate id or a dangling parent.
    async fn bulk_insert(&self, nodes: Vec<Node>) -> Result<()>;

    /// Write one column of one node, leaving every other column untouched
    async fn set_field(&self, id: i64, field: NodeField) -> Result<WriteOutcome> {
        self.set_fields(vec![FieldUpdate { id, field }]).await
    }

    /// Apply field-level updates in one unit of work
    ///
    /// Returns `WriteOutcome::MissingNode` (and writes nothing) if any update
    /// addresses an unknown id.
    async fn set_fields(&self, updates: Vec<FieldUpdate>) -> Result<WriteOutcome>;

    /// The subset of `ids` that exist and are flagged removed, ascending
    async fn filter_removed(&self, ids: Vec<i64>) -> Result<Vec<i64>>;

    /// Drop every node and insert `nodes` (parents-first) in one unit of work
    async fn replace_all(&self, nodes: Vec<Node>) -> Result<()>;
}
