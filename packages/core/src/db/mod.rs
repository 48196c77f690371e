//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management (`DatabaseService`)
//! - The `NodeStore` abstraction consumed by the services
//! - `TursoStore`, the libsql implementation of `NodeStore`
//!
//! # Architecture
//!
//! The store offers point lookups, paged "children of parent" scans, bulk
//! inserts and column-precise bulk updates. Everything that needs tree-wide
//! reasoning (cascading, validation) is built on top of those primitives in
//! the service layer.

mod database;
mod error;
mod node_store;
mod turso_store;

pub use database::{DatabaseService, DbInsertNodeParams, WriteOutcome};
pub use error::DatabaseError;
pub use node_store::NodeStore;
pub use turso_store::TursoStore;
