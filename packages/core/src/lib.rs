//! treestage Core
//!
//! This crate stages edits against a server-held tree of named nodes and
//! applies them on the server as one change set.
//!
//! # Architecture
//!
//! - **Soft removal**: Nodes are flagged `is_removed`, never deleted, and the
//!   flag cascades to every descendant
//! - **Paged cascade**: The server expands a removal breadth-first in
//!   bounded pages, one transaction per page
//! - **Overlay staging**: The client keeps only the nodes it touched, each
//!   with a pending `UnsavedState`, and diffs them into a minimal `ChangeSet`
//! - **libsql/Turso**: Embedded SQLite-compatible database
//!
//! # Modules
//!
//! - [`models`] - Wire and storage types (Node, NodeTree, ChangeSet)
//! - [`assembler`] - Flat list → forest reconstruction
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - Cascade remover, change applier, tree service
//! - [`staging`] - Staging cache and editor session
//! - [`config`] - Service tunables

pub mod assembler;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod staging;

// Re-export commonly used types
pub use config::{ConfigError, TreeServiceConfig};
pub use models::*;
pub use services::{ApplyReport, CascadeReport, TreeService, TreeServiceError};
pub use staging::{EditorSession, StagingCache, TreeApi, TreeView};
