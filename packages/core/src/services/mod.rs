//! Business Services
//!
//! This module contains the server-side business logic:
//!
//! - `TreeService` - Facade used by the HTTP layer and in-process clients
//! - `ChangeApplier` - Validates and applies a `ChangeSet` phase by phase
//! - `CascadeRemover` - Paged, queue-driven removal of whole subtrees
//!
//! Services coordinate between the `NodeStore` abstraction and the request
//! layer; none of them issue SQL directly.

pub mod cascade_remover;
pub mod change_applier;
pub mod error;
pub mod tree_service;

pub use cascade_remover::{CascadeRemover, CascadeReport};
pub use change_applier::{flatten_insert_forest, ApplyReport, ChangeApplier};
pub use error::TreeServiceError;
pub use tree_service::TreeService;
