//! Client-Side Staging
//!
//! This module contains everything an editing client needs:
//!
//! - `StagingCache` - Overlay of pending edits on pulled server nodes
//! - `EditorSession` - Binds the cache to a `TreeApi` and a `TreeView`
//! - `TreeApi` / `LocalTreeApi` - Transport seam and its in-process adapter
//! - `TreeView` - UI collaborator (focus and refresh)

mod api;
mod cache;
mod error;
mod node;
mod session;
mod view;

pub use api::{LocalTreeApi, TreeApi};
pub use cache::{StagingCache, TempIdGenerator};
pub use error::{ApiError, SessionError, StagingError};
pub use node::{StagedNode, StagedTree, UnsavedState};
pub use session::{EditorSession, SubmitReport};
pub use view::TreeView;
