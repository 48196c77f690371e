//! Editor Session
//!
//! Client orchestrator that binds a `StagingCache` to a `TreeApi` transport and
//! a `TreeView`. Local edits go to the cache; the server is only contacted to
//! load or pull nodes, submit, and reset.
//!
//! Every network call is made once. When it fails the error is returned and
//! the cache is left as it was before that call.

use crate::models::{ChangeSet, NodeTree};
use crate::staging::api::TreeApi;
use crate::staging::cache::StagingCache;
use crate::staging::error::{SessionError, StagingError};
use crate::staging::view::TreeView;
use std::sync::Arc;

/// What a successful submit sent and learned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub change_set: ChangeSet,
    /// Staged ids the server reported removed by its cascade
    pub newly_removed: Vec<i64>,
}

pub struct EditorSession<V: TreeView> {
    api: Arc<dyn TreeApi>,
    view: V,
    cache: StagingCache,
    server_tree: Option<NodeTree>,
}

impl<V: TreeView> EditorSession<V> {
    pub fn new(api: Arc<dyn TreeApi>, view: V) -> Self {
        Self {
            api,
            view,
            cache: StagingCache::new(),
            server_tree: None,
        }
    }

    pub fn cache(&self) -> &StagingCache {
        &self.cache
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Last server tree fetched by `load_root` or `reset`
    pub fn server_tree(&self) -> Option<&NodeTree> {
        self.server_tree.as_ref()
    }

    /// Fetch the server tree the user pulls nodes from
    pub async fn load_root(&mut self) -> Result<Option<&NodeTree>, SessionError> {
        self.server_tree = self.api.get_root().await?;
        self.refresh();
        Ok(self.server_tree.as_ref())
    }

    /// Stage a server node by id
    ///
    /// Returns `false` without a request when the node is already staged.
    pub async fn pull_node(&mut self, id: i64) -> Result<bool, SessionError> {
        if self.cache.contains(id) {
            return Ok(false);
        }
        let node = self.api.get_node(id).await?;
        let added = self.cache.add_db_node(&node);
        self.refresh();
        Ok(added)
    }

    /// Create a New node under the focused node
    pub fn add_new_node(&mut self) -> Result<i64, SessionError> {
        let parent_id = self.focused()?;
        let id = self.cache.add_new_node(parent_id)?;
        self.refresh();
        Ok(id)
    }

    pub fn rename_focused_node(&mut self, name: impl Into<String>) -> Result<(), SessionError> {
        let id = self.focused()?;
        self.cache.rename_node(id, name)?;
        self.refresh();
        Ok(())
    }

    pub fn remove_focused_node(&mut self) -> Result<(), SessionError> {
        let id = self.focused()?;
        self.cache.remove_node(id)?;
        self.refresh();
        Ok(())
    }

    /// Send all staged edits as one change set
    ///
    /// Returns `Ok(None)` without a request when nothing is staged. After the
    /// server accepts the change set, pending state is cleared and staged
    /// nodes whose removed ancestor was never pulled are re-checked.
    pub async fn submit(&mut self) -> Result<Option<SubmitReport>, SessionError> {
        let change_set = self.cache.get_change_model();
        if change_set.is_empty() {
            return Ok(None);
        }

        let ambiguous = self.cache.get_node_ids_which_need_to_refresh_removed_state();

        self.api.apply_changes(&change_set).await?;
        self.cache.reset_unsaved_state_for_all_nodes();
        self.refresh();

        let newly_removed = if ambiguous.is_empty() {
            Vec::new()
        } else {
            let removed = self.api.filter_removed(ambiguous).await?;
            self.cache.mark_nodes_as_removed(&removed);
            self.refresh();
            removed
        };

        tracing::debug!(
            "Submitted change set, {} staged nodes removed by cascade",
            newly_removed.len()
        );

        Ok(Some(SubmitReport {
            change_set,
            newly_removed,
        }))
    }

    /// Reset the server tree, drop every staged node and reload the root
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.api.reset().await?;
        let root = self.api.get_root().await?;
        self.cache.clear();
        self.server_tree = root;
        self.refresh();
        Ok(())
    }

    fn focused(&self) -> Result<i64, StagingError> {
        self.view
            .focused_node_id()
            .ok_or(StagingError::NoFocusedNode)
    }

    fn refresh(&mut self) {
        self.view.refresh(&self.cache, self.server_tree.as_ref());
    }
}

// Session tests against an in-process server and a failing transport
#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
