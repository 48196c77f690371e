//! UI collaborator consumed by the editor session

use crate::models::NodeTree;
use crate::staging::cache::StagingCache;

/// What the session needs from whatever renders the trees
pub trait TreeView {
    /// Id of the staged node the user has selected, if any
    fn focused_node_id(&self) -> Option<i64>;

    /// Called after every session operation that changed what is shown
    fn refresh(&mut self, staged: &StagingCache, server_tree: Option<&NodeTree>);
}
