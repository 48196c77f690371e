//! Tests for the editor session
//!
//! Runs the session against a real `TreeService` on a temporary database,
//! wrapped in a transport that counts calls and can be told to fail.

#[cfg(test)]
mod tests {
    use crate::config::TreeServiceConfig;
    use crate::db::{DatabaseService, NodeStore, TursoStore};
    use crate::models::{ChangeSet, Node, NodeTree};
    use crate::services::TreeService;
    use crate::staging::api::{LocalTreeApi, TreeApi};
    use crate::staging::error::{ApiError, SessionError, StagingError};
    use crate::staging::node::UnsavedState;
    use crate::staging::session::EditorSession;
    use crate::staging::view::TreeView;
    use crate::staging::StagingCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingView {
        focus: Option<i64>,
        refreshes: usize,
        staged_count: usize,
    }

    impl TreeView for RecordingView {
        fn focused_node_id(&self) -> Option<i64> {
            self.focus
        }

        fn refresh(&mut self, staged: &StagingCache, _server_tree: Option<&NodeTree>) {
            self.refreshes += 1;
            self.staged_count = staged.len();
        }
    }

    struct FlakyApi {
        inner: LocalTreeApi,
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl FlakyApi {
        fn check(&self) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::transport("connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TreeApi for FlakyApi {
        async fn get_root(&self) -> Result<Option<NodeTree>, ApiError> {
            self.check()?;
            self.inner.get_root().await
        }

        async fn get_node(&self, id: i64) -> Result<Node, ApiError> {
            self.check()?;
            self.inner.get_node(id).await
        }

        async fn apply_changes(&self, changes: &ChangeSet) -> Result<(), ApiError> {
            self.check()?;
            self.inner.apply_changes(changes).await
        }

        async fn reset(&self) -> Result<(), ApiError> {
            self.check()?;
            self.inner.reset().await
        }

        async fn filter_removed(&self, ids: Vec<i64>) -> Result<Vec<i64>, ApiError> {
            self.check()?;
            self.inner.filter_removed(ids).await
        }
    }

    struct Harness {
        session: EditorSession<RecordingView>,
        api: Arc<FlakyApi>,
        service: Arc<TreeService>,
        _temp_dir: TempDir,
    }

    impl Harness {
        fn focus(&mut self, id: i64) {
            self.session.view_mut().focus = Some(id);
        }

        fn calls(&self) -> usize {
            self.api.calls.load(Ordering::SeqCst)
        }
    }

    async fn create_test_session() -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let db = DatabaseService::new(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(Arc::new(db)));
        let config = TreeServiceConfig::default().with_cascade_batch_size(2);
        let service = Arc::new(TreeService::new(store, config).unwrap());
        service.reset().await.unwrap();

        let api = Arc::new(FlakyApi {
            inner: LocalTreeApi::new(service.clone()),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        });
        let session = EditorSession::new(api.clone(), RecordingView::default());

        Harness {
            session,
            api,
            service,
            _temp_dir: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_load_root_exposes_server_tree() {
        let mut h = create_test_session().await;

        let root = h.session.load_root().await.unwrap().cloned().unwrap();

        assert_eq!(root.node.id, 1);
        assert_eq!(root.len(), 7);
        assert!(h.session.cache().is_empty());
        assert_eq!(h.session.view().refreshes, 1);
    }

    #[tokio::test]
    async fn test_submit_persists_staged_edits() {
        let mut h = create_test_session().await;
        for id in [1, 2, 3] {
            assert!(h.session.pull_node(id).await.unwrap());
        }

        h.focus(2);
        h.session.rename_focused_node("Renamed").unwrap();
        h.focus(1);
        let new_id = h.session.add_new_node().unwrap();
        h.focus(3);
        h.session.remove_focused_node().unwrap();

        let report = h.session.submit().await.unwrap().unwrap();

        assert_eq!(report.change_set.nodes_to_insert[0].id, new_id);
        assert!(report.newly_removed.is_empty());

        assert_eq!(h.service.get_node(2).await.unwrap().name, "Renamed");
        assert_eq!(h.service.get_node(new_id).await.unwrap().parent_id, Some(1));
        let removed = h.service.filter_removed(vec![3, 4, 5, 6, 7]).await.unwrap();
        assert_eq!(removed, vec![3, 4, 5, 6, 7]);

        let cache = h.session.cache();
        assert!(cache.get_change_model().is_empty());
        assert_eq!(cache.get(new_id).unwrap().unsaved_state, UnsavedState::Unmodified);
        assert!(cache.get(3).unwrap().is_removed);
    }

    #[tokio::test]
    async fn test_submit_refreshes_orphan_subtrees_removed_by_cascade() {
        let mut h = create_test_session().await;
        // Node 2.1 and its child are staged without their parent Node 2
        for id in [1, 4, 5] {
            h.session.pull_node(id).await.unwrap();
        }

        h.focus(1);
        h.session.remove_focused_node().unwrap();
        assert!(!h.session.cache().get(4).unwrap().is_removed);

        let report = h.session.submit().await.unwrap().unwrap();

        assert_eq!(
            report.change_set.nodes_to_remove.iter().copied().collect::<Vec<_>>(),
            vec![1]
        );
        assert_eq!(report.newly_removed, vec![4, 5]);
        assert!(h.session.cache().get(4).unwrap().is_removed);
        assert!(h.session.cache().get(5).unwrap().is_removed);
    }

    #[tokio::test]
    async fn test_empty_submit_makes_no_request() {
        let mut h = create_test_session().await;
        h.session.pull_node(1).await.unwrap();
        let calls_before = h.calls();

        assert!(h.session.submit().await.unwrap().is_none());
        assert_eq!(h.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_pull_of_staged_node_makes_no_request() {
        let mut h = create_test_session().await;
        assert!(h.session.pull_node(1).await.unwrap());
        let calls_before = h.calls();

        assert!(!h.session.pull_node(1).await.unwrap());
        assert_eq!(h.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_failed_submit_leaves_cache_untouched() {
        let mut h = create_test_session().await;
        h.session.pull_node(1).await.unwrap();
        h.session.pull_node(2).await.unwrap();
        h.focus(2);
        h.session.rename_focused_node("Pending").unwrap();
        let before = h.session.cache().get_change_model();

        h.api.fail.store(true, Ordering::SeqCst);
        let result = h.session.submit().await;

        assert!(matches!(
            result,
            Err(SessionError::Api(ApiError::Transport(_)))
        ));
        assert_eq!(h.session.cache().get_change_model(), before);
        assert_eq!(h.service.get_node(2).await.unwrap().name, "Node 1");
    }

    #[tokio::test]
    async fn test_server_rejection_is_surfaced() {
        let mut h = create_test_session().await;
        h.session.pull_node(1).await.unwrap();
        h.focus(1);
        let new_id = h.session.add_new_node().unwrap();
        h.session.submit().await.unwrap();

        // The server forgets the persisted node behind the session's back
        h.service.reset().await.unwrap();
        h.focus(new_id);
        h.session.rename_focused_node("Ghost").unwrap();
        let result = h.session.submit().await;

        assert!(matches!(
            result,
            Err(SessionError::Api(ApiError::Server { status: 409, .. }))
        ));
        assert_eq!(
            h.session.cache().get(new_id).unwrap().unsaved_state,
            UnsavedState::Renamed
        );

        let missing = h.session.pull_node(404).await;
        assert!(matches!(
            missing,
            Err(SessionError::Api(ApiError::NotFound { id: 404 }))
        ));
    }

    #[tokio::test]
    async fn test_operations_require_focus() {
        let mut h = create_test_session().await;
        h.session.pull_node(1).await.unwrap();

        assert_eq!(
            h.session.add_new_node(),
            Err(SessionError::Staging(StagingError::NoFocusedNode))
        );

        h.focus(99);
        assert_eq!(
            h.session.remove_focused_node(),
            Err(SessionError::Staging(StagingError::UnknownNode { id: 99 }))
        );
    }

    #[tokio::test]
    async fn test_reset_discards_staged_nodes_and_server_edits() {
        let mut h = create_test_session().await;
        h.session.pull_node(1).await.unwrap();
        h.focus(1);
        h.session.add_new_node().unwrap();
        h.session.submit().await.unwrap();
        assert_eq!(h.session.view().staged_count, 2);

        h.session.reset().await.unwrap();

        assert!(h.session.cache().is_empty());
        assert_eq!(h.session.view().staged_count, 0);
        assert_eq!(h.session.server_tree().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_failed_reset_keeps_cache() {
        let mut h = create_test_session().await;
        h.session.pull_node(1).await.unwrap();
        h.api.fail.store(true, Ordering::SeqCst);

        assert!(h.session.reset().await.is_err());
        assert_eq!(h.session.cache().len(), 1);
    }
}
