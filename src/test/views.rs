#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use crate::error::AppError;
    use crate::forms::PageEdit;
    use crate::test::utils::{FakePagesApi, admin, page, super_admin};
    use crate::view::{PageView, ViewState};

    fn resolved_title(view: &PageView) -> String {
        match view.state() {
            ViewState::Resolved(resolved) => resolved.page.title.clone(),
            other => panic!("Expected resolved state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_by_id_resolves_dashboard_props() {
        let mut target = page(7, "Reports", "/reports");
        target.description = Some("Weekly numbers".to_string());
        let api = Arc::new(FakePagesApi::with_pages(vec![target]));
        let mut view = PageView::new(api);

        view.load_by_id(7).await;

        let props = view.dashboard_props().expect("Props should be available");
        assert_eq!(props.page_id, 7);
        assert_eq!(props.title, "Reports");
        assert_eq!(props.description.as_deref(), Some("Weekly numbers"));
        assert!(props.is_custom);
    }

    #[tokio::test]
    async fn test_load_by_id_missing_page_reads_not_found() {
        let api = Arc::new(FakePagesApi::new());
        let mut view = PageView::new(api);

        view.load_by_id(99).await;

        match view.state() {
            ViewState::NotFound(message) => assert_eq!(message, "Page not found"),
            other => panic!("Expected not found, got {:?}", other),
        }
        assert!(view.dashboard_props().is_none());
    }

    #[tokio::test]
    async fn test_load_by_path_matches_exactly() {
        let api = Arc::new(FakePagesApi::with_pages(vec![page(7, "Reports", "/reports")]));

        let mut view = PageView::new(api.clone());
        view.load_by_path("/reports").await;
        assert_eq!(resolved_title(&view), "Reports");

        // No trailing-slash normalization
        let mut strict = PageView::new(api);
        strict.load_by_path("/reports/").await;
        assert!(matches!(strict.state(), ViewState::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stale_outcome_is_dropped() {
        let api = Arc::new(FakePagesApi::new());
        let mut view = PageView::new(api);

        let first = view.begin_load().expect("First token");
        let second = view.begin_load().expect("Second token");

        view.apply(first, Ok(page(1, "Stale", "/stale")));
        assert!(matches!(view.state(), ViewState::Loading));

        view.apply(second, Ok(page(2, "Fresh", "/fresh")));
        assert_eq!(resolved_title(&view), "Fresh");
    }

    #[tokio::test]
    async fn test_not_found_is_terminal() {
        let api = Arc::new(FakePagesApi::with_pages(vec![page(7, "Reports", "/reports")]));
        let mut view = PageView::new(api.clone());

        let token = view.begin_load().expect("Token");
        view.apply(token, Err(AppError::NotFound("Page not found".to_string())));
        assert!(matches!(view.state(), ViewState::NotFound(_)));

        // No further loads are issued from this state
        assert!(view.begin_load().is_none());
        let calls_before = api.get_calls.load(Ordering::SeqCst);
        view.load_by_id(7).await;
        assert_eq!(api.get_calls.load(Ordering::SeqCst), calls_before);
        assert!(matches!(view.state(), ViewState::NotFound(_)));
    }

    #[tokio::test]
    async fn test_backend_failure_message_is_surfaced() {
        let api = Arc::new(FakePagesApi::new());
        api.fail_next(AppError::ExternalService("backend down".to_string()));
        let mut view = PageView::new(api);

        view.load_by_id(7).await;

        match view.state() {
            ViewState::NotFound(message) => assert_eq!(message, "backend down"),
            other => panic!("Expected not found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_editor_is_gated_by_role() {
        let api = Arc::new(FakePagesApi::with_pages(vec![page(7, "Reports", "/reports")]));
        let mut view = PageView::new(api);
        view.load_by_id(7).await;

        assert!(!view.can_modify(&admin()));
        let denied = view.open_editor(&admin());
        assert!(matches!(denied, Err(AppError::Authorization(_))));
        assert!(view.editor_mut().is_none());

        assert!(view.can_modify(&super_admin()));
        view.open_editor(&super_admin()).expect("Failed to open editor");
        assert!(view.editor_mut().is_some());
    }

    #[tokio::test]
    async fn test_save_editor_puts_patch_and_adopts_response() {
        let api = Arc::new(FakePagesApi::with_pages(vec![page(7, "Reports", "/reports")]));
        let mut view = PageView::new(api.clone());
        view.load_by_id(7).await;
        let gets_after_load = api.get_calls.load(Ordering::SeqCst);

        view.open_editor(&super_admin()).expect("Failed to open editor");
        view.editor_mut()
            .expect("Editor should be open")
            .apply(PageEdit::Title("Field Ops".to_string()));
        view.save_editor().await.expect("Failed to save");

        assert_eq!(resolved_title(&view), "Field Ops");
        assert!(view.editor_mut().is_none());

        let patches = api.patches();
        assert_eq!(patches.len(), 1);
        let wire = serde_json::to_value(&patches[0]).expect("Failed to serialize patch");
        assert_eq!(wire, json!({ "title": "Field Ops" }));

        // The response is adopted directly, no re-fetch
        assert_eq!(api.get_calls.load(Ordering::SeqCst), gets_after_load);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_editor_open() {
        let api = Arc::new(FakePagesApi::with_pages(vec![page(7, "Reports", "/reports")]));
        let mut view = PageView::new(api.clone());
        view.load_by_id(7).await;

        view.open_editor(&super_admin()).expect("Failed to open editor");
        view.editor_mut()
            .expect("Editor should be open")
            .apply(PageEdit::Title("Field Ops".to_string()));

        api.fail_next(AppError::Status { status: 500 });
        let result = view.save_editor().await;
        assert!(result.is_err());

        let form = view.editor_mut().expect("Editor should stay open");
        assert_eq!(form.title, "Field Ops");
        assert_eq!(resolved_title(&view), "Reports");
    }

    #[tokio::test]
    async fn test_save_without_changes_closes_quietly() {
        let api = Arc::new(FakePagesApi::with_pages(vec![page(7, "Reports", "/reports")]));
        let mut view = PageView::new(api.clone());
        view.load_by_id(7).await;

        view.open_editor(&super_admin()).expect("Failed to open editor");
        view.save_editor().await.expect("No-op save should succeed");

        assert!(view.editor_mut().is_none());
        assert_eq!(api.update_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolved_title(&view), "Reports");
    }

    #[tokio::test]
    async fn test_cancel_editor_keeps_resolved_page() {
        let api = Arc::new(FakePagesApi::with_pages(vec![page(7, "Reports", "/reports")]));
        let mut view = PageView::new(api);
        view.load_by_id(7).await;

        view.open_editor(&super_admin()).expect("Failed to open editor");
        view.editor_mut()
            .expect("Editor should be open")
            .apply(PageEdit::Title("Scratch".to_string()));
        view.cancel_editor();

        assert!(view.editor_mut().is_none());
        assert_eq!(resolved_title(&view), "Reports");
    }
}
