use std::sync::Arc;

use tracing::debug;

use crate::auth::{Permission, User};
use crate::error::AppError;
use crate::forms::PageForm;
use crate::models::Page;
use crate::pages::PagesApi;

/// Ticket for one in-flight load. Only the most recently issued ticket
/// may apply its outcome, so a stale response can never overwrite a
/// newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken(u64);

#[derive(Debug)]
pub struct ResolvedPage {
    pub page: Page,
    pub editor: Option<PageForm>,
}

#[derive(Debug)]
pub enum ViewState {
    Idle,
    Loading,
    Resolved(ResolvedPage),
    NotFound(String),
}

/// Props handed to the generic dashboard view on resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardProps {
    pub page_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_custom: bool,
}

/// One mounted page view. NotFound is terminal: nothing leaves it
/// short of constructing a new view for the next route.
pub struct PageView {
    api: Arc<dyn PagesApi>,
    state: ViewState,
    issued: u64,
}

impl PageView {
    pub fn new(api: Arc<dyn PagesApi>) -> Self {
        Self {
            api,
            state: ViewState::Idle,
            issued: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Start a load, invalidating any still-pending one. Returns None
    /// from the terminal not-found state.
    pub fn begin_load(&mut self) -> Option<LoadToken> {
        if matches!(self.state, ViewState::NotFound(_)) {
            return None;
        }
        self.issued += 1;
        self.state = ViewState::Loading;
        Some(LoadToken(self.issued))
    }

    /// Apply a load outcome. Outcomes for superseded tokens are
    /// dropped: the latest request wins.
    pub fn apply(&mut self, token: LoadToken, outcome: Result<Page, AppError>) {
        if token.0 != self.issued || matches!(self.state, ViewState::NotFound(_)) {
            debug!(token = token.0, current = self.issued, "Dropping stale load outcome");
            return;
        }
        match outcome {
            Ok(page) => {
                self.state = ViewState::Resolved(ResolvedPage { page, editor: None });
            }
            Err(err) => {
                err.log_and_record("resolving page view");
                self.state = ViewState::NotFound(err.user_message());
            }
        }
    }

    /// Resolve by identifier. A non-success response reads as "not
    /// found"; transport failures keep their own message.
    pub async fn load_by_id(&mut self, id: i64) {
        let Some(token) = self.begin_load() else {
            return;
        };
        let outcome = match self.api.get_page(id).await {
            Ok(page) => Ok(page),
            Err(AppError::Status { .. }) | Err(AppError::NotFound(_)) => {
                Err(AppError::NotFound("Page not found".to_string()))
            }
            Err(err) => Err(err),
        };
        self.apply(token, outcome);
    }

    /// Resolve by exact route match over the full collection. No
    /// trailing-slash normalization, no wildcards; absence of a match
    /// is identical to a fetch failure.
    pub async fn load_by_path(&mut self, path: &str) {
        let Some(token) = self.begin_load() else {
            return;
        };
        let outcome = match self.api.list_pages().await {
            Ok(pages) => match pages.into_iter().find(|page| page.route == path) {
                Some(page) => Ok(page),
                _ => Err(AppError::NotFound("Page not found".to_string())),
            },
            Err(err) => Err(err),
        };
        self.apply(token, outcome);
    }

    /// Delegation contract with the generic dashboard view.
    pub fn dashboard_props(&self) -> Option<DashboardProps> {
        match &self.state {
            ViewState::Resolved(resolved) => Some(DashboardProps {
                page_id: resolved.page.id,
                title: resolved.page.title.clone(),
                description: resolved.page.description.clone(),
                is_custom: true,
            }),
            _ => None,
        }
    }

    pub fn can_modify(&self, user: &User) -> bool {
        matches!(self.state, ViewState::Resolved(_))
            && user.has_permission(Permission::ModifyLivePage)
    }

    pub fn open_editor(&mut self, user: &User) -> Result<(), AppError> {
        user.require_permission(Permission::ModifyLivePage)?;
        match &mut self.state {
            ViewState::Resolved(resolved) => {
                resolved.editor = Some(PageForm::from_page(&resolved.page));
                Ok(())
            }
            _ => Err(AppError::Validation("No page is resolved".to_string())),
        }
    }

    pub fn editor_mut(&mut self) -> Option<&mut PageForm> {
        match &mut self.state {
            ViewState::Resolved(resolved) => resolved.editor.as_mut(),
            _ => None,
        }
    }

    pub fn cancel_editor(&mut self) {
        if let ViewState::Resolved(resolved) = &mut self.state {
            resolved.editor = None;
        }
    }

    /// PUT only the changed fields and adopt the server's response as
    /// the new resolved page, without re-fetching. A failed save keeps
    /// the editor open with its draft intact.
    pub async fn save_editor(&mut self) -> Result<(), AppError> {
        let (id, patch) = match &self.state {
            ViewState::Resolved(resolved) => match &resolved.editor {
                Some(form) => (resolved.page.id, form.patch(&resolved.page)),
                _ => return Err(AppError::Validation("No editor is open".to_string())),
            },
            _ => return Err(AppError::Validation("No page is resolved".to_string())),
        };
        if patch.is_empty() {
            self.cancel_editor();
            return Ok(());
        }
        patch.ensure_valid()?;
        let updated = self.api.update_page(id, &patch).await?;
        self.state = ViewState::Resolved(ResolvedPage {
            page: updated,
            editor: None,
        });
        Ok(())
    }
}
