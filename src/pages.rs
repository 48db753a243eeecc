use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::auth::{Permission, User};
use crate::error::AppError;
use crate::forms::PageForm;
use crate::models::{Page, PageDraft, PagePatch};

/// Gateway to the server-side page registry.
#[async_trait]
pub trait PagesApi: Send + Sync {
    async fn list_pages(&self) -> Result<Vec<Page>, AppError>;
    async fn get_page(&self, id: i64) -> Result<Page, AppError>;
    async fn create_page(&self, draft: &PageDraft) -> Result<Page, AppError>;
    async fn update_page(&self, id: i64, patch: &PagePatch) -> Result<Page, AppError>;
    async fn delete_page(&self, id: i64) -> Result<(), AppError>;
}

/// Blocking interactive confirmation issued before destructive calls.
pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> bool;
}

/// Always-affirmative prompt, for `--yes` runs.
pub struct AssumeYes;

impl ConfirmPrompt for AssumeYes {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

struct PageEditor {
    // None while creating
    target: Option<i64>,
    form: PageForm,
    baseline: Option<Page>,
}

/// In-memory mirror of the page registry plus the modal editor state
/// of the management screen.
pub struct PageManager {
    api: Arc<dyn PagesApi>,
    pages: Vec<Page>,
    editor: Option<PageEditor>,
}

impl PageManager {
    pub fn new(api: Arc<dyn PagesApi>) -> Self {
        Self {
            api,
            pages: Vec::new(),
            editor: None,
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), AppError> {
        info!("Loading page registry");
        self.pages = self.api.list_pages().await?;
        Ok(())
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn find(&self, id: i64) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == id)
    }

    /// Advisory only: hides the delete affordance for builtin pages
    /// but does not block the call itself.
    pub fn can_delete(&self, page: &Page) -> bool {
        !page.is_builtin
    }

    pub fn open_create(&mut self) {
        self.editor = Some(PageEditor {
            target: None,
            form: PageForm::default(),
            baseline: None,
        });
    }

    pub fn open_edit(&mut self, id: i64) -> Result<(), AppError> {
        let page = self
            .find(id)
            .ok_or_else(|| AppError::NotFound(format!("Page {} not found", id)))?;
        self.editor = Some(PageEditor {
            target: Some(id),
            form: PageForm::from_page(page),
            baseline: Some(page.clone()),
        });
        Ok(())
    }

    pub fn editor_form_mut(&mut self) -> Option<&mut PageForm> {
        self.editor.as_mut().map(|editor| &mut editor.form)
    }

    pub fn cancel_editor(&mut self) {
        self.editor = None;
    }

    /// Submit the open editor. On failure the editor stays open with
    /// its draft intact; on success it closes and the in-memory list
    /// is updated from the server's response.
    pub async fn submit_editor(&mut self, user: &User) -> Result<Page, AppError> {
        user.require_permission(Permission::ManagePages)?;
        let editor = self
            .editor
            .as_ref()
            .ok_or_else(|| AppError::Internal("No page editor is open".to_string()))?;

        match editor.target {
            None => {
                let draft = editor.form.draft()?;
                if draft.is_main_tab {
                    user.require_permission(Permission::PromoteMainTab)?;
                }
                let created = self.api.create_page(&draft).await?;
                info!(page_id = created.id, route = %created.route, "Page created");
                self.pages.push(created.clone());
                self.editor = None;
                Ok(created)
            }
            Some(id) => {
                let baseline = editor.baseline.as_ref().ok_or_else(|| {
                    AppError::Internal("Editor has no baseline record".to_string())
                })?;
                let patch = editor.form.patch(baseline);
                patch.ensure_valid()?;
                if patch.sets_main_tab() {
                    user.require_permission(Permission::PromoteMainTab)?;
                }
                if patch.is_empty() {
                    let unchanged = baseline.clone();
                    self.editor = None;
                    return Ok(unchanged);
                }
                let updated = self.api.update_page(id, &patch).await?;
                info!(page_id = id, "Page updated");
                if let Some(entry) = self.pages.iter_mut().find(|page| page.id == id) {
                    *entry = updated.clone();
                }
                self.editor = None;
                Ok(updated)
            }
        }
    }

    /// Delete after a blocking confirmation. Returns false when the
    /// prompt was declined; no call is made in that case.
    pub async fn delete(
        &mut self,
        id: i64,
        user: &User,
        prompt: &dyn ConfirmPrompt,
    ) -> Result<bool, AppError> {
        user.require_permission(Permission::DeletePages)?;
        let page = self
            .find(id)
            .ok_or_else(|| AppError::NotFound(format!("Page {} not found", id)))?;
        if page.is_builtin {
            warn!(page_id = id, "Deleting a builtin page");
        }
        let message = format!("Delete page \"{}\"?", page.title);
        if !prompt.confirm(&message) {
            info!(page_id = id, "Delete cancelled");
            return Ok(false);
        }
        self.api.delete_page(id).await?;
        info!(page_id = id, "Page deleted");
        self.pages.retain(|page| page.id != id);
        Ok(true)
    }
}
