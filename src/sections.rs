use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::bus::SectionsBus;
use crate::error::AppError;
use crate::forms::{QuickFieldForm, SectionForm};
use crate::models::{Section, SectionDraft};
use crate::pages::ConfirmPrompt;
use crate::provision::{ProvisionApi, TableSpec};
use crate::store::{LocalStore, SECTIONS_KEY};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").expect("whitespace pattern"));

/// Navigation path for a section: `/` plus the lowercased title with
/// every whitespace character replaced by a hyphen. Nothing else is
/// sanitized; punctuation and unicode pass through into the path.
pub fn route_slug(title: &str) -> String {
    format!("/{}", WHITESPACE.replace_all(&title.to_lowercase(), "-"))
}

/// Synthetic table identifier sent to the provisioner. Millisecond
/// granularity is enough because creation is a human-paced action.
fn generated_table_name() -> String {
    format!("section_{}", Utc::now().timestamp_millis())
}

/// Owner of the section cache: the single local key holding the
/// descriptor list, plus the bus every mutation signals on.
pub struct SectionRegistry {
    store: Arc<dyn LocalStore>,
    provisioner: Arc<dyn ProvisionApi>,
    bus: Arc<SectionsBus>,
}

impl SectionRegistry {
    pub fn new(
        store: Arc<dyn LocalStore>,
        provisioner: Arc<dyn ProvisionApi>,
        bus: Arc<SectionsBus>,
    ) -> Self {
        Self {
            store,
            provisioner,
            bus,
        }
    }

    pub fn bus(&self) -> Arc<SectionsBus> {
        self.bus.clone()
    }

    /// Current cached list. A missing key is an empty list; a corrupt
    /// cache is logged and treated as empty rather than failing every
    /// caller.
    pub fn load(&self) -> Vec<Section> {
        match self.store.get(SECTIONS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(sections) => sections,
                Err(err) => {
                    warn!(error = %err, "Section cache is corrupt, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                err.log_and_record("reading section cache");
                Vec::new()
            }
        }
    }

    fn persist(&self, sections: &[Section]) -> Result<(), AppError> {
        let raw = serde_json::to_string(sections)?;
        self.store.set(SECTIONS_KEY, &raw)
    }

    /// Create a section: validate, provision the backing table, then
    /// persist the descriptor and signal the change. A provisioning
    /// failure leaves every piece of state untouched.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(&self, draft: SectionDraft) -> Result<Section, AppError> {
        draft.validate()?;
        let fields = draft.valid_fields();
        if fields.is_empty() {
            return Err(AppError::Validation(
                "Please add at least one field".to_string(),
            ));
        }

        let spec = TableSpec::new(generated_table_name(), &fields);
        let table_name = self.provisioner.create_table(&spec).await?;

        let now = Utc::now();
        let path = route_slug(&draft.title);
        let section = Section {
            id: Uuid::new_v4().to_string(),
            title: draft.title,
            display_name: draft.display_name,
            path,
            icon: draft.icon,
            table_name,
            fields,
            description: draft.description,
            enabled: draft.enabled,
            order: draft.order,
            created_at: now,
            updated_at: now,
        };

        let mut sections = self.load();
        sections.push(section.clone());
        self.persist(&sections)?;
        self.bus.publish();
        info!(
            section_id = %section.id,
            table_name = %section.table_name,
            "Section created"
        );
        Ok(section)
    }

    /// Flip the enabled flag in place and signal the change.
    #[instrument(skip(self))]
    pub fn toggle(&self, id: &str) -> Result<Section, AppError> {
        let mut sections = self.load();
        let section = sections
            .iter_mut()
            .find(|section| section.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Section {} not found", id)))?;
        section.enabled = !section.enabled;
        section.updated_at = Utc::now();
        let updated = section.clone();
        self.persist(&sections)?;
        self.bus.publish();
        info!(section_id = %id, enabled = updated.enabled, "Section toggled");
        Ok(updated)
    }

    /// Filter the section out of the cached list. The backend table is
    /// not dropped; it becomes orphaned.
    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<(), AppError> {
        let mut sections = self.load();
        let before = sections.len();
        sections.retain(|section| section.id != id);
        if sections.len() == before {
            return Err(AppError::NotFound(format!("Section {} not found", id)));
        }
        self.persist(&sections)?;
        self.bus.publish();
        info!(section_id = %id, "Section removed");
        Ok(())
    }

    /// Exact path match over enabled sections.
    pub fn find_by_path(&self, path: &str) -> Option<Section> {
        self.load()
            .into_iter()
            .filter(|section| section.enabled)
            .find(|section| section.path == path)
    }
}

/// Owning component of the full authoring form: mirrors the cached
/// list in memory and decides success handling for the form.
pub struct SectionPanel {
    registry: Arc<SectionRegistry>,
    sections: Vec<Section>,
    form: SectionForm,
    form_open: bool,
}

impl SectionPanel {
    pub fn new(registry: Arc<SectionRegistry>) -> Self {
        let sections = registry.load();
        Self {
            registry,
            sections,
            form: SectionForm::default(),
            form_open: false,
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn refresh(&mut self) {
        self.sections = self.registry.load();
    }

    pub fn open_form(&mut self) {
        self.form_open = true;
    }

    pub fn is_form_open(&self) -> bool {
        self.form_open
    }

    pub fn form_mut(&mut self) -> &mut SectionForm {
        &mut self.form
    }

    /// On success the form closes and resets to defaults; on failure
    /// it stays open with the draft intact.
    pub async fn submit(&mut self) -> Result<Section, AppError> {
        let created = self.registry.create(self.form.draft()).await?;
        self.sections.push(created.clone());
        self.form.reset();
        self.form_open = false;
        Ok(created)
    }

    pub fn toggle(&mut self, id: &str) -> Result<Section, AppError> {
        let updated = self.registry.toggle(id)?;
        if let Some(entry) = self.sections.iter_mut().find(|section| section.id == id) {
            *entry = updated.clone();
        }
        Ok(updated)
    }

    /// Delete after a blocking confirmation. Returns false when the
    /// prompt was declined.
    pub fn remove(&mut self, id: &str, prompt: &dyn ConfirmPrompt) -> Result<bool, AppError> {
        if !prompt.confirm("Are you sure you want to delete this section?") {
            info!(section_id = %id, "Section delete cancelled");
            return Ok(false);
        }
        self.registry.remove(id)?;
        self.sections.retain(|section| section.id != id);
        Ok(true)
    }
}

/// Owning component of the simplified authoring flow.
pub struct QuickFieldPanel {
    registry: Arc<SectionRegistry>,
    form: QuickFieldForm,
}

impl QuickFieldPanel {
    pub fn new(registry: Arc<SectionRegistry>) -> Self {
        Self {
            registry,
            form: QuickFieldForm::default(),
        }
    }

    pub fn form_mut(&mut self) -> &mut QuickFieldForm {
        &mut self.form
    }

    pub async fn submit(&mut self) -> Result<Section, AppError> {
        let created = self.registry.create(self.form.draft()).await?;
        self.form.reset();
        Ok(created)
    }
}
