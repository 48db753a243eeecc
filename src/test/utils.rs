use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::Utc;

use crate::auth::{Role, User};
use crate::bus::SectionsBus;
use crate::error::AppError;
use crate::models::{
    Field, FieldType, Icon, Page, PageDraft, PagePatch, Section, SectionDraft,
};
use crate::pages::{ConfirmPrompt, PagesApi};
use crate::provision::{ProvisionApi, TableSpec};
use crate::sections::SectionRegistry;
use crate::store::{LocalStore, MemoryStore, SECTIONS_KEY};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn viewer() -> User {
    User {
        id: 1,
        username: "viewer_user".to_string(),
        role: Role::Viewer,
    }
}

pub fn admin() -> User {
    User {
        id: 2,
        username: "admin_user".to_string(),
        role: Role::Admin,
    }
}

pub fn super_admin() -> User {
    User {
        id: 3,
        username: "super_admin_user".to_string(),
        role: Role::SuperAdmin,
    }
}

pub fn page(id: i64, title: &str, route: &str) -> Page {
    let now = Utc::now();
    Page {
        id,
        title: title.to_string(),
        description: None,
        route: route.to_string(),
        icon: Icon::FileText,
        is_active: true,
        is_builtin: false,
        is_main_tab: false,
        created_by: 1,
        created_at: now,
        updated_at: now,
    }
}

pub fn section(id: &str, title: &str, path: &str) -> Section {
    let now = Utc::now();
    Section {
        id: id.to_string(),
        title: title.to_string(),
        display_name: String::new(),
        path: path.to_string(),
        icon: Icon::Database,
        table_name: format!("section_{}", id),
        fields: vec![Field::new("Name", FieldType::String)],
        description: String::new(),
        enabled: true,
        order: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn draft(title: &str, fields: Vec<Field>) -> SectionDraft {
    SectionDraft {
        title: title.to_string(),
        display_name: String::new(),
        description: String::new(),
        icon: Icon::Database,
        enabled: true,
        order: 0,
        fields,
    }
}

/// In-memory stand-in for the page registry backend. Counters and
/// recorded patches let tests assert exactly what went over the wire.
pub struct FakePagesApi {
    pages: Mutex<Vec<Page>>,
    patches: Mutex<Vec<PagePatch>>,
    next_id: AtomicI64,
    fail_next: Mutex<Option<AppError>>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakePagesApi {
    pub fn new() -> Self {
        Self::with_pages(Vec::new())
    }

    pub fn with_pages(pages: Vec<Page>) -> Self {
        init_test_logging();
        let next_id = pages.iter().map(|page| page.id).max().unwrap_or(0) + 1;
        Self {
            pages: Mutex::new(pages),
            patches: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(next_id),
            fail_next: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// The next call, whichever it is, fails with this error.
    pub fn fail_next(&self, error: AppError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    fn take_failure(&self) -> Option<AppError> {
        self.fail_next.lock().unwrap().take()
    }

    pub fn pages(&self) -> Vec<Page> {
        self.pages.lock().unwrap().clone()
    }

    pub fn patches(&self) -> Vec<PagePatch> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PagesApi for FakePagesApi {
    async fn list_pages(&self) -> Result<Vec<Page>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.pages.lock().unwrap().clone())
    }

    async fn get_page(&self, id: i64) -> Result<Page, AppError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|page| page.id == id)
            .cloned()
            .ok_or(AppError::Status { status: 404 })
    }

    async fn create_page(&self, draft: &PageDraft) -> Result<Page, AppError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let now = Utc::now();
        let created = Page {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: draft.title.clone(),
            description: draft.description.clone(),
            route: draft.route.clone(),
            icon: draft.icon,
            is_active: draft.is_active,
            is_builtin: false,
            is_main_tab: draft.is_main_tab,
            created_by: 1,
            created_at: now,
            updated_at: now,
        };
        self.pages.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_page(&self, id: i64, patch: &PagePatch) -> Result<Page, AppError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.patches.lock().unwrap().push(patch.clone());
        let mut pages = self.pages.lock().unwrap();
        let entry = pages
            .iter_mut()
            .find(|page| page.id == id)
            .ok_or(AppError::Status { status: 404 })?;
        if let Some(title) = &patch.title {
            entry.title = title.clone();
        }
        if let Some(description) = &patch.description {
            entry.description = description.clone();
        }
        if let Some(route) = &patch.route {
            entry.route = route.clone();
        }
        if let Some(icon) = patch.icon {
            entry.icon = icon;
        }
        if let Some(is_active) = patch.is_active {
            entry.is_active = is_active;
        }
        if let Some(is_main_tab) = patch.is_main_tab {
            entry.is_main_tab = is_main_tab;
        }
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_page(&self, id: i64) -> Result<(), AppError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let mut pages = self.pages.lock().unwrap();
        let before = pages.len();
        pages.retain(|page| page.id != id);
        if pages.len() == before {
            return Err(AppError::Status { status: 404 });
        }
        Ok(())
    }
}

/// Provisioner stand-in recording every schema it was handed.
pub struct FakeProvisioner {
    calls: Mutex<Vec<TableSpec>>,
    fail_with: Mutex<Option<AppError>>,
    assigned_name: Mutex<Option<String>>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            assigned_name: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, error: AppError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }

    /// Return this name instead of echoing the requested one, the way
    /// a real provisioner may normalize identifiers.
    pub fn assign_name(&self, name: &str) {
        *self.assigned_name.lock().unwrap() = Some(name.to_string());
    }

    pub fn calls(&self) -> Vec<TableSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProvisionApi for FakeProvisioner {
    async fn create_table(&self, spec: &TableSpec) -> Result<String, AppError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        self.calls.lock().unwrap().push(spec.clone());
        Ok(self
            .assigned_name
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| spec.table_name.clone()))
    }
}

/// Prompt double that records what it was asked and answers uniformly.
pub struct RecordingPrompt {
    accept: bool,
    pub messages: Mutex<Vec<String>>,
}

impl RecordingPrompt {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            accept: false,
            messages: Mutex::new(Vec::new()),
        }
    }
}

impl ConfirmPrompt for RecordingPrompt {
    fn confirm(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        self.accept
    }
}

pub struct TestRegistry {
    pub registry: Arc<SectionRegistry>,
    pub store: Arc<MemoryStore>,
    pub provisioner: Arc<FakeProvisioner>,
    pub bus: Arc<SectionsBus>,
}

#[derive(Default)]
pub struct TestRegistryBuilder {
    sections: Vec<Section>,
}

impl TestRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn build(self) -> TestRegistry {
        init_test_logging();
        let store = Arc::new(MemoryStore::new());
        if !self.sections.is_empty() {
            let raw = serde_json::to_string(&self.sections).expect("Failed to seed sections");
            store
                .set(SECTIONS_KEY, &raw)
                .expect("Failed to seed section cache");
        }
        let provisioner = Arc::new(FakeProvisioner::new());
        let bus = Arc::new(SectionsBus::new());
        let registry = Arc::new(SectionRegistry::new(
            store.clone() as Arc<dyn LocalStore>,
            provisioner.clone() as Arc<dyn ProvisionApi>,
            bus.clone(),
        ));
        TestRegistry {
            registry,
            store,
            provisioner,
            bus,
        }
    }
}
