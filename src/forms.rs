use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::{Field, FieldType, Icon, Page, PageDraft, PagePatch, QuickInputKind, SectionDraft};

/// Single-field edit merged into a page draft.
#[derive(Debug, Clone)]
pub enum PageEdit {
    Title(String),
    Description(String),
    Route(String),
    Icon(Icon),
    Active(bool),
    MainTab(bool),
}

/// Draft state behind the page create/edit modal. Seeded from defaults
/// (create) or an existing record (edit).
#[derive(Debug, Clone, PartialEq)]
pub struct PageForm {
    pub title: String,
    pub description: String,
    pub route: String,
    pub icon: Icon,
    pub is_active: bool,
    pub is_main_tab: bool,
}

impl Default for PageForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            route: String::new(),
            icon: Icon::FileText,
            is_active: true,
            is_main_tab: false,
        }
    }
}

impl PageForm {
    pub fn from_page(page: &Page) -> Self {
        Self {
            title: page.title.clone(),
            description: page.description.clone().unwrap_or_default(),
            route: page.route.clone(),
            icon: page.icon,
            is_active: page.is_active,
            is_main_tab: page.is_main_tab,
        }
    }

    pub fn apply(&mut self, edit: PageEdit) {
        match edit {
            PageEdit::Title(title) => self.title = title,
            PageEdit::Description(description) => self.description = description,
            PageEdit::Route(route) => self.route = route,
            PageEdit::Icon(icon) => self.icon = icon,
            PageEdit::Active(active) => self.is_active = active,
            PageEdit::MainTab(main_tab) => self.is_main_tab = main_tab,
        }
    }

    /// Validated create payload.
    pub fn draft(&self) -> Result<PageDraft, AppError> {
        let draft = PageDraft {
            title: self.title.trim().to_string(),
            description: match self.description.trim() {
                "" => None,
                text => Some(text.to_string()),
            },
            route: self.route.trim().to_string(),
            icon: self.icon,
            is_active: self.is_active,
            is_main_tab: self.is_main_tab,
        };
        draft.ensure_valid()?;
        Ok(draft)
    }

    /// Diff against the record this form was seeded from. Unchanged
    /// fields stay out of the patch.
    pub fn patch(&self, base: &Page) -> PagePatch {
        let mut patch = PagePatch::default();
        if self.title != base.title {
            patch.title = Some(self.title.clone());
        }
        let description = match self.description.as_str() {
            "" => None,
            text => Some(text.to_string()),
        };
        if description != base.description {
            patch.description = Some(description);
        }
        if self.route != base.route {
            patch.route = Some(self.route.clone());
        }
        if self.icon != base.icon {
            patch.icon = Some(self.icon);
        }
        if self.is_active != base.is_active {
            patch.is_active = Some(self.is_active);
        }
        if self.is_main_tab != base.is_main_tab {
            patch.is_main_tab = Some(self.is_main_tab);
        }
        patch
    }
}

/// Single-field edit merged into a section draft.
#[derive(Debug, Clone)]
pub enum SectionEdit {
    Title(String),
    DisplayName(String),
    Description(String),
    Icon(Icon),
    Enabled(bool),
    Order(i32),
}

/// Edit applied to one field row by index.
#[derive(Debug, Clone)]
pub enum RowEdit {
    Name(String),
    Kind(FieldType),
    Required(bool),
    ShowUi(bool),
}

fn default_row() -> Field {
    Field::new("", FieldType::String)
}

/// Draft state behind the full section authoring form. The field rows
/// are repeatable; at least one row is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionForm {
    pub title: String,
    pub display_name: String,
    pub description: String,
    pub icon: Icon,
    pub enabled: bool,
    pub order: i32,
    rows: Vec<Field>,
}

impl Default for SectionForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            display_name: String::new(),
            description: String::new(),
            icon: Icon::Database,
            enabled: true,
            order: 0,
            rows: vec![default_row()],
        }
    }
}

impl SectionForm {
    pub fn apply(&mut self, edit: SectionEdit) {
        match edit {
            SectionEdit::Title(title) => self.title = title,
            SectionEdit::DisplayName(display_name) => self.display_name = display_name,
            SectionEdit::Description(description) => self.description = description,
            SectionEdit::Icon(icon) => self.icon = icon,
            SectionEdit::Enabled(enabled) => self.enabled = enabled,
            SectionEdit::Order(order) => self.order = order,
        }
    }

    pub fn rows(&self) -> &[Field] {
        &self.rows
    }

    pub fn add_row(&mut self) {
        self.rows.push(default_row());
    }

    pub fn update_row(&mut self, index: usize, edit: RowEdit) -> Result<(), AppError> {
        let row = self.rows.get_mut(index).ok_or_else(|| {
            AppError::Validation(format!("No field row at index {}", index))
        })?;
        match edit {
            RowEdit::Name(name) => row.name = name,
            RowEdit::Kind(kind) => row.kind = kind,
            RowEdit::Required(required) => row.required = required,
            RowEdit::ShowUi(show_ui) => row.show_ui = show_ui,
        }
        Ok(())
    }

    /// Removing the last remaining row is a no-op; the form always
    /// offers at least one row.
    pub fn remove_row(&mut self, index: usize) {
        if self.rows.len() > 1 && index < self.rows.len() {
            self.rows.remove(index);
        }
    }

    /// Raw draft: blank rows are carried along and filtered by the
    /// registry's creation contract.
    pub fn draft(&self) -> SectionDraft {
        SectionDraft {
            title: self.title.trim().to_string(),
            display_name: self.display_name.trim().to_string(),
            description: self.description.trim().to_string(),
            icon: self.icon,
            enabled: self.enabled,
            order: self.order,
            fields: self.rows.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickCategory {
    Healthcare,
    Agriculture,
    Finance,
}

impl QuickCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuickCategory::Healthcare => "Healthcare",
            QuickCategory::Agriculture => "Agriculture",
            QuickCategory::Finance => "Finance",
        }
    }
}

impl FromStr for QuickCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "healthcare" => Ok(QuickCategory::Healthcare),
            "agriculture" => Ok(QuickCategory::Agriculture),
            "finance" => Ok(QuickCategory::Finance),
            _ => Err(AppError::Validation(format!("Unknown category: {}", s))),
        }
    }
}

impl fmt::Display for QuickCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbStrategy {
    SaveToDatabase,
    VisualizeOnly,
}

impl DbStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbStrategy::SaveToDatabase => "Save to Database",
            DbStrategy::VisualizeOnly => "Visualize Only",
        }
    }
}

impl FromStr for DbStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "save" => Ok(DbStrategy::SaveToDatabase),
            "visualize" => Ok(DbStrategy::VisualizeOnly),
            _ => Err(AppError::Validation(format!("Unknown strategy: {}", s))),
        }
    }
}

impl fmt::Display for DbStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuickInput {
    pub label: String,
    pub kind: QuickInputKind,
}

#[derive(Debug, Clone)]
pub enum QuickInputEdit {
    Label(String),
    Kind(QuickInputKind),
}

fn default_input() -> QuickInput {
    QuickInput {
        label: String::new(),
        kind: QuickInputKind::Text,
    }
}

/// Draft state behind the simplified authoring flow: a reduced-option
/// view over the same section creation contract.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickFieldForm {
    pub name: String,
    pub category: QuickCategory,
    pub strategy: DbStrategy,
    inputs: Vec<QuickInput>,
}

impl Default for QuickFieldForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: QuickCategory::Healthcare,
            strategy: DbStrategy::SaveToDatabase,
            inputs: vec![default_input()],
        }
    }
}

impl QuickFieldForm {
    pub fn inputs(&self) -> &[QuickInput] {
        &self.inputs
    }

    pub fn add_input(&mut self) {
        self.inputs.push(default_input());
    }

    pub fn update_input(&mut self, index: usize, edit: QuickInputEdit) -> Result<(), AppError> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            AppError::Validation(format!("No input at index {}", index))
        })?;
        match edit {
            QuickInputEdit::Label(label) => input.label = label,
            QuickInputEdit::Kind(kind) => input.kind = kind,
        }
        Ok(())
    }

    pub fn remove_input(&mut self, index: usize) {
        if self.inputs.len() > 1 && index < self.inputs.len() {
            self.inputs.remove(index);
        }
    }

    /// The one constructor both authoring flows share.
    pub fn draft(&self) -> SectionDraft {
        SectionDraft {
            title: self.name.trim().to_string(),
            display_name: String::new(),
            description: format!("{} - {}", self.category, self.strategy),
            icon: Icon::Database,
            enabled: true,
            order: 0,
            fields: self
                .inputs
                .iter()
                .map(|input| Field::new(input.label.clone(), input.kind.into()))
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
