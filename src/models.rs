use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Symbolic icon names shared by pages and sections. The artwork lives
/// client-side; only the name travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Icon {
    FileText,
    Building2,
    Users,
    Database,
    Globe,
    Truck,
    Home,
    Briefcase,
    HeartPulse,
    Sprout,
}

impl Icon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Icon::FileText => "FileText",
            Icon::Building2 => "Building2",
            Icon::Users => "Users",
            Icon::Database => "Database",
            Icon::Globe => "Globe",
            Icon::Truck => "Truck",
            Icon::Home => "Home",
            Icon::Briefcase => "Briefcase",
            Icon::HeartPulse => "HeartPulse",
            Icon::Sprout => "Sprout",
        }
    }
}

impl FromStr for Icon {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FileText" => Ok(Icon::FileText),
            "Building2" => Ok(Icon::Building2),
            "Users" => Ok(Icon::Users),
            "Database" => Ok(Icon::Database),
            "Globe" => Ok(Icon::Globe),
            "Truck" => Ok(Icon::Truck),
            "Home" => Ok(Icon::Home),
            "Briefcase" => Ok(Icon::Briefcase),
            "HeartPulse" => Ok(Icon::HeartPulse),
            "Sprout" => Ok(Icon::Sprout),
            _ => Err(AppError::Validation(format!("Unknown icon: {}", s))),
        }
    }
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Column types accepted by the table provisioner. Wire names are the
/// lowercase variants; the simplified authoring flow uses a narrower
/// alias set (see [`QuickInputKind`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Text,
    Int,
    Float,
    Bool,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Date => "date",
        }
    }

    /// Human label used by listings and generated forms.
    pub fn label(&self) -> &'static str {
        match self {
            FieldType::String => "Text",
            FieldType::Text => "Long Text",
            FieldType::Int => "Number",
            FieldType::Float => "Decimal",
            FieldType::Bool => "Yes/No",
            FieldType::Date => "Date",
        }
    }
}

impl FromStr for FieldType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FieldType::String),
            "text" => Ok(FieldType::Text),
            "int" => Ok(FieldType::Int),
            "float" => Ok(FieldType::Float),
            "bool" => Ok(FieldType::Bool),
            "date" => Ok(FieldType::Date),
            _ => Err(AppError::Validation(format!("Unknown field type: {}", s))),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input vocabulary of the simplified authoring flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickInputKind {
    Text,
    Number,
    Boolean,
}

impl From<QuickInputKind> for FieldType {
    fn from(kind: QuickInputKind) -> Self {
        match kind {
            QuickInputKind::Text => FieldType::String,
            QuickInputKind::Number => FieldType::Int,
            QuickInputKind::Boolean => FieldType::Bool,
        }
    }
}

impl FromStr for QuickInputKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(QuickInputKind::Text),
            "number" => Ok(QuickInputKind::Number),
            "boolean" => Ok(QuickInputKind::Boolean),
            _ => Err(AppError::Validation(format!("Unknown input kind: {}", s))),
        }
    }
}

/// Server-registered navigable page. Wire shape is camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub route: String,
    pub icon: Icon,
    pub is_active: bool,
    pub is_builtin: bool,
    pub is_main_tab: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload: everything except identity and audit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageDraft {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Route is required"))]
    pub route: String,
    pub icon: Icon,
    pub is_active: bool,
    pub is_main_tab: bool,
}

impl PageDraft {
    /// Derive rules plus the one constraint the derive cannot express:
    /// routes are absolute paths.
    pub fn ensure_valid(&self) -> Result<(), AppError> {
        self.validate()?;
        if !self.route.starts_with('/') {
            return Err(AppError::Validation(
                "Route must start with '/'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update payload: only fields that changed are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_main_tab: Option<bool>,
}

impl PagePatch {
    /// Same rules as [`PageDraft::ensure_valid`], applied only to the
    /// fields the patch actually sets.
    pub fn ensure_valid(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Title is required".to_string()));
            }
        }
        if let Some(route) = &self.route {
            if !route.starts_with('/') {
                return Err(AppError::Validation(
                    "Route must start with '/'".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.route.is_none()
            && self.icon.is_none()
            && self.is_active.is_none()
            && self.is_main_tab.is_none()
    }

    pub fn sets_main_tab(&self) -> bool {
        self.is_main_tab == Some(true)
    }
}

/// One column of a section's generated data-entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub required: bool,
    pub show_ui: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            show_ui: true,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Locally cached descriptor binding a provisioned backend table to its
/// human-facing metadata. Legacy cache entries predate `display_name`,
/// `enabled`, `order` and the audit timestamps, so all of those default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub display_name: String,
    pub path: String,
    pub icon: Icon,
    pub table_name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Section {
    pub fn display_title(&self) -> &str {
        if self.display_name.is_empty() {
            &self.title
        } else {
            &self.display_name
        }
    }

    /// Fields visible in the generated entry form.
    pub fn visible_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|field| field.show_ui)
    }
}

/// Input to section creation, shared by the full and simplified
/// authoring flows.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct SectionDraft {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub display_name: String,
    pub description: String,
    pub icon: Icon,
    pub enabled: bool,
    pub order: i32,
    pub fields: Vec<Field>,
}

impl SectionDraft {
    /// Rows that survive persistence: non-blank names, trimmed.
    pub fn valid_fields(&self) -> Vec<Field> {
        self.fields
            .iter()
            .filter(|field| !field.name.trim().is_empty())
            .map(|field| Field {
                name: field.name.trim().to_string(),
                ..field.clone()
            })
            .collect()
    }
}
