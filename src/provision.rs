use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Field, FieldType};

/// Request body for table provisioning. `fields`, `data_types` and
/// `show_ui` are parallel lists: index i of each describes the same
/// column. The provisioner relies on that positional correspondence
/// and does not re-validate it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSpec {
    pub table_name: String,
    pub fields: Vec<String>,
    pub data_types: Vec<FieldType>,
    pub show_ui: Vec<bool>,
}

impl TableSpec {
    pub fn new(table_name: impl Into<String>, fields: &[Field]) -> Self {
        Self {
            table_name: table_name.into(),
            fields: fields.iter().map(|field| field.name.clone()).collect(),
            data_types: fields.iter().map(|field| field.kind).collect(),
            show_ui: fields.iter().map(|field| field.show_ui).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProvisionAck {
    pub data: ProvisionedTable,
}

#[derive(Debug, Deserialize)]
pub struct ProvisionedTable {
    pub table_name: String,
}

/// Rejection body shape used by the provisioner.
#[derive(Debug, Deserialize)]
pub struct ProvisionErrorBody {
    pub error: Option<String>,
}

/// Black-box table creation: hands over a schema, gets back the
/// provisioned table identifier.
#[async_trait]
pub trait ProvisionApi: Send + Sync {
    async fn create_table(&self, spec: &TableSpec) -> Result<String, AppError>;
}
