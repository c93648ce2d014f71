use catalog::{CustomerChanges, CustomerDraft, CustomerForm, CustomerRecord, RecordId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::shared::FormParts;
use crate::error::AppError;

pub const CUSTOMER_FILE_FIELDS: &[&str] = &["logo"];

#[derive(Serialize, utoipa::ToSchema)]
pub struct CustomerResponse {
    pub id: Uuid,
    #[schema(example = "ABB Ltd")]
    pub name: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomerRecord> for CustomerResponse {
    fn from(c: CustomerRecord) -> Self {
        Self {
            id: c.id,
            name: c.name,
            logo_url: c.logo_url,
            description: c.description,
            is_featured: c.is_featured,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerResponse>,
    #[schema(example = 4)]
    pub total: u64,
}

impl From<Vec<CustomerRecord>> for CustomerListResponse {
    fn from(records: Vec<CustomerRecord>) -> Self {
        let total = records.len() as u64;
        Self {
            customers: records.into_iter().map(CustomerResponse::from).collect(),
            total,
        }
    }
}

/// New customers are featured unless the form says otherwise.
pub fn customer_create_form(mut parts: FormParts) -> Result<CustomerForm, AppError> {
    let draft = CustomerDraft {
        name: parts.text("name").unwrap_or_default().to_string(),
        description: parts.nullable_text("description").flatten(),
        is_featured: parts
            .flag("is_featured")?
            .unwrap_or(CustomerDraft::default().is_featured),
    };

    Ok(CustomerForm {
        logo: parts.take_file("logo"),
        ..CustomerForm::create(draft)
    })
}

pub fn customer_update_form(id: RecordId, mut parts: FormParts) -> Result<CustomerForm, AppError> {
    let changes = CustomerChanges {
        name: parts.text("name").map(str::to_string),
        description: parts.nullable_text("description"),
        is_featured: parts.flag("is_featured")?,
    };

    Ok(CustomerForm {
        logo: parts.take_file("logo"),
        ..CustomerForm::update(id, changes)
    })
}
