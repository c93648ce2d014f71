use std::collections::BTreeMap;

use catalog::{MachineChanges, MachineDraft, MachineForm, MachineRecord, RecordId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::shared::FormParts;
use crate::error::AppError;

/// Multipart file fields accepted by the machine forms.
pub const MACHINE_FILE_FIELDS: &[&str] = &["image", "video"];

/// A machine as shown in listings and on its detail page.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MachineResponse {
    pub id: Uuid,
    #[schema(example = "Robot Arm X1")]
    pub name: String,
    #[schema(example = "Six-axis arm for pick and place")]
    pub description: Option<String>,
    #[schema(example = "Robotics")]
    pub category: String,
    #[schema(example = "https://example.com/storage/machines/0190f5c2-7d1e-7c3a-9b1e-2f4d5a6b7c8d.png")]
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub technical_info: Option<String>,
    /// Ordered key/value specification table.
    #[schema(example = json!({"Payload": "10 kg", "Reach": "1.2 m"}))]
    pub specifications: Option<BTreeMap<String, String>>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MachineRecord> for MachineResponse {
    fn from(m: MachineRecord) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            category: m.category,
            image_url: m.image_url,
            video_url: m.video_url,
            technical_info: m.technical_info,
            specifications: m.specifications,
            is_featured: m.is_featured,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Machine list, newest first.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MachineListResponse {
    pub machines: Vec<MachineResponse>,
    #[schema(example = 12)]
    pub total: u64,
}

impl From<Vec<MachineRecord>> for MachineListResponse {
    fn from(records: Vec<MachineRecord>) -> Self {
        let total = records.len() as u64;
        Self {
            machines: records.into_iter().map(MachineResponse::from).collect(),
            total,
        }
    }
}

/// Build a create form. Absent `category` and `is_featured` take the defaults.
pub fn machine_create_form(mut parts: FormParts) -> Result<MachineForm, AppError> {
    let defaults = MachineDraft::default();
    let draft = MachineDraft {
        name: parts.text("name").unwrap_or_default().to_string(),
        description: parts.nullable_text("description").flatten(),
        category: parts
            .text("category")
            .map(str::to_string)
            .unwrap_or(defaults.category),
        technical_info: parts.nullable_text("technical_info").flatten(),
        specifications: parts.specifications("specifications")?.flatten(),
        is_featured: parts.flag("is_featured")?.unwrap_or(defaults.is_featured),
    };

    Ok(MachineForm {
        image: parts.take_file("image"),
        video: parts.take_file("video"),
        ..MachineForm::create(draft)
    })
}

/// Build an edit form. Only fields present in the request are changed.
pub fn machine_update_form(id: RecordId, mut parts: FormParts) -> Result<MachineForm, AppError> {
    let changes = MachineChanges {
        name: parts.text("name").map(str::to_string),
        description: parts.nullable_text("description"),
        category: parts.text("category").map(str::to_string),
        technical_info: parts.nullable_text("technical_info"),
        specifications: parts.specifications("specifications")?,
        is_featured: parts.flag("is_featured")?,
    };

    Ok(MachineForm {
        image: parts.take_file("image"),
        video: parts.take_file("video"),
        ..MachineForm::update(id, changes)
    })
}
