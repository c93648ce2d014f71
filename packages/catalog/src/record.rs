//! Catalog record types and their write shapes.
//!
//! Inserts take a full draft; updates take a change set where an omitted
//! field is left unchanged. Nullable fields use `Option<Option<T>>`:
//! `None` keeps the stored value, `Some(None)` clears it, `Some(Some(v))`
//! replaces it. Media URLs never appear in drafts or change sets; they are
//! attached by the mutation workflow once an upload has been confirmed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CatalogError;

pub type RecordId = Uuid;

/// Ordered key/value technical specifications shown on the detail page.
pub type Specifications = BTreeMap<String, String>;

/// Category applied to new machines when the administrator picks none.
pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Machine,
    Customer,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Machine => "machine",
            RecordKind::Customer => "customer",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by both catalog record types so store and sweep code can be
/// written once.
pub trait CatalogRecord: Clone + Send + Sync + 'static {
    /// Full field set for an insert.
    type New: Send + Sync + 'static;
    /// Partial field set for an update.
    type Patch: Send + Sync + 'static;

    const KIND: RecordKind;

    fn id(&self) -> RecordId;

    /// Every media URL this record currently references.
    fn media_urls(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub technical_info: Option<String>,
    pub specifications: Option<Specifications>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRecord for MachineRecord {
    type New = NewMachine;
    type Patch = MachinePatch;

    const KIND: RecordKind = RecordKind::Machine;

    fn id(&self) -> RecordId {
        self.id
    }

    fn media_urls(&self) -> Vec<&str> {
        self.image_url
            .iter()
            .chain(self.video_url.iter())
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: RecordId,
    pub name: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogRecord for CustomerRecord {
    type New = NewCustomer;
    type Patch = CustomerPatch;

    const KIND: RecordKind = RecordKind::Customer;

    fn id(&self) -> RecordId {
        self.id
    }

    fn media_urls(&self) -> Vec<&str> {
        self.logo_url.iter().map(String::as_str).collect()
    }
}

/// Administrator-supplied fields for a new machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub technical_info: Option<String>,
    pub specifications: Option<Specifications>,
    pub is_featured: bool,
}

impl Default for MachineDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            category: DEFAULT_CATEGORY.to_string(),
            technical_info: None,
            specifications: None,
            is_featured: false,
        }
    }
}

/// Administrator-supplied changes to an existing machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub technical_info: Option<Option<String>>,
    pub specifications: Option<Option<Specifications>>,
    pub is_featured: Option<bool>,
}

/// Administrator-supplied fields for a new customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDraft {
    pub name: String,
    pub description: Option<String>,
    pub is_featured: bool,
}

impl Default for CustomerDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            is_featured: true,
        }
    }
}

/// Administrator-supplied changes to an existing customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_featured: Option<bool>,
}

/// Insert payload for the `machines` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMachine {
    pub fields: MachineDraft,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

/// Update payload for the `machines` collection. `None` media URLs keep the
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachinePatch {
    pub changes: MachineChanges,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
}

impl MachinePatch {
    /// Apply the patch to a record in place (updated_at is left to the store).
    pub fn apply_to(&self, record: &mut MachineRecord) {
        let c = &self.changes;
        if let Some(name) = &c.name {
            record.name = name.clone();
        }
        if let Some(description) = &c.description {
            record.description = description.clone();
        }
        if let Some(category) = &c.category {
            record.category = category.clone();
        }
        if let Some(info) = &c.technical_info {
            record.technical_info = info.clone();
        }
        if let Some(specs) = &c.specifications {
            record.specifications = specs.clone();
        }
        if let Some(featured) = c.is_featured {
            record.is_featured = featured;
        }
        if let Some(url) = &self.image_url {
            record.image_url = Some(url.clone());
        }
        if let Some(url) = &self.video_url {
            record.video_url = Some(url.clone());
        }
    }
}

/// Insert payload for the `customers` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub fields: CustomerDraft,
    pub logo_url: Option<String>,
}

/// Update payload for the `customers` collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerPatch {
    pub changes: CustomerChanges,
    pub logo_url: Option<String>,
}

impl CustomerPatch {
    pub fn apply_to(&self, record: &mut CustomerRecord) {
        let c = &self.changes;
        if let Some(name) = &c.name {
            record.name = name.clone();
        }
        if let Some(description) = &c.description {
            record.description = description.clone();
        }
        if let Some(featured) = c.is_featured {
            record.is_featured = featured;
        }
        if let Some(url) = &self.logo_url {
            record.logo_url = Some(url.clone());
        }
    }
}

/// Required-field checks run before any upload or store call.
pub trait Validate {
    fn validate(&self) -> Result<(), CatalogError>;
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), CatalogError> {
    if value.trim().is_empty() {
        return Err(CatalogError::Validation {
            field,
            message: format!("{field} must not be empty"),
        });
    }
    Ok(())
}

fn validate_specifications(specs: &Specifications) -> Result<(), CatalogError> {
    if specs.keys().any(|k| k.trim().is_empty()) {
        return Err(CatalogError::Validation {
            field: "specifications",
            message: "specification keys must not be empty".into(),
        });
    }
    Ok(())
}

impl Validate for MachineDraft {
    fn validate(&self) -> Result<(), CatalogError> {
        require_non_empty("name", &self.name)?;
        require_non_empty("category", &self.category)?;
        if let Some(specs) = &self.specifications {
            validate_specifications(specs)?;
        }
        Ok(())
    }
}

impl Validate for MachineChanges {
    fn validate(&self) -> Result<(), CatalogError> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(category) = &self.category {
            require_non_empty("category", category)?;
        }
        if let Some(Some(specs)) = &self.specifications {
            validate_specifications(specs)?;
        }
        Ok(())
    }
}

impl Validate for CustomerDraft {
    fn validate(&self) -> Result<(), CatalogError> {
        require_non_empty("name", &self.name)
    }
}

impl Validate for CustomerChanges {
    fn validate(&self) -> Result<(), CatalogError> {
        match &self.name {
            Some(name) => require_non_empty("name", name),
            None => Ok(()),
        }
    }
}

/// Trimmed copy of a required text field.
fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

impl MachineDraft {
    /// Copy with required text fields trimmed.
    pub fn normalized(&self) -> Self {
        Self {
            name: trimmed(&self.name),
            category: trimmed(&self.category),
            ..self.clone()
        }
    }
}

impl MachineChanges {
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.as_deref().map(trimmed),
            category: self.category.as_deref().map(trimmed),
            ..self.clone()
        }
    }
}

impl CustomerDraft {
    pub fn normalized(&self) -> Self {
        Self {
            name: trimmed(&self.name),
            ..self.clone()
        }
    }
}

impl CustomerChanges {
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.as_deref().map(trimmed),
            ..self.clone()
        }
    }
}
