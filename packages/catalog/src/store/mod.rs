//! The remote data store: two collections with filtered/ordered/limited
//! selects and single-row insert, update and delete.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{CatalogRecord, CustomerRecord, MachineRecord, RecordId, RecordKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: RecordId },

    #[error("data store error: {0}")]
    Backend(String),
}

/// Shape of a collection select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListQuery {
    /// Equality filter on `is_featured`.
    pub featured: Option<bool>,
    /// Order by `created_at` descending when set, ascending otherwise.
    pub newest_first: bool,
    pub limit: Option<u64>,
}

impl ListQuery {
    /// Every record, newest first.
    pub fn all() -> Self {
        Self {
            featured: None,
            newest_first: true,
            limit: None,
        }
    }

    /// Featured records only, newest first.
    pub fn featured() -> Self {
        Self {
            featured: Some(true),
            ..Self::all()
        }
    }

    pub fn with_limit(self, limit: u64) -> Self {
        Self {
            limit: Some(limit),
            ..self
        }
    }
}

/// One collection of the remote data store.
///
/// Every call is a single atomic row operation; there are no multi-row
/// transactions.
#[async_trait]
pub trait Table<R: CatalogRecord>: Send + Sync {
    async fn select(&self, query: ListQuery) -> Result<Vec<R>, StoreError>;

    async fn find(&self, id: RecordId) -> Result<Option<R>, StoreError>;

    /// Insert a record; the store assigns its id and timestamps.
    async fn insert(&self, new: R::New) -> Result<R, StoreError>;

    /// Apply a partial update and advance `updated_at`.
    ///
    /// Fails with [`StoreError::NotFound`] if no record has this id.
    async fn update(&self, id: RecordId, patch: R::Patch) -> Result<R, StoreError>;

    /// Fails with [`StoreError::NotFound`] if no record has this id.
    async fn delete(&self, id: RecordId) -> Result<(), StoreError>;
}

/// A data store holding both catalog collections.
pub trait RecordStore: Table<MachineRecord> + Table<CustomerRecord> {}

impl<T> RecordStore for T where T: Table<MachineRecord> + Table<CustomerRecord> {}
