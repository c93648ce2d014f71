use thiserror::Error;

use crate::storage::StorageError;
use crate::store::StoreError;

/// A read through the query cache failed.
#[derive(Debug, Clone, Error)]
#[error("failed to load {key}: {source}")]
pub struct FetchError {
    /// Logical key of the failed query.
    pub key: String,
    #[source]
    pub source: StoreError,
}

/// Errors surfaced by the catalog workflow. None of them leave a record or
/// the cache in a partially written state.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required field is missing; nothing was uploaded or persisted.
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A media upload failed; the record was not written.
    #[error("media upload failed: {0}")]
    Upload(#[source] StorageError),

    /// Object storage failed outside of an upload, e.g. while listing.
    #[error("object storage error: {0}")]
    Storage(#[source] StorageError),

    /// The data store rejected an insert, update or delete.
    #[error("failed to save record: {0}")]
    Persistence(#[source] StoreError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl CatalogError {
    /// Whether the failure came from a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CatalogError::Persistence(StoreError::NotFound { .. })
                | CatalogError::Fetch(FetchError {
                    source: StoreError::NotFound { .. },
                    ..
                })
        )
    }
}
