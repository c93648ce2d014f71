//! Machine and customer catalog: record model, data store, cached reads and
//! the content-mutation workflow with media upload.

pub mod cache;
pub mod error;
pub mod query;
pub mod record;
pub mod storage;
pub mod store;
pub mod sweep;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use cache::{QueryCache, QueryStatus};
pub use error::{CatalogError, FetchError};
pub use query::{CatalogQueries, QueryKey, QuerySettings};
pub use record::{
    CustomerChanges, CustomerDraft, CustomerRecord, MachineChanges, MachineDraft, MachineRecord,
    RecordId, RecordKind, Specifications,
};
pub use store::{ListQuery, MemoryStore, RecordStore, StoreError, Table};
pub use sweep::{SweepReport, sweep_orphans};
pub use workflow::{
    ContentWorkflow, CustomerForm, FormAction, MachineForm, MediaFile, MediaSlot, Submission,
    SubmissionState,
};
