//! Create/edit/delete of catalog records with optional media upload.
//!
//! A submission moves through
//! `Idle → Validating → (UploadingMedia)? → Persisting → Succeeded | Failed`.
//! Uploads always finish before the record is written, and the record is only
//! written with URLs of uploads that returned `Ok`. On failure the submission
//! drops back to `Idle` holding the administrator's form unchanged.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::CatalogError;
use crate::query::{CatalogQueries, QueryKey};
use crate::record::{
    CustomerChanges, CustomerDraft, CustomerPatch, CustomerRecord, MachineChanges, MachineDraft,
    MachinePatch, MachineRecord, NewCustomer, NewMachine, RecordId, Validate,
};
use crate::storage::{ObjectPath, ObjectStore};
use crate::store::{RecordStore, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    UploadingMedia,
    Persisting,
    Succeeded,
    Failed,
}

/// Which media field an upload feeds, and where its objects are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot {
    MachineImage,
    MachineVideo,
    CustomerLogo,
}

impl MediaSlot {
    /// Bucket prefix for objects uploaded into this slot.
    pub fn prefix(self) -> &'static str {
        match self {
            MediaSlot::MachineImage => "machines/",
            MediaSlot::MachineVideo => "videos/",
            MediaSlot::CustomerLogo => "customers/",
        }
    }

    /// Form field carrying the file.
    pub fn field_name(self) -> &'static str {
        match self {
            MediaSlot::MachineImage => "image",
            MediaSlot::MachineVideo => "video",
            MediaSlot::CustomerLogo => "logo",
        }
    }
}

/// A file selected by the administrator.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Create a new record, or change an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormAction<D, C> {
    Create(D),
    Update { id: RecordId, changes: C },
}

impl<D: Validate, C: Validate> Validate for FormAction<D, C> {
    fn validate(&self) -> Result<(), CatalogError> {
        match self {
            FormAction::Create(draft) => draft.validate(),
            FormAction::Update { changes, .. } => changes.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineForm {
    pub action: FormAction<MachineDraft, MachineChanges>,
    pub image: Option<MediaFile>,
    pub video: Option<MediaFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerForm {
    pub action: FormAction<CustomerDraft, CustomerChanges>,
    pub logo: Option<MediaFile>,
}

impl MachineForm {
    pub fn create(draft: MachineDraft) -> Self {
        Self {
            action: FormAction::Create(draft),
            image: None,
            video: None,
        }
    }

    pub fn update(id: RecordId, changes: MachineChanges) -> Self {
        Self {
            action: FormAction::Update { id, changes },
            image: None,
            video: None,
        }
    }

    pub fn with_image(self, image: MediaFile) -> Self {
        Self {
            image: Some(image),
            ..self
        }
    }

    pub fn with_video(self, video: MediaFile) -> Self {
        Self {
            video: Some(video),
            ..self
        }
    }
}

impl CustomerForm {
    pub fn create(draft: CustomerDraft) -> Self {
        Self {
            action: FormAction::Create(draft),
            logo: None,
        }
    }

    pub fn update(id: RecordId, changes: CustomerChanges) -> Self {
        Self {
            action: FormAction::Update { id, changes },
            logo: None,
        }
    }

    pub fn with_logo(self, logo: MediaFile) -> Self {
        Self {
            logo: Some(logo),
            ..self
        }
    }
}

/// State tracked across one submission attempt.
#[derive(Debug)]
struct Progress {
    state: SubmissionState,
    visited: Vec<SubmissionState>,
    last_error: Option<String>,
}

impl Progress {
    fn begin(&mut self) {
        self.visited.clear();
        self.last_error = None;
        self.enter(SubmissionState::Validating);
    }

    fn enter(&mut self, next: SubmissionState) {
        debug!(from = ?self.state, to = ?next, "submission state");
        self.state = next;
        self.visited.push(next);
    }

    fn settle<T>(&mut self, outcome: Result<T, CatalogError>) -> Result<T, CatalogError> {
        match outcome {
            Ok(value) => {
                self.enter(SubmissionState::Succeeded);
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "submission failed");
                self.enter(SubmissionState::Failed);
                self.last_error = Some(err.to_string());
                self.enter(SubmissionState::Idle);
                Err(err)
            }
        }
    }
}

/// A form plus the state of its latest submission attempt.
///
/// The workflow only ever reads the form, so after a failure the caller can
/// fix a field and resubmit the same `Submission`.
#[derive(Debug)]
pub struct Submission<F> {
    form: F,
    progress: Progress,
}

impl<F> Submission<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            progress: Progress {
                state: SubmissionState::Idle,
                visited: Vec::new(),
                last_error: None,
            },
        }
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn state(&self) -> SubmissionState {
        self.progress.state
    }

    /// States entered during the latest attempt, in order.
    pub fn visited(&self) -> &[SubmissionState] {
        &self.progress.visited
    }

    /// Human-readable message of the latest failure, if the attempt failed.
    pub fn last_error(&self) -> Option<&str> {
        self.progress.last_error.as_deref()
    }
}

/// Orchestrates record writes, media uploads and cache invalidation.
pub struct ContentWorkflow {
    store: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    queries: Arc<CatalogQueries>,
}

impl ContentWorkflow {
    pub fn new(
        store: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        queries: Arc<CatalogQueries>,
    ) -> Self {
        Self {
            store,
            objects,
            queries,
        }
    }

    #[instrument(skip_all)]
    pub async fn submit_machine(
        &self,
        submission: &mut Submission<MachineForm>,
    ) -> Result<MachineRecord, CatalogError> {
        let Submission { form, progress } = submission;
        progress.begin();
        let outcome = self.drive_machine(form, progress).await;
        progress.settle(outcome)
    }

    #[instrument(skip_all)]
    pub async fn submit_customer(
        &self,
        submission: &mut Submission<CustomerForm>,
    ) -> Result<CustomerRecord, CatalogError> {
        let Submission { form, progress } = submission;
        progress.begin();
        let outcome = self.drive_customer(form, progress).await;
        progress.settle(outcome)
    }

    /// Delete a machine. Caches are only touched when the store delete succeeds.
    #[instrument(skip(self))]
    pub async fn delete_machine(&self, id: RecordId) -> Result<(), CatalogError> {
        Table::<MachineRecord>::delete(&*self.store, id)
            .await
            .map_err(CatalogError::Persistence)?;
        self.queries.invalidate(&QueryKey::machine_mutation(id));
        self.queries.forget(&QueryKey::Machine(id));
        info!(%id, "machine deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_customer(&self, id: RecordId) -> Result<(), CatalogError> {
        Table::<CustomerRecord>::delete(&*self.store, id)
            .await
            .map_err(CatalogError::Persistence)?;
        self.queries.invalidate(&QueryKey::customer_mutation());
        info!(%id, "customer deleted");
        Ok(())
    }

    async fn drive_machine(
        &self,
        form: &MachineForm,
        progress: &mut Progress,
    ) -> Result<MachineRecord, CatalogError> {
        form.action.validate()?;

        let mut image_url = None;
        let mut video_url = None;
        if form.image.is_some() || form.video.is_some() {
            progress.enter(SubmissionState::UploadingMedia);
            if let Some(file) = &form.image {
                image_url = Some(self.upload(MediaSlot::MachineImage, file).await?);
            }
            if let Some(file) = &form.video {
                video_url = Some(self.upload(MediaSlot::MachineVideo, file).await?);
            }
        }

        progress.enter(SubmissionState::Persisting);
        let record = match &form.action {
            FormAction::Create(draft) => {
                let new = NewMachine {
                    fields: draft.normalized(),
                    image_url,
                    video_url,
                };
                Table::<MachineRecord>::insert(&*self.store, new).await
            }
            FormAction::Update { id, changes } => {
                let patch = MachinePatch {
                    changes: changes.normalized(),
                    image_url,
                    video_url,
                };
                Table::<MachineRecord>::update(&*self.store, *id, patch).await
            }
        }
        .map_err(CatalogError::Persistence)?;

        self.queries
            .invalidate(&QueryKey::machine_mutation(record.id));
        info!(id = %record.id, name = %record.name, "machine saved");
        Ok(record)
    }

    async fn drive_customer(
        &self,
        form: &CustomerForm,
        progress: &mut Progress,
    ) -> Result<CustomerRecord, CatalogError> {
        form.action.validate()?;

        let mut logo_url = None;
        if let Some(file) = &form.logo {
            progress.enter(SubmissionState::UploadingMedia);
            logo_url = Some(self.upload(MediaSlot::CustomerLogo, file).await?);
        }

        progress.enter(SubmissionState::Persisting);
        let record = match &form.action {
            FormAction::Create(draft) => {
                let new = NewCustomer {
                    fields: draft.normalized(),
                    logo_url,
                };
                Table::<CustomerRecord>::insert(&*self.store, new).await
            }
            FormAction::Update { id, changes } => {
                let patch = CustomerPatch {
                    changes: changes.normalized(),
                    logo_url,
                };
                Table::<CustomerRecord>::update(&*self.store, *id, patch).await
            }
        }
        .map_err(CatalogError::Persistence)?;

        self.queries.invalidate(&QueryKey::customer_mutation());
        info!(id = %record.id, name = %record.name, "customer saved");
        Ok(record)
    }

    /// Upload one file and resolve its public URL.
    async fn upload(&self, slot: MediaSlot, file: &MediaFile) -> Result<String, CatalogError> {
        let path = ObjectPath::generate(slot.prefix(), &file.file_name);
        self.objects
            .upload(&path, &file.bytes, file.content_type.as_deref())
            .await
            .map_err(CatalogError::Upload)?;
        let url = self.objects.public_url(&path);
        debug!(slot = slot.field_name(), %path, "media uploaded");
        Ok(url)
    }
}
