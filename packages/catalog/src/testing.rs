//! Store doubles shared by the catalog's unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::record::{CatalogRecord, RecordId};
use crate::storage::{BoxReader, ObjectInfo, ObjectPath, ObjectStore, StorageError};
use crate::store::{ListQuery, MemoryStore, StoreError, Table};

/// [`MemoryStore`] that counts writes and can be told to fail them.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.inserts() + self.updates() + self.deletes.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl<R> Table<R> for CountingStore
where
    R: CatalogRecord,
    MemoryStore: Table<R>,
{
    async fn select(&self, query: ListQuery) -> Result<Vec<R>, StoreError> {
        Table::<R>::select(&self.inner, query).await
    }

    async fn find(&self, id: RecordId) -> Result<Option<R>, StoreError> {
        Table::<R>::find(&self.inner, id).await
    }

    async fn insert(&self, new: R::New) -> Result<R, StoreError> {
        self.check_write()?;
        let record = Table::<R>::insert(&self.inner, new).await?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn update(&self, id: RecordId, patch: R::Patch) -> Result<R, StoreError> {
        self.check_write()?;
        let record = Table::<R>::update(&self.inner, id, patch).await?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.check_write()?;
        Table::<R>::delete(&self.inner, id).await?;
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory [`ObjectStore`] with controllable upload failures.
pub struct FakeObjectStore {
    objects: Mutex<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,
    uploads: AtomicUsize,
    /// Uploads still allowed before failing; negative means unlimited.
    upload_budget: AtomicI64,
    fail_listing: AtomicBool,
}

impl FakeObjectStore {
    pub const BASE_URL: &'static str = "https://cdn.test/storage";

    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            uploads: AtomicUsize::new(0),
            upload_budget: AtomicI64::new(-1),
            fail_listing: AtomicBool::new(false),
        }
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.upload_budget
            .store(if fail { 0 } else { -1 }, Ordering::SeqCst);
    }

    /// Let `n` more uploads succeed, then fail every later one.
    pub fn fail_uploads_after(&self, n: i64) {
        self.upload_budget.store(n, Ordering::SeqCst);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Successful uploads so far.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn uploaded_urls(&self) -> Vec<String> {
        let objects = self.objects.lock().unwrap();
        objects
            .keys()
            .map(|path| format!("{}/{path}", Self::BASE_URL))
            .collect()
    }

    /// Place an object directly, bypassing the failure switch.
    pub fn put(&self, path: &str, modified_at: DateTime<Utc>) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (b"seed".to_vec(), modified_at));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn upload(
        &self,
        path: &ObjectPath,
        data: &[u8],
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let budget = self.upload_budget.load(Ordering::SeqCst);
        if budget == 0 {
            return Err(StorageError::Io(std::io::Error::other("bucket unavailable")));
        }
        if budget > 0 {
            self.upload_budget.fetch_sub(1, Ordering::SeqCst);
        }
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (data.to_vec(), Utc::now()));
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        Self::BASE_URL
    }

    async fn open(&self, path: &ObjectPath) -> Result<BoxReader, StorageError> {
        let objects = self.objects.lock().unwrap();
        let (bytes, _) = objects
            .get(path.as_str())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        Ok(Box::new(std::io::Cursor::new(bytes.clone())))
    }

    async fn list(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("listing unavailable")));
        }
        let objects = self.objects.lock().unwrap();
        objects
            .iter()
            .map(|(path, (bytes, modified_at))| {
                Ok(ObjectInfo {
                    path: ObjectPath::parse(path)?,
                    size: bytes.len() as u64,
                    modified_at: *modified_at,
                })
            })
            .collect()
    }

    async fn delete(&self, path: &ObjectPath) -> Result<bool, StorageError> {
        Ok(self.objects.lock().unwrap().remove(path.as_str()).is_some())
    }
}
