use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{ListQuery, StoreError, Table};
use crate::record::{
    CatalogRecord, CustomerPatch, CustomerRecord, MachinePatch, MachineRecord, NewCustomer,
    NewMachine, RecordId,
};

/// In-process data store.
///
/// Used for local development without a database and as the store behind
/// the catalog's own tests. Timestamps are strictly increasing so that an
/// update always advances `updated_at`.
#[derive(Default)]
pub struct MemoryStore {
    machines: Mutex<HashMap<RecordId, MachineRecord>>,
    customers: Mutex<HashMap<RecordId, CustomerRecord>>,
    clock: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> Result<DateTime<Utc>, StoreError> {
        let mut last = self.clock.lock().map_err(|_| poisoned())?;
        let now = Utc::now();
        let next = match *last {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        *last = Some(next);
        Ok(next)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

fn apply_query<R, F>(rows: impl Iterator<Item = R>, query: ListQuery, created: F) -> Vec<R>
where
    R: CatalogRecord + FeaturedFlag,
    F: Fn(&R) -> DateTime<Utc>,
{
    let mut rows: Vec<R> = rows
        .filter(|r| query.featured.is_none_or(|f| r.featured() == f))
        .collect();
    rows.sort_by(|a, b| (created(a), a.id()).cmp(&(created(b), b.id())));
    if query.newest_first {
        rows.reverse();
    }
    if let Some(limit) = query.limit {
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }
    rows
}

trait FeaturedFlag {
    fn featured(&self) -> bool;
}

impl FeaturedFlag for MachineRecord {
    fn featured(&self) -> bool {
        self.is_featured
    }
}

impl FeaturedFlag for CustomerRecord {
    fn featured(&self) -> bool {
        self.is_featured
    }
}

#[async_trait]
impl Table<MachineRecord> for MemoryStore {
    async fn select(&self, query: ListQuery) -> Result<Vec<MachineRecord>, StoreError> {
        let rows = self.machines.lock().map_err(|_| poisoned())?;
        Ok(apply_query(rows.values().cloned(), query, |m| m.created_at))
    }

    async fn find(&self, id: RecordId) -> Result<Option<MachineRecord>, StoreError> {
        let rows = self.machines.lock().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }

    async fn insert(&self, new: NewMachine) -> Result<MachineRecord, StoreError> {
        let now = self.tick()?;
        let NewMachine {
            fields,
            image_url,
            video_url,
        } = new;
        let record = MachineRecord {
            id: Uuid::now_v7(),
            name: fields.name,
            description: fields.description,
            category: fields.category,
            image_url,
            video_url,
            technical_info: fields.technical_info,
            specifications: fields.specifications,
            is_featured: fields.is_featured,
            created_at: now,
            updated_at: now,
        };
        let mut rows = self.machines.lock().map_err(|_| poisoned())?;
        rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: RecordId, patch: MachinePatch) -> Result<MachineRecord, StoreError> {
        let now = self.tick()?;
        let mut rows = self.machines.lock().map_err(|_| poisoned())?;
        let record = rows.get_mut(&id).ok_or(StoreError::NotFound {
            kind: MachineRecord::KIND,
            id,
        })?;
        patch.apply_to(record);
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let mut rows = self.machines.lock().map_err(|_| poisoned())?;
        rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound {
            kind: MachineRecord::KIND,
            id,
        })
    }
}

#[async_trait]
impl Table<CustomerRecord> for MemoryStore {
    async fn select(&self, query: ListQuery) -> Result<Vec<CustomerRecord>, StoreError> {
        let rows = self.customers.lock().map_err(|_| poisoned())?;
        Ok(apply_query(rows.values().cloned(), query, |c| c.created_at))
    }

    async fn find(&self, id: RecordId) -> Result<Option<CustomerRecord>, StoreError> {
        let rows = self.customers.lock().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned())
    }

    async fn insert(&self, new: NewCustomer) -> Result<CustomerRecord, StoreError> {
        let now = self.tick()?;
        let NewCustomer { fields, logo_url } = new;
        let record = CustomerRecord {
            id: Uuid::now_v7(),
            name: fields.name,
            logo_url,
            description: fields.description,
            is_featured: fields.is_featured,
            created_at: now,
            updated_at: now,
        };
        let mut rows = self.customers.lock().map_err(|_| poisoned())?;
        rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: RecordId,
        patch: CustomerPatch,
    ) -> Result<CustomerRecord, StoreError> {
        let now = self.tick()?;
        let mut rows = self.customers.lock().map_err(|_| poisoned())?;
        let record = rows.get_mut(&id).ok_or(StoreError::NotFound {
            kind: CustomerRecord::KIND,
            id,
        })?;
        patch.apply_to(record);
        record.updated_at = now;
        Ok(record.clone())
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let mut rows = self.customers.lock().map_err(|_| poisoned())?;
        rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound {
            kind: CustomerRecord::KIND,
            id,
        })
    }
}
