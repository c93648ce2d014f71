//! sea-orm implementation of the catalog's data store.

use async_trait::async_trait;
use catalog::record::{
    CatalogRecord, CustomerPatch, MachinePatch, NewCustomer, NewMachine, Specifications,
};
use catalog::{CustomerRecord, ListQuery, MachineRecord, RecordId, StoreError, Table};
use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::{customer, machine};

/// Both catalog collections, backed by one database connection pool.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn specs_from_json(
    value: Option<serde_json::Value>,
) -> Result<Option<Specifications>, StoreError> {
    value
        .map(|v| {
            serde_json::from_value(v)
                .map_err(|e| StoreError::Backend(format!("malformed specifications: {e}")))
        })
        .transpose()
}

fn specs_to_json(
    specs: Option<&Specifications>,
) -> Result<Option<serde_json::Value>, StoreError> {
    specs
        .map(|s| {
            serde_json::to_value(s)
                .map_err(|e| StoreError::Backend(format!("unencodable specifications: {e}")))
        })
        .transpose()
}

fn machine_from_model(model: machine::Model) -> Result<MachineRecord, StoreError> {
    Ok(MachineRecord {
        id: model.id,
        name: model.name,
        description: model.description,
        category: model.category,
        image_url: model.image_url,
        video_url: model.video_url,
        technical_info: model.technical_info,
        specifications: specs_from_json(model.specifications)?,
        is_featured: model.is_featured,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn machine_to_active(record: &MachineRecord) -> Result<machine::ActiveModel, StoreError> {
    Ok(machine::ActiveModel {
        id: Set(record.id),
        name: Set(record.name.clone()),
        description: Set(record.description.clone()),
        category: Set(record.category.clone()),
        image_url: Set(record.image_url.clone()),
        video_url: Set(record.video_url.clone()),
        technical_info: Set(record.technical_info.clone()),
        specifications: Set(specs_to_json(record.specifications.as_ref())?),
        is_featured: Set(record.is_featured),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    })
}

fn customer_from_model(model: customer::Model) -> CustomerRecord {
    CustomerRecord {
        id: model.id,
        name: model.name,
        logo_url: model.logo_url,
        description: model.description,
        is_featured: model.is_featured,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn customer_to_active(record: &CustomerRecord) -> customer::ActiveModel {
    customer::ActiveModel {
        id: Set(record.id),
        name: Set(record.name.clone()),
        logo_url: Set(record.logo_url.clone()),
        description: Set(record.description.clone()),
        is_featured: Set(record.is_featured),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

/// Columns touched by a machine patch. Everything else stays `NotSet`, so the
/// UPDATE never writes a column the patch did not change.
fn machine_patch_to_active(
    id: RecordId,
    patch: &MachinePatch,
) -> Result<machine::ActiveModel, StoreError> {
    let c = &patch.changes;
    let mut active = machine::ActiveModel {
        id: Unchanged(id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(name) = &c.name {
        active.name = Set(name.clone());
    }
    if let Some(description) = &c.description {
        active.description = Set(description.clone());
    }
    if let Some(category) = &c.category {
        active.category = Set(category.clone());
    }
    if let Some(info) = &c.technical_info {
        active.technical_info = Set(info.clone());
    }
    if let Some(specs) = &c.specifications {
        active.specifications = Set(specs_to_json(specs.as_ref())?);
    }
    if let Some(featured) = c.is_featured {
        active.is_featured = Set(featured);
    }
    if let Some(url) = &patch.image_url {
        active.image_url = Set(Some(url.clone()));
    }
    if let Some(url) = &patch.video_url {
        active.video_url = Set(Some(url.clone()));
    }
    Ok(active)
}

fn customer_patch_to_active(id: RecordId, patch: &CustomerPatch) -> customer::ActiveModel {
    let c = &patch.changes;
    let mut active = customer::ActiveModel {
        id: Unchanged(id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(name) = &c.name {
        active.name = Set(name.clone());
    }
    if let Some(description) = &c.description {
        active.description = Set(description.clone());
    }
    if let Some(featured) = c.is_featured {
        active.is_featured = Set(featured);
    }
    if let Some(url) = &patch.logo_url {
        active.logo_url = Set(Some(url.clone()));
    }
    active
}

/// Map "no row matched" from an update to the store's not-found error.
fn update_err<R: CatalogRecord>(id: RecordId) -> impl FnOnce(DbErr) -> StoreError {
    move |err| match err {
        DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => StoreError::NotFound {
            kind: R::KIND,
            id,
        },
        other => backend(other),
    }
}

#[async_trait]
impl Table<MachineRecord> for SeaOrmStore {
    async fn select(&self, query: ListQuery) -> Result<Vec<MachineRecord>, StoreError> {
        let mut select = machine::Entity::find();
        if let Some(featured) = query.featured {
            select = select.filter(machine::Column::IsFeatured.eq(featured));
        }
        select = if query.newest_first {
            select
                .order_by_desc(machine::Column::CreatedAt)
                .order_by_desc(machine::Column::Id)
        } else {
            select
                .order_by_asc(machine::Column::CreatedAt)
                .order_by_asc(machine::Column::Id)
        };
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        let rows = select.all(&self.db).await.map_err(backend)?;
        rows.into_iter().map(machine_from_model).collect()
    }

    async fn find(&self, id: RecordId) -> Result<Option<MachineRecord>, StoreError> {
        machine::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(machine_from_model)
            .transpose()
    }

    async fn insert(&self, new: NewMachine) -> Result<MachineRecord, StoreError> {
        let now = Utc::now();
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

        let model = machine_to_active(&record)?
            .insert(&self.db)
            .await
            .map_err(backend)?;
        machine_from_model(model)
    }

    async fn update(&self, id: RecordId, patch: MachinePatch) -> Result<MachineRecord, StoreError> {
        let model = machine_patch_to_active(id, &patch)?
            .update(&self.db)
            .await
            .map_err(update_err::<MachineRecord>(id))?;
        machine_from_model(model)
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let result = machine::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(backend)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                kind: MachineRecord::KIND,
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Table<CustomerRecord> for SeaOrmStore {
    async fn select(&self, query: ListQuery) -> Result<Vec<CustomerRecord>, StoreError> {
        let mut select = customer::Entity::find();
        if let Some(featured) = query.featured {
            select = select.filter(customer::Column::IsFeatured.eq(featured));
        }
        select = if query.newest_first {
            select
                .order_by_desc(customer::Column::CreatedAt)
                .order_by_desc(customer::Column::Id)
        } else {
            select
                .order_by_asc(customer::Column::CreatedAt)
                .order_by_asc(customer::Column::Id)
        };
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        let rows = select.all(&self.db).await.map_err(backend)?;
        Ok(rows.into_iter().map(customer_from_model).collect())
    }

    async fn find(&self, id: RecordId) -> Result<Option<CustomerRecord>, StoreError> {
        Ok(customer::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(customer_from_model))
    }

    async fn insert(&self, new: NewCustomer) -> Result<CustomerRecord, StoreError> {
        let now = Utc::now();
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

        let model = customer_to_active(&record)
            .insert(&self.db)
            .await
            .map_err(backend)?;
        Ok(customer_from_model(model))
    }

    async fn update(
        &self,
        id: RecordId,
        patch: CustomerPatch,
    ) -> Result<CustomerRecord, StoreError> {
        let model = customer_patch_to_active(id, &patch)
            .update(&self.db)
            .await
            .map_err(update_err::<CustomerRecord>(id))?;
        Ok(customer_from_model(model))
    }

    async fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        let result = customer::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(backend)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound {
                kind: CustomerRecord::KIND,
                id,
            });
        }
        Ok(())
    }
}
