use std::sync::Arc;

use catalog::storage::filesystem::FilesystemObjectStore;
use catalog::storage::{ObjectStore, StorageError};
use catalog::{CatalogQueries, ContentWorkflow, RecordStore};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::store::SeaOrmStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DatabaseConnection,
    pub store: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub queries: Arc<CatalogQueries>,
    pub workflow: Arc<ContentWorkflow>,
}

impl AppState {
    /// Wire the catalog services on top of an initialized database.
    pub async fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, StorageError> {
        let objects: Arc<dyn ObjectStore> = Arc::new(
            FilesystemObjectStore::new(
                config.storage.root.clone(),
                config.storage.public_base_url.clone(),
                config.storage.max_object_size,
            )
            .await?,
        );
        let store: Arc<dyn RecordStore> = Arc::new(SeaOrmStore::new(db.clone()));
        let queries = Arc::new(CatalogQueries::new(
            Arc::clone(&store),
            config.catalog.query_settings(),
        ));
        let workflow = Arc::new(ContentWorkflow::new(
            Arc::clone(&store),
            Arc::clone(&objects),
            Arc::clone(&queries),
        ));

        Ok(Self {
            config,
            db,
            store,
            objects,
            queries,
            workflow,
        })
    }
}
