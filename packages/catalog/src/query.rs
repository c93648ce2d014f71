use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::cache::{QueryCache, QueryStatus};
use crate::error::FetchError;
use crate::record::{CustomerRecord, MachineRecord, RecordId};
use crate::store::{ListQuery, RecordStore, Table};

/// Logical identifier of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Public machine listing.
    Machines,
    /// Home-page featured machines.
    FeaturedMachines,
    /// Single machine detail.
    Machine(RecordId),
    /// Admin machine table.
    AdminMachines,
    /// Public customer showcase.
    Customers,
    /// Admin customer table.
    AdminCustomers,
}

impl QueryKey {
    /// Keys that can contain a machine, invalidated after every machine write.
    pub fn machine_mutation(id: RecordId) -> [QueryKey; 4] {
        [
            QueryKey::Machines,
            QueryKey::FeaturedMachines,
            QueryKey::AdminMachines,
            QueryKey::Machine(id),
        ]
    }

    /// Keys that can contain a customer, invalidated after every customer write.
    pub fn customer_mutation() -> [QueryKey; 2] {
        [QueryKey::Customers, QueryKey::AdminCustomers]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Machines => f.write_str("machines"),
            QueryKey::FeaturedMachines => f.write_str("featured-machines"),
            QueryKey::Machine(id) => write!(f, "machine:{id}"),
            QueryKey::AdminMachines => f.write_str("admin-machines"),
            QueryKey::Customers => f.write_str("customers"),
            QueryKey::AdminCustomers => f.write_str("admin-customers"),
        }
    }
}

/// Tunables for [`CatalogQueries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    /// Number of machines shown in the featured strip.
    pub featured_limit: u64,
    /// Optional freshness bound on top of explicit invalidation.
    pub max_age: Option<Duration>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            featured_limit: 3,
            max_age: None,
        }
    }
}

/// Cached, typed reads of the catalog.
///
/// Every read goes through a [`QueryCache`]; writers call [`invalidate`]
/// with the key set of the record they touched.
///
/// [`invalidate`]: CatalogQueries::invalidate
pub struct CatalogQueries {
    store: Arc<dyn RecordStore>,
    settings: QuerySettings,
    machine_lists: QueryCache<QueryKey, Vec<MachineRecord>>,
    machine_details: QueryCache<QueryKey, Option<MachineRecord>>,
    customer_lists: QueryCache<QueryKey, Vec<CustomerRecord>>,
}

impl CatalogQueries {
    pub fn new(store: Arc<dyn RecordStore>, settings: QuerySettings) -> Self {
        Self {
            store,
            settings,
            machine_lists: QueryCache::with_max_age(settings.max_age),
            machine_details: QueryCache::with_max_age(settings.max_age),
            customer_lists: QueryCache::with_max_age(settings.max_age),
        }
    }

    #[instrument(skip(self))]
    pub async fn machines(&self) -> Result<Vec<MachineRecord>, FetchError> {
        self.machine_list(QueryKey::Machines, ListQuery::all()).await
    }

    #[instrument(skip(self))]
    pub async fn featured_machines(&self) -> Result<Vec<MachineRecord>, FetchError> {
        let query = ListQuery::featured().with_limit(self.settings.featured_limit);
        self.machine_list(QueryKey::FeaturedMachines, query).await
    }

    #[instrument(skip(self))]
    pub async fn admin_machines(&self) -> Result<Vec<MachineRecord>, FetchError> {
        self.machine_list(QueryKey::AdminMachines, ListQuery::all()).await
    }

    /// A single machine, or `None` if no machine has this id.
    ///
    /// Only ids that resolved to a machine stay cached, so lookups of unknown
    /// ids do not accumulate keys.
    #[instrument(skip(self))]
    pub async fn machine(&self, id: RecordId) -> Result<Option<MachineRecord>, FetchError> {
        let key = QueryKey::Machine(id);
        let store = Arc::clone(&self.store);
        let result = self
            .machine_details
            .fetch(key.clone(), move || async move {
                Table::<MachineRecord>::find(&*store, id).await
            })
            .await;
        if !matches!(result, Ok(Some(_))) {
            self.machine_details
                .evict_if(&key, |cached| !matches!(cached, Some(Some(_))));
        }
        result
    }

    #[instrument(skip(self))]
    pub async fn customers(&self) -> Result<Vec<CustomerRecord>, FetchError> {
        self.customer_list(QueryKey::Customers, ListQuery::featured())
            .await
    }

    #[instrument(skip(self))]
    pub async fn admin_customers(&self) -> Result<Vec<CustomerRecord>, FetchError> {
        self.customer_list(QueryKey::AdminCustomers, ListQuery::all())
            .await
    }

    async fn machine_list(
        &self,
        key: QueryKey,
        query: ListQuery,
    ) -> Result<Vec<MachineRecord>, FetchError> {
        let store = Arc::clone(&self.store);
        self.machine_lists
            .fetch(key, move || async move {
                Table::<MachineRecord>::select(&*store, query).await
            })
            .await
    }

    async fn customer_list(
        &self,
        key: QueryKey,
        query: ListQuery,
    ) -> Result<Vec<CustomerRecord>, FetchError> {
        let store = Arc::clone(&self.store);
        self.customer_lists
            .fetch(key, move || async move {
                Table::<CustomerRecord>::select(&*store, query).await
            })
            .await
    }

    /// Mark keys stale; their next read refetches from the store.
    pub fn invalidate(&self, keys: &[QueryKey]) {
        for key in keys {
            self.cache_for(key).invalidate(key);
        }
    }

    /// Drop a key altogether, e.g. the detail of a deleted record.
    pub fn forget(&self, key: &QueryKey) {
        self.cache_for(key).forget(key);
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        self.cache_for(key).status(key)
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.cache_for(key).is_fresh(key)
    }

    fn cache_for(&self, key: &QueryKey) -> &dyn KeyedCache {
        match key {
            QueryKey::Machines | QueryKey::FeaturedMachines | QueryKey::AdminMachines => {
                &self.machine_lists
            }
            QueryKey::Machine(_) => &self.machine_details,
            QueryKey::Customers | QueryKey::AdminCustomers => &self.customer_lists,
        }
    }
}

/// Value-type-erased view of a cache, for routing key operations.
trait KeyedCache: Send + Sync {
    fn invalidate(&self, key: &QueryKey);
    fn forget(&self, key: &QueryKey);
    fn status(&self, key: &QueryKey) -> QueryStatus;
    fn is_fresh(&self, key: &QueryKey) -> bool;
}

impl<V: Clone + Send + Sync> KeyedCache for QueryCache<QueryKey, V> {
    fn invalidate(&self, key: &QueryKey) {
        QueryCache::invalidate(self, [key]);
    }

    fn forget(&self, key: &QueryKey) {
        QueryCache::forget(self, key);
    }

    fn status(&self, key: &QueryKey) -> QueryStatus {
        QueryCache::status(self, key)
    }

    fn is_fresh(&self, key: &QueryKey) -> bool {
        QueryCache::is_fresh(self, key)
    }
}
