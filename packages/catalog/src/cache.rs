//! Keyed query cache with per-key request de-duplication.
//!
//! Each key owns an entry with an async fetch lock, an invalidation epoch and
//! the last fetched value. A value is fresh while the epoch it was fetched
//! under is still current (and, if configured, younger than `max_age`).
//! Invalidation only bumps the epoch, so it never waits on an in-flight
//! fetch; a fetch that lands after an invalidation is stored but stays stale.
//! A fetch whose caller goes away mid-query leaves the key in the state it
//! had before that fetch started.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::store::StoreError;

/// Load status of a single logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// Never fetched.
    Idle,
    Loading,
    Success,
    /// The last fetch failed; any previous value is still available via `peek`.
    Error(String),
}

struct Slot<V> {
    value: Option<V>,
    fetched_epoch: Option<u64>,
    fetched_at: Option<Instant>,
    status: QueryStatus,
    last_error: Option<FetchError>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            fetched_epoch: None,
            fetched_at: None,
            status: QueryStatus::Idle,
            last_error: None,
        }
    }
}

struct Entry<V> {
    fetch_lock: tokio::sync::Mutex<()>,
    epoch: AtomicU64,
    completed: AtomicU64,
    slot: Mutex<Slot<V>>,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            fetch_lock: tokio::sync::Mutex::new(()),
            epoch: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            slot: Mutex::new(Slot::default()),
        }
    }
}

impl<V> Entry<V> {
    fn slot(&self) -> MutexGuard<'_, Slot<V>> {
        // A panic while holding the slot lock cannot leave it half-written:
        // every critical section only assigns whole fields.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<V: Clone> Entry<V> {
    fn fresh_value(&self, max_age: Option<Duration>) -> Option<V> {
        let slot = self.slot();
        if slot.fetched_epoch != Some(self.epoch.load(Ordering::Acquire)) {
            return None;
        }
        if let (Some(max_age), Some(at)) = (max_age, slot.fetched_at)
            && at.elapsed() > max_age
        {
            return None;
        }
        slot.value.clone()
    }
}

/// Puts the status a fetch replaced with `Loading` back if the fetch is
/// dropped before its query completes.
struct LoadingGuard<'a, V> {
    entry: &'a Entry<V>,
    previous: Option<QueryStatus>,
}

impl<'a, V> LoadingGuard<'a, V> {
    fn start(entry: &'a Entry<V>) -> Self {
        let previous = std::mem::replace(&mut entry.slot().status, QueryStatus::Loading);
        Self {
            entry,
            previous: Some(previous),
        }
    }

    fn finish(mut self) {
        self.previous = None;
    }
}

impl<V> Drop for LoadingGuard<'_, V> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let mut slot = self.entry.slot();
            if slot.status == QueryStatus::Loading {
                slot.status = previous;
            }
        }
    }
}

/// Process-wide cache of query results keyed by logical identifier.
pub struct QueryCache<K, V> {
    entries: DashMap<K, Arc<Entry<V>>>,
    max_age: Option<Duration>,
}

impl<K, V> Default for QueryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            max_age: None,
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    /// Cache where values stay fresh until invalidated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache where values additionally go stale after `max_age`.
    pub fn with_max_age(max_age: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            max_age,
        }
    }

    fn entry(&self, key: &K) -> Arc<Entry<V>> {
        if let Some(entry) = self.entries.get(key) {
            return Arc::clone(entry.value());
        }
        Arc::clone(self.entries.entry(key.clone()).or_default().value())
    }

    /// Return the cached value for `key` if fresh, otherwise run `query`.
    ///
    /// Concurrent callers for the same key share one underlying query: the
    /// first caller runs it, later callers wait and receive its outcome.
    pub async fn fetch<F, Fut>(&self, key: K, query: F) -> Result<V, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, StoreError>>,
    {
        let entry = self.entry(&key);
        if let Some(value) = entry.fresh_value(self.max_age) {
            return Ok(value);
        }

        let seen = entry.completed.load(Ordering::Acquire);
        let _guard = entry.fetch_lock.lock().await;

        if let Some(value) = entry.fresh_value(self.max_age) {
            return Ok(value);
        }
        if entry.completed.load(Ordering::Acquire) != seen {
            // A fetch finished while this caller waited. Share its failure
            // rather than hitting the store again; a stale success means an
            // invalidation landed since, so fall through and refetch.
            let slot = entry.slot();
            if let Some(err) = &slot.last_error
                && matches!(slot.status, QueryStatus::Error(_))
            {
                return Err(err.clone());
            }
        }

        let epoch = entry.epoch.load(Ordering::Acquire);
        let loading = LoadingGuard::start(&entry);
        debug!(%key, "cache miss, querying store");

        let result = query().await;

        loading.finish();
        let mut slot = entry.slot();
        entry.completed.fetch_add(1, Ordering::AcqRel);
        match result {
            Ok(value) => {
                slot.value = Some(value.clone());
                slot.fetched_epoch = Some(epoch);
                slot.fetched_at = Some(Instant::now());
                slot.status = QueryStatus::Success;
                slot.last_error = None;
                Ok(value)
            }
            Err(source) => {
                warn!(%key, error = %source, "query failed, keeping previous value");
                let err = FetchError {
                    key: key.to_string(),
                    source,
                };
                slot.status = QueryStatus::Error(err.to_string());
                slot.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Mark keys stale so their next `fetch` goes to the store.
    ///
    /// Idempotent; keys that were never fetched are ignored.
    pub fn invalidate<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for key in keys {
            if let Some(entry) = self.entries.get(key) {
                entry.epoch.fetch_add(1, Ordering::AcqRel);
                debug!(%key, "invalidated");
            }
        }
    }

    /// Drop `key` entirely if `unwanted` holds for its last value (`None`
    /// when nothing was ever stored). A later `fetch` starts from scratch.
    pub fn evict_if<P>(&self, key: &K, unwanted: P)
    where
        P: FnOnce(Option<&V>) -> bool,
    {
        let removed = self
            .entries
            .remove_if(key, |_, entry| unwanted(entry.slot().value.as_ref()));
        if removed.is_some() {
            debug!(%key, "evicted");
        }
    }

    /// Drop `key` regardless of its state.
    pub fn forget(&self, key: &K) {
        self.evict_if(key, |_| true);
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self, key: &K) -> QueryStatus {
        match self.entries.get(key) {
            Some(entry) => entry.slot().status.clone(),
            None => QueryStatus::Idle,
        }
    }

    /// Last fetched value for `key`, fresh or not.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.get(key).and_then(|e| e.slot().value.clone())
    }

    pub fn is_fresh(&self, key: &K) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| e.fresh_value(self.max_age).is_some())
    }
}
