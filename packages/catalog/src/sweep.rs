//! Removal of uploaded media that no record references.
//!
//! A failed submission can leave objects behind (an image uploaded before the
//! video upload or the insert failed), and replacing or deleting a record
//! never removes its old media. The sweep reconciles the bucket against the
//! data store. Objects younger than the grace period are kept, since they may
//! belong to a submission that is still persisting.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::CatalogError;
use crate::record::{CatalogRecord, CustomerRecord, MachineRecord};
use crate::storage::{ObjectPath, ObjectStore};
use crate::store::{ListQuery, RecordStore, Table};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Objects found in the bucket.
    pub scanned: usize,
    /// Objects referenced by at least one record.
    pub referenced: usize,
    pub deleted: usize,
    /// Unreferenced objects left alone because they are inside the grace period.
    pub kept_recent: usize,
}

/// Delete every unreferenced object older than `grace`.
///
/// Individual delete failures are logged and skipped; the sweep only fails
/// if the bucket or the data store cannot be listed.
#[instrument(skip(store, objects))]
pub async fn sweep_orphans(
    store: &dyn RecordStore,
    objects: &dyn ObjectStore,
    grace: Duration,
) -> Result<SweepReport, CatalogError> {
    let referenced = referenced_paths(store, objects).await?;
    let listing = objects.list().await.map_err(CatalogError::Storage)?;
    let grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now().checked_sub_signed(grace);

    let mut report = SweepReport {
        scanned: listing.len(),
        ..Default::default()
    };
    for object in listing {
        if referenced.contains(&object.path) {
            report.referenced += 1;
            continue;
        }
        if cutoff.is_none_or(|cutoff| object.modified_at > cutoff) {
            report.kept_recent += 1;
            continue;
        }
        match objects.delete(&object.path).await {
            Ok(true) => report.deleted += 1,
            Ok(false) => {}
            Err(e) => warn!(path = %object.path, error = %e, "failed to delete orphaned object"),
        }
    }

    info!(
        scanned = report.scanned,
        deleted = report.deleted,
        kept_recent = report.kept_recent,
        "orphan sweep finished"
    );
    Ok(report)
}

async fn referenced_paths(
    store: &dyn RecordStore,
    objects: &dyn ObjectStore,
) -> Result<HashSet<ObjectPath>, CatalogError> {
    let machines = Table::<MachineRecord>::select(store, ListQuery::all())
        .await
        .map_err(CatalogError::Persistence)?;
    let customers = Table::<CustomerRecord>::select(store, ListQuery::all())
        .await
        .map_err(CatalogError::Persistence)?;

    let urls = machines
        .iter()
        .flat_map(|m| m.media_urls())
        .chain(customers.iter().flat_map(|c| c.media_urls()));
    Ok(urls.filter_map(|url| objects.path_from_url(url)).collect())
}
