//! Removal of owned resources that no longer have an upstream bundle.

use cabundle_core::{BundleRecord, ClusterClient, ClusterError, OwnershipLabel, ResourceId};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Outcome of a successful sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapReport {
    /// Resources deleted
    pub deleted: Vec<String>,
    /// Stale resources that were already gone when deleted
    pub already_gone: usize,
}

/// Names of owned resources with no counterpart in `records`, sorted.
#[must_use]
pub fn stale_names(owned: &[String], records: &[BundleRecord]) -> Vec<String> {
    let wanted: BTreeSet<ResourceId> = records.iter().map(BundleRecord::resource_id).collect();
    let mut stale: Vec<String> = owned
        .iter()
        .filter(|name| !wanted.contains(&ResourceId::from_resource_name(name.as_str())))
        .cloned()
        .collect();
    stale.sort();
    stale.dedup();
    stale
}

/// Delete every owned resource in `namespace` not represented in `records`.
///
/// Every stale resource is attempted even if earlier deletes fail. A resource
/// that is already gone counts as deleted. If any delete failed, the last
/// failure is returned once the sweep is complete.
pub async fn reap<C>(
    cluster: &C,
    records: &[BundleRecord],
    namespace: &str,
    owner: &OwnershipLabel,
) -> SyncResult<ReapReport>
where
    C: ClusterClient + ?Sized,
{
    let owned: Vec<String> = cluster
        .list(namespace, owner)
        .await
        .map_err(|source| SyncError::ClusterList {
            namespace: namespace.to_string(),
            source,
        })?
        .into_iter()
        // Guard against backends that ignore the selector
        .filter(|r| owner.is_carried_by(&r.labels))
        .map(|r| r.name)
        .collect();

    let stale = stale_names(&owned, records);
    debug!(namespace, owned = owned.len(), stale = stale.len(), "computed stale resources");

    let mut report = ReapReport::default();
    let mut failed = 0usize;
    let mut last_failure: Option<(String, ClusterError)> = None;

    for name in &stale {
        match cluster.delete(namespace, name).await {
            Ok(()) => {
                info!(namespace, name = %name, "deleted stale bundle resource");
                report.deleted.push(name.clone());
            }
            Err(e) if e.is_not_found() => {
                debug!(namespace, name = %name, "stale resource already gone");
                report.already_gone += 1;
            }
            Err(e) => {
                warn!(namespace, name = %name, error = %e, "failed to delete stale resource");
                failed += 1;
                last_failure = Some((name.clone(), e));
            }
        }
    }

    match last_failure {
        Some((name, source)) => Err(SyncError::Reap {
            failed,
            attempted: stale.len(),
            name,
            source,
        }),
        None => Ok(report),
    }
}
