//! Convergence of owned resources towards the fetched bundle set.
//!
//! Each bundle is looked up by its normalized name and then created,
//! updated in place or left alone. The first failed read or write stops the
//! pass; writes that already landed stay, and the next cycle picks up from
//! whatever state the cluster is in.

use cabundle_core::{
    BundleRecord, ClusterClient, ClusterError, KvResource, OwnershipLabel, ResourceId, TrustResource,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// What convergence does with one desired resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Resource is missing
    Create,
    /// Resource exists with a different payload or without the ownership label
    Update,
    /// Resource already matches
    Unchanged,
}

/// Outcome of a successful convergence pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvergeReport {
    /// Resources created
    pub created: Vec<ResourceId>,
    /// Resources updated in place
    pub updated: Vec<ResourceId>,
    /// Resources already in sync
    pub unchanged: usize,
}

impl ConvergeReport {
    /// Number of writes performed
    #[must_use]
    pub fn applied(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Compute the desired resources for a fetched set, in fetch order.
///
/// When two bundles normalize to the same identifier the later one wins and
/// keeps the position of the first; the clash is logged.
#[must_use]
pub fn plan(records: &[BundleRecord], namespace: &str, owner: &OwnershipLabel) -> Vec<TrustResource> {
    let mut index: HashMap<ResourceId, usize> = HashMap::new();
    let mut desired: Vec<(&str, TrustResource)> = Vec::with_capacity(records.len());

    for record in records {
        let resource = TrustResource::from_bundle(record, namespace, owner);
        if let Some(&slot) = index.get(&resource.id) {
            warn!(
                id = %resource.id,
                previous = desired[slot].0,
                current = %record.logical_name,
                "bundle names collide after normalization, keeping the later one"
            );
            desired[slot] = (&record.logical_name, resource);
        } else {
            index.insert(resource.id.clone(), desired.len());
            desired.push((&record.logical_name, resource));
        }
    }

    desired.into_iter().map(|(_, resource)| resource).collect()
}

/// Decide what to do for one desired resource given what the cluster holds.
#[must_use]
pub fn decide(desired: &TrustResource, existing: Option<&KvResource>) -> Action {
    match existing {
        None => Action::Create,
        Some(current) if desired.is_satisfied_by(current) => Action::Unchanged,
        Some(_) => Action::Update,
    }
}

/// Bring every fetched bundle's resource up to date.
///
/// Stops at the first failure and reports how many writes landed before it.
pub async fn converge<C>(
    cluster: &C,
    records: &[BundleRecord],
    namespace: &str,
    owner: &OwnershipLabel,
) -> SyncResult<ConvergeReport>
where
    C: ClusterClient + ?Sized,
{
    let mut report = ConvergeReport::default();

    for desired in plan(records, namespace, owner) {
        let name = desired.id.as_str();

        let existing = cluster
            .get(namespace, name)
            .await
            .map_err(|source| SyncError::ClusterRead {
                namespace: namespace.to_string(),
                name: name.to_string(),
                applied: report.applied(),
                source,
            })?;

        match (decide(&desired, existing.as_ref()), existing) {
            (Action::Unchanged, _) => {
                debug!(namespace, name, "resource already in sync");
                report.unchanged += 1;
            }
            (Action::Update, Some(current)) => {
                info!(namespace, name, "updating bundle resource");
                cluster
                    .update(&desired.apply_to(&current))
                    .await
                    .map_err(|source| write_error(namespace, name, &report, source))?;
                report.updated.push(desired.id);
            }
            _ => {
                info!(namespace, name, "creating bundle resource");
                cluster
                    .create(&desired.to_resource())
                    .await
                    .map_err(|source| write_error(namespace, name, &report, source))?;
                report.created.push(desired.id);
            }
        }
    }

    Ok(report)
}

fn write_error(
    namespace: &str,
    name: &str,
    report: &ConvergeReport,
    source: ClusterError,
) -> SyncError {
    SyncError::ClusterWrite {
        namespace: namespace.to_string(),
        name: name.to_string(),
        applied: report.applied(),
        source,
    }
}
