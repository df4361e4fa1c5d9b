//! One reconciliation cycle and the loop that drives it.
//!
//! A cycle reads the listing location, fetches every published bundle,
//! converges the owned resources and then reaps the ones with no upstream
//! bundle. The cycle is level-triggered: it never looks at what the previous
//! cycle did, only at what the cluster holds now.

use cabundle_core::{BundleRecord, BundleSource, ClusterClient, FetchError, ResourceId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::converge::converge;
use crate::error::{SyncError, SyncResult};
use crate::reap::reap;
use crate::settings::{BundleUrlSource, SyncSettings, BUNDLE_URL_KEY, DEFAULT_CONFIG_NAME};
use crate::trigger::{shutdown_requested, TriggerEvent, TriggerReceiver};

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// Listing location used
    pub bundle_url: String,
    /// Bundles fetched
    pub bundles: usize,
    /// Resources created
    pub created: Vec<ResourceId>,
    /// Resources updated in place
    pub updated: Vec<ResourceId>,
    /// Resources already in sync
    pub unchanged: usize,
    /// Stale resources deleted
    pub deleted: Vec<String>,
    /// Stale resources that were already gone
    pub already_gone: usize,
}

impl CycleReport {
    /// Number of cluster writes made by the cycle
    #[must_use]
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

/// Why a cycle did nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The configuration resource does not exist
    ConfigNotFound { namespace: String, name: String },
    /// The configuration resource holds no bundle location
    MissingBundleUrl { namespace: String, name: String },
}

impl SkipReason {
    fn from_error(error: &SyncError) -> Option<Self> {
        match error {
            SyncError::ConfigNotFound { namespace, name } => Some(Self::ConfigNotFound {
                namespace: namespace.clone(),
                name: name.clone(),
            }),
            SyncError::ConfigMissingKey {
                namespace, name, ..
            } => Some(Self::MissingBundleUrl {
                namespace: namespace.clone(),
                name: name.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigNotFound { namespace, name } => {
                write!(f, "configuration resource {namespace}/{name} not found")
            }
            Self::MissingBundleUrl { namespace, name } => {
                write!(f, "{namespace}/{name} has no `{BUNDLE_URL_KEY}` value")
            }
        }
    }
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Cluster converged towards the fetched set
    Synced(CycleReport),
    /// Nothing to do this time
    Skipped {
        /// Why
        reason: SkipReason,
    },
}

/// Runs reconciliation cycles against one cluster and one bundle source.
pub struct Reconciler<C, S> {
    cluster: Arc<C>,
    source: Arc<S>,
    settings: SyncSettings,
}

impl<C, S> Reconciler<C, S>
where
    C: ClusterClient,
    S: BundleSource,
{
    /// Create a new reconciler
    pub const fn new(cluster: Arc<C>, source: Arc<S>, settings: SyncSettings) -> Self {
        Self {
            cluster,
            source,
            settings,
        }
    }

    /// Settings in use
    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// The event the periodic trigger should emit for these settings
    pub fn default_event(&self) -> TriggerEvent {
        let name = match self.settings.url_source() {
            BundleUrlSource::ConfigResource { name } => name.as_str(),
            BundleUrlSource::Static(_) => DEFAULT_CONFIG_NAME,
        };
        TriggerEvent::new(self.settings.namespace(), name)
    }

    /// Run one complete cycle.
    ///
    /// A missing configuration resource or bundle location skips the cycle.
    /// A fetch failure ends it before any write. A convergence failure ends it
    /// before the reap.
    pub async fn reconcile(&self, event: &TriggerEvent) -> SyncResult<CycleOutcome> {
        match self.cycle(event).await {
            Ok(report) => Ok(CycleOutcome::Synced(report)),
            Err(e) => match SkipReason::from_error(&e) {
                Some(reason) => Ok(CycleOutcome::Skipped { reason }),
                None => Err(e),
            },
        }
    }

    async fn cycle(&self, event: &TriggerEvent) -> SyncResult<CycleReport> {
        let started_at = Utc::now();
        let namespace = self.settings.namespace();
        let owner = self.settings.ownership();

        let bundle_url = self.bundle_url(event).await?;
        debug!(url = %bundle_url, "starting reconciliation cycle");

        let records = self.fetch(&bundle_url).await?;
        info!(url = %bundle_url, bundles = records.len(), "fetched bundle listing");

        let converged = converge(self.cluster.as_ref(), &records, namespace, owner).await?;
        let reaped = reap(self.cluster.as_ref(), &records, namespace, owner).await?;

        Ok(CycleReport {
            started_at,
            bundle_url,
            bundles: records.len(),
            created: converged.created,
            updated: converged.updated,
            unchanged: converged.unchanged,
            deleted: reaped.deleted,
            already_gone: reaped.already_gone,
        })
    }

    async fn bundle_url(&self, event: &TriggerEvent) -> SyncResult<String> {
        if let BundleUrlSource::Static(url) = self.settings.url_source() {
            return Ok(url.to_string());
        }

        let config = self
            .cluster
            .get(&event.namespace, &event.name)
            .await
            .map_err(|source| SyncError::ClusterRead {
                namespace: event.namespace.clone(),
                name: event.name.clone(),
                applied: 0,
                source,
            })?
            .ok_or_else(|| SyncError::ConfigNotFound {
                namespace: event.namespace.clone(),
                name: event.name.clone(),
            })?;

        match config.data_str(BUNDLE_URL_KEY).map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url.to_string()),
            _ => Err(SyncError::ConfigMissingKey {
                namespace: event.namespace.clone(),
                name: event.name.clone(),
                key: BUNDLE_URL_KEY,
            }),
        }
    }

    async fn fetch(&self, url: &str) -> SyncResult<Vec<BundleRecord>> {
        let deadline = self.settings.fetch_timeout();
        match time::timeout(deadline, self.source.fetch(url)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(FetchError::Timeout(deadline.as_secs()).into()),
        }
    }
}

/// Cycle counts from one controller run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Serializes cycles: takes one event at a time off the queue.
pub struct Controller<C, S> {
    reconciler: Reconciler<C, S>,
}

impl<C, S> Controller<C, S>
where
    C: ClusterClient,
    S: BundleSource,
{
    /// Create a controller around a reconciler
    pub const fn new(reconciler: Reconciler<C, S>) -> Self {
        Self { reconciler }
    }

    /// Process events until the queue closes or `shutdown` fires.
    ///
    /// A cycle still running when shutdown fires is abandoned.
    pub async fn run(
        &self,
        mut receiver: TriggerReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        info!(namespace = self.reconciler.settings().namespace(), "controller started");

        while !shutdown_requested(&shutdown) {
            let event = tokio::select! {
                biased;
                () = wait_for_shutdown(&mut shutdown) => break,
                event = receiver.recv() => match event {
                    Some(event) => event,
                    None => {
                        debug!("reconciliation queue closed");
                        break;
                    }
                },
            };

            tokio::select! {
                biased;
                () = wait_for_shutdown(&mut shutdown) => {
                    warn!("shutdown during reconciliation cycle, abandoning it");
                    break;
                }
                result = self.reconciler.reconcile(&event) => record(&mut summary, &event, result),
            }
        }

        info!(
            synced = summary.synced,
            skipped = summary.skipped,
            failed = summary.failed,
            "controller stopped"
        );
        summary
    }
}

fn record(summary: &mut RunSummary, event: &TriggerEvent, result: SyncResult<CycleOutcome>) {
    match result {
        Ok(CycleOutcome::Synced(report)) => {
            summary.synced += 1;
            info!(
                created = report.created.len(),
                updated = report.updated.len(),
                unchanged = report.unchanged,
                deleted = report.deleted.len(),
                "reconciliation cycle complete"
            );
        }
        Ok(CycleOutcome::Skipped { reason }) => {
            summary.skipped += 1;
            warn!(namespace = %event.namespace, name = %event.name, %reason, "skipping reconciliation cycle");
        }
        Err(e) => {
            summary.failed += 1;
            error!(
                namespace = %event.namespace,
                name = %event.name,
                error = %e,
                applied = e.applied(),
                retryable = e.is_retryable(),
                "reconciliation cycle failed"
            );
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !shutdown_requested(shutdown) {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
