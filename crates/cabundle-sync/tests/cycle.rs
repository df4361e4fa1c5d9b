//! End-to-end reconciliation cycles against the in-memory cluster.

use async_trait::async_trait;
use cabundle_core::{
    BundleRecord, BundleSource, FetchError, FetchResult, KvResource, OwnershipLabel, CA_KEY,
};
use cabundle_sync::memory::Operation;
use cabundle_sync::settings::{BUNDLE_URL_KEY, DEFAULT_CONFIG_NAME};
use cabundle_sync::{
    queue, Controller, CycleOutcome, MemoryCluster, Reconciler, RunSummary, SkipReason,
    SyncError, SyncSettings, TriggerEvent,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};

const NS: &str = "cert-system";
const LISTING: &str = "https://pki.example.com/bundles/";

/// Bundle source returning whatever it was last given.
struct StubSource {
    records: Mutex<FetchResult<Vec<BundleRecord>>>,
    urls: Mutex<Vec<String>>,
}

impl StubSource {
    fn serving(records: &[(&str, &str)]) -> Arc<Self> {
        let source = Arc::new(Self {
            records: Mutex::new(Ok(Vec::new())),
            urls: Mutex::new(Vec::new()),
        });
        source.serve(records);
        source
    }

    fn serve(&self, records: &[(&str, &str)]) {
        *self.records.lock().unwrap() = Ok(records
            .iter()
            .map(|(name, body)| BundleRecord::new(*name, body.as_bytes().to_vec()))
            .collect());
    }

    fn fail(&self, error: FetchError) {
        *self.records.lock().unwrap() = Err(error);
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BundleSource for StubSource {
    async fn fetch(&self, base_url: &str) -> FetchResult<Vec<BundleRecord>> {
        self.urls.lock().unwrap().push(base_url.to_string());
        match &*self.records.lock().unwrap() {
            Ok(records) => Ok(records.clone()),
            Err(e) => Err(clone_error(e)),
        }
    }
}

fn clone_error(error: &FetchError) -> FetchError {
    match error {
        FetchError::Status { url, status } => FetchError::Status {
            url: url.clone(),
            status: *status,
        },
        other => FetchError::InvalidUrl(other.to_string()),
    }
}

fn owned(name: &str, body: &str) -> KvResource {
    KvResource::new(NS, name)
        .with_label("app", "cabundle-operator")
        .with_data(CA_KEY, body)
}

fn config() -> KvResource {
    KvResource::new(NS, DEFAULT_CONFIG_NAME).with_data(BUNDLE_URL_KEY, LISTING)
}

fn reconciler(
    cluster: &Arc<MemoryCluster>,
    source: &Arc<StubSource>,
) -> Reconciler<MemoryCluster, StubSource> {
    let settings = SyncSettings::builder(NS).build().unwrap();
    Reconciler::new(cluster.clone(), source.clone(), settings)
}

fn event() -> TriggerEvent {
    TriggerEvent::new(NS, DEFAULT_CONFIG_NAME)
}

fn owned_names(cluster: &MemoryCluster) -> BTreeSet<String> {
    cluster
        .names(NS)
        .into_iter()
        .filter(|name| {
            cluster
                .resource(NS, name)
                .is_some_and(|r| OwnershipLabel::default().is_carried_by(&r.labels))
        })
        .collect()
}

#[tokio::test]
async fn test_cycle_creates_and_reaps() {
    let cluster = Arc::new(MemoryCluster::with_resources([
        config(),
        owned("bundle-c", "CCC"),
    ]));
    let source = StubSource::serving(&[("bundle-a.pem", "AAA"), ("bundle-b.crt", "BBB")]);

    let outcome = reconciler(&cluster, &source).reconcile(&event()).await.unwrap();

    let CycleOutcome::Synced(report) = outcome else {
        panic!("cycle was skipped");
    };
    assert_eq!(report.bundles, 2);
    assert_eq!(report.created.len(), 2);
    assert_eq!(report.deleted, vec!["bundle-c"]);
    assert_eq!(report.bundle_url, LISTING);
    assert_eq!(source.urls(), vec![LISTING]);

    assert_eq!(
        cluster.resource(NS, "bundle-a").unwrap().data_str(CA_KEY),
        Some("AAA")
    );
    assert_eq!(
        cluster.resource(NS, "bundle-b").unwrap().data_str(CA_KEY),
        Some("BBB")
    );
    assert!(cluster.resource(NS, "bundle-c").is_none());
    // The configuration resource is not owned and survives the reap
    assert!(cluster.resource(NS, DEFAULT_CONFIG_NAME).is_some());

    // Writes for the listing land before the sweep lists owned resources
    let journal = cluster.journal();
    let list_at = journal
        .iter()
        .position(|call| call.operation == Operation::List)
        .unwrap();
    assert!(journal[list_at..]
        .iter()
        .all(|call| call.operation != Operation::Create));
    assert_eq!(journal.last().unwrap().operation, Operation::Delete);
    assert_eq!(journal.last().unwrap().name, "bundle-c");
}

#[tokio::test]
async fn test_second_cycle_is_a_no_op() {
    let cluster = Arc::new(MemoryCluster::with_resources([config()]));
    let source = StubSource::serving(&[("bundle-a.pem", "AAA"), ("bundle-b.crt", "BBB")]);
    let reconciler = reconciler(&cluster, &source);

    reconciler.reconcile(&event()).await.unwrap();
    let writes = cluster.write_count();

    let CycleOutcome::Synced(report) = reconciler.reconcile(&event()).await.unwrap() else {
        panic!("cycle was skipped");
    };
    assert_eq!(report.writes(), 0);
    assert_eq!(report.unchanged, 2);
    assert_eq!(cluster.write_count(), writes);
}

#[tokio::test]
async fn test_changed_bundle_is_updated_in_place() {
    let cluster = Arc::new(MemoryCluster::with_resources([
        config(),
        owned("bundle-a", "OLD"),
    ]));
    let source = StubSource::serving(&[("bundle-a.pem", "NEW")]);

    let CycleOutcome::Synced(report) = reconciler(&cluster, &source)
        .reconcile(&event())
        .await
        .unwrap()
    else {
        panic!("cycle was skipped");
    };

    assert_eq!(report.updated.len(), 1);
    assert!(report.created.is_empty());
    assert!(report.deleted.is_empty());
    assert_eq!(
        cluster.resource(NS, "bundle-a").unwrap().data_str(CA_KEY),
        Some("NEW")
    );
    assert_eq!(cluster.count_of(Operation::Delete), 0);
}

#[tokio::test]
async fn test_fetch_failure_leaves_cluster_untouched() {
    let cluster = Arc::new(MemoryCluster::with_resources([
        config(),
        owned("bundle-a", "AAA"),
    ]));
    let source = StubSource::serving(&[]);
    source.fail(FetchError::Status {
        url: LISTING.into(),
        status: 503,
    });

    let err = reconciler(&cluster, &source)
        .reconcile(&event())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Fetch(FetchError::Status { status: 503, .. })));
    assert!(err.is_retryable());
    assert_eq!(cluster.write_count(), 0);
    assert_eq!(cluster.count_of(Operation::List), 0);
    assert!(cluster.resource(NS, "bundle-a").is_some());
}

#[tokio::test]
async fn test_converge_failure_skips_reap() {
    let cluster = Arc::new(MemoryCluster::with_resources([
        config(),
        owned("stale", "S"),
    ]));
    cluster.fail_on(Operation::Create, "b2");
    let source = StubSource::serving(&[("b1.pem", "1"), ("b2.pem", "2"), ("b3.pem", "3")]);

    let err = reconciler(&cluster, &source)
        .reconcile(&event())
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::ClusterWrite { applied: 1, .. }));
    assert!(cluster.resource(NS, "b1").is_some());
    assert!(cluster.resource(NS, "b3").is_none());
    assert!(cluster.resource(NS, "stale").is_some());
    assert_eq!(cluster.count_of(Operation::List), 0);

    // The next cycle finishes the job from where the cluster is now
    cluster.clear_failures();
    reconciler(&cluster, &source).reconcile(&event()).await.unwrap();
    assert_eq!(
        owned_names(&cluster),
        ["b1", "b2", "b3"].into_iter().map(String::from).collect()
    );
}

#[tokio::test]
async fn test_missing_config_is_skipped() {
    let cluster = Arc::new(MemoryCluster::with_resources([owned("bundle-a", "AAA")]));
    let source = StubSource::serving(&[]);

    let outcome = reconciler(&cluster, &source).reconcile(&event()).await.unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::ConfigNotFound { .. }
        }
    ));
    assert!(source.urls().is_empty());
    assert_eq!(cluster.write_count(), 0);
}

#[tokio::test]
async fn test_missing_key_is_skipped() {
    let cluster = Arc::new(MemoryCluster::with_resources([
        KvResource::new(NS, DEFAULT_CONFIG_NAME).with_data("other", "x"),
    ]));
    let source = StubSource::serving(&[]);

    let outcome = reconciler(&cluster, &source).reconcile(&event()).await.unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::Skipped {
            reason: SkipReason::MissingBundleUrl { .. }
        }
    ));
    assert!(source.urls().is_empty());
}

#[tokio::test]
async fn test_static_url_ignores_config_resource() {
    let cluster = Arc::new(MemoryCluster::new());
    let source = StubSource::serving(&[("root.pem", "R")]);
    let settings = SyncSettings::builder(NS)
        .bundle_url("https://mirror.example.net/ca/")
        .build()
        .unwrap();

    let outcome = Reconciler::new(cluster.clone(), source.clone(), settings)
        .reconcile(&event())
        .await
        .unwrap();

    assert!(matches!(outcome, CycleOutcome::Synced(_)));
    assert_eq!(source.urls(), vec!["https://mirror.example.net/ca/"]);
    assert!(!cluster.was_attempted(Operation::Get, DEFAULT_CONFIG_NAME));
}

#[tokio::test]
async fn test_empty_listing_reaps_everything_owned() {
    let cluster = Arc::new(MemoryCluster::with_resources([
        config(),
        owned("a", "A"),
        owned("b", "B"),
        KvResource::new(NS, "foreign").with_data(CA_KEY, "F"),
    ]));
    let source = StubSource::serving(&[]);

    reconciler(&cluster, &source).reconcile(&event()).await.unwrap();

    assert!(owned_names(&cluster).is_empty());
    assert!(cluster.resource(NS, "foreign").is_some());
}

#[tokio::test]
async fn test_owned_set_matches_listing_after_cycle() {
    let cluster = Arc::new(MemoryCluster::with_resources([
        config(),
        owned("keep", "K"),
        owned("drop-me", "D"),
        owned("also-gone", "G"),
    ]));
    let source = StubSource::serving(&[
        ("keep.pem", "K2"),
        ("Fresh Root.crt", "F"),
        ("Intermediate CA 2.pem", "I"),
    ]);

    reconciler(&cluster, &source).reconcile(&event()).await.unwrap();

    let expected: BTreeSet<String> = ["keep", "fresh-root", "intermediate-ca-2"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(owned_names(&cluster), expected);
}

#[tokio::test]
async fn test_controller_serializes_cycles_until_queue_closes() {
    let cluster = Arc::new(MemoryCluster::with_resources([config()]));
    let source = StubSource::serving(&[("bundle-a.pem", "AAA")]);
    let controller = Controller::new(reconciler(&cluster, &source));

    let (tx, rx) = queue(4);
    let (_stop, shutdown) = watch::channel(false);
    tx.send(event()).await.unwrap();
    tx.send(TriggerEvent::new(NS, "missing")).await.unwrap();
    tx.send(event()).await.unwrap();
    drop(tx);

    let summary = controller.run(rx, shutdown).await;

    assert_eq!(summary.synced, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(cluster.count_of(Operation::Create), 1);
}

#[tokio::test]
async fn test_controller_survives_failed_cycles() {
    let cluster = Arc::new(MemoryCluster::with_resources([config()]));
    let source = StubSource::serving(&[]);
    source.fail(FetchError::Status {
        url: LISTING.into(),
        status: 500,
    });
    let controller = Controller::new(reconciler(&cluster, &source));

    let (tx, rx) = queue(2);
    let (_stop, shutdown) = watch::channel(false);
    tx.send(event()).await.unwrap();
    tx.send(event()).await.unwrap();
    drop(tx);

    let summary = controller.run(rx, shutdown).await;
    assert_eq!(summary.failed, 2);
    assert_eq!(source.urls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_controller_stops_on_shutdown() {
    let cluster = Arc::new(MemoryCluster::with_resources([config()]));
    let source = StubSource::serving(&[]);
    let controller = Controller::new(reconciler(&cluster, &source));

    let (tx, rx) = queue(1);
    let (stop, shutdown) = watch::channel(false);

    let handle = tokio::spawn(async move { controller.run(rx, shutdown).await });
    tokio::time::sleep(Duration::from_secs(5)).await;
    stop.send(true).unwrap();

    let summary = handle.await.unwrap();
    assert_eq!(summary, RunSummary::default());
    // Receiver released even though the sending half is still alive
    assert!(tx.is_closed());
}

/// Bundle source whose fetch never completes.
#[derive(Default)]
struct StalledSource {
    started: Notify,
}

#[async_trait]
impl BundleSource for StalledSource {
    async fn fetch(&self, _base_url: &str) -> FetchResult<Vec<BundleRecord>> {
        self.started.notify_one();
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_shutdown_abandons_running_cycle() {
    let cluster = Arc::new(MemoryCluster::with_resources([config()]));
    let source = Arc::new(StalledSource::default());
    let settings = SyncSettings::builder(NS).build().unwrap();
    let controller = Controller::new(Reconciler::new(cluster.clone(), source.clone(), settings));

    let (tx, rx) = queue(1);
    let (stop, shutdown) = watch::channel(false);
    tx.send(event()).await.unwrap();

    let handle = tokio::spawn(async move { controller.run(rx, shutdown).await });
    source.started.notified().await;
    stop.send(true).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("controller did not stop")
        .unwrap();
    assert_eq!(summary, RunSummary::default());
    assert_eq!(cluster.write_count(), 0);
    assert_eq!(cluster.count_of(Operation::List), 0);
}
