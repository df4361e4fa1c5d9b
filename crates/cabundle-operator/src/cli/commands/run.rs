//! `cabundle-operator run` - Periodic controller.

use anyhow::{Context as _, Result};
use cabundle_sync::{queue, Controller, PeriodicTrigger, Reconciler};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use super::Context;
use crate::cli::args::SyncArgs;
use crate::kube_cluster::KubeCluster;

pub async fn execute(ctx: Context, args: SyncArgs) -> Result<()> {
    let settings = ctx.settings(&args)?;
    let cluster = KubeCluster::try_default()
        .await
        .context("connecting to the cluster")?;
    let reconciler = Reconciler::new(Arc::new(cluster), Arc::new(ctx.fetcher()?), settings);

    let event = reconciler.default_event();
    let interval = reconciler.settings().interval();
    let (tx, rx) = queue(reconciler.settings().queue_capacity());
    let (stop, shutdown) = watch::channel(false);

    info!(
        namespace = %event.namespace,
        config = %event.name,
        interval_secs = interval.as_secs(),
        "starting CA bundle operator"
    );

    // First sync runs right away instead of one interval in
    tx.send(event.clone())
        .await
        .context("queueing the initial sync")?;

    let trigger = tokio::spawn(PeriodicTrigger::new(interval, event, tx).run(shutdown.clone()));
    let signals = tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = stop.send(true);
    });

    let summary = Controller::new(reconciler).run(rx, shutdown).await;

    signals.abort();
    trigger.await.context("periodic trigger task failed")?;

    info!(
        synced = summary.synced,
        skipped = summary.skipped,
        failed = summary.failed,
        "operator stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
