//! `cabundle-operator once` - Run a single reconciliation cycle.

use anyhow::{Context as _, Result};
use cabundle_sync::Reconciler;
use std::sync::Arc;

use super::Context;
use crate::cli::args::SyncArgs;
use crate::kube_cluster::KubeCluster;
use crate::output::render_outcome;

pub async fn execute(ctx: Context, args: SyncArgs) -> Result<()> {
    let settings = ctx.settings(&args)?;
    let cluster = KubeCluster::try_default()
        .await
        .context("connecting to the cluster")?;
    let reconciler = Reconciler::new(Arc::new(cluster), Arc::new(ctx.fetcher()?), settings);

    let outcome = reconciler.reconcile(&reconciler.default_event()).await?;
    println!("{}", render_outcome(&outcome, ctx.output_format, ctx.color())?);

    Ok(())
}
