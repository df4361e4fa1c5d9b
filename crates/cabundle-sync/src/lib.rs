//! Reconciliation engine for CA bundle resources.
//!
//! The engine keeps one labelled key-value resource per published bundle in a
//! target namespace:
//!
//! - [`converge`](converge::converge) creates or updates a resource for every fetched bundle
//! - [`reap`](reap::reap) deletes owned resources whose bundle disappeared
//! - [`Reconciler`] runs fetch, converge and reap as one cycle
//! - [`Controller`] drains the trigger queue one cycle at a time
//! - [`PeriodicTrigger`] feeds the queue on a fixed interval
//!
//! # Example
//!
//! ```rust,no_run
//! use cabundle_sync::{queue, Controller, MemoryCluster, PeriodicTrigger, Reconciler, SyncSettings};
//! # use cabundle_core::{BundleRecord, BundleSource, FetchResult};
//! # struct Listing;
//! # #[async_trait::async_trait]
//! # impl BundleSource for Listing {
//! #     async fn fetch(&self, _: &str) -> FetchResult<Vec<BundleRecord>> { Ok(vec![]) }
//! # }
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = SyncSettings::builder("cert-system").build()?;
//! let reconciler = Reconciler::new(Arc::new(MemoryCluster::new()), Arc::new(Listing), settings);
//!
//! let (tx, rx) = queue(reconciler.settings().queue_capacity());
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! let trigger = PeriodicTrigger::new(reconciler.settings().interval(), reconciler.default_event(), tx);
//! tokio::spawn(trigger.run(shutdown.clone()));
//!
//! Controller::new(reconciler).run(rx, shutdown).await;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/cabundle-sync/0.3.0")]

pub mod converge;
mod error;
pub mod memory;
pub mod reap;
mod reconciler;
pub mod settings;
pub mod trigger;

pub use converge::{ConvergeReport, converge};
pub use error::{SyncError, SyncResult};
pub use memory::MemoryCluster;
pub use reap::{ReapReport, reap};
pub use reconciler::{Controller, CycleOutcome, CycleReport, Reconciler, RunSummary, SkipReason};
pub use settings::{BundleUrlSource, SyncSettings, SyncSettingsBuilder};
pub use trigger::{queue, Emit, PeriodicTrigger, TriggerEvent, TriggerReceiver, TriggerSender, TriggerState};
