//! # cabundle-operator
//!
//! Keeps one ConfigMap per published CA bundle in a target namespace.
//!
//! ## Features
//!
//! - **Periodic sync**: `run` reconciles on a fixed interval until signalled
//! - **One-shot sync**: `once` runs a single cycle and prints the report
//! - **Listing preview**: `list` shows which ConfigMap each published file maps to
//! - **Output formats**: pretty summaries or JSON

pub mod cli;
pub mod config;
pub mod kube_cluster;
pub mod logging;
pub mod output;

pub use cli::run;
pub use kube_cluster::KubeCluster;
