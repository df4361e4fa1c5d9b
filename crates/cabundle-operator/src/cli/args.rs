//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Mirror published CA bundles into labelled cluster ConfigMaps
///
/// Each `.pem` or `.crt` file linked from the bundle listing becomes one
/// ConfigMap in the target namespace. ConfigMaps whose bundle disappeared
/// are removed.
#[derive(Parser, Debug)]
#[command(name = "cabundle-operator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "CABUNDLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the periodic controller against the cluster
    Run(SyncArgs),

    /// Run a single reconciliation cycle and print the report
    Once(SyncArgs),

    /// Show the bundles a listing publishes, without touching the cluster
    List(ListArgs),
}

/// Options shared by the commands that talk to the cluster.
#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Namespace holding the bundle ConfigMaps
    #[arg(short, long, env = "CABUNDLE_NAMESPACE")]
    pub namespace: Option<String>,

    /// ConfigMap holding the `bundle_url` key
    #[arg(long, env = "CABUNDLE_CONFIG_NAME")]
    pub config_name: Option<String>,

    /// Fixed listing URL; bypasses the configuration ConfigMap
    #[arg(long, env = "CABUNDLE_BUNDLE_URL")]
    pub bundle_url: Option<String>,

    /// Seconds between periodic syncs
    #[arg(long, env = "CABUNDLE_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Ceiling on one complete fetch, in seconds
    #[arg(long, env = "CABUNDLE_FETCH_TIMEOUT_SECS")]
    pub fetch_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Listing URL (e.g., "https://pki.example.com/bundles/")
    pub url: String,
}
