//! Configuration management.

use anyhow::{Context as _, Result};
use cabundle_core::OwnershipLabel;
use cabundle_sync::settings::{DEFAULT_CONFIG_NAME, DEFAULT_FETCH_TIMEOUT, DEFAULT_INTERVAL};
use cabundle_sync::SyncSettings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::SyncArgs;
use crate::output::OutputFormat;

/// Operator configuration, read from TOML and overridden by flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Namespace holding the bundle resources
    pub namespace: Option<String>,

    /// Name of the configuration resource holding `bundle_url`
    pub config_name: String,

    /// Fixed listing location; bypasses the configuration resource
    pub bundle_url: Option<String>,

    /// Seconds between periodic syncs
    pub interval_secs: u64,

    /// Ceiling on one complete fetch, in seconds
    pub fetch_timeout_secs: u64,

    /// Per-request HTTP timeout, in seconds
    pub request_timeout_secs: u64,

    /// Downloads in flight at once
    pub concurrency: usize,

    /// Label marking resources this operator owns
    pub ownership: OwnershipLabel,

    /// Default output format for `once` and `list`
    pub output_format: Option<OutputFormat>,

    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            bundle_url: None,
            interval_secs: DEFAULT_INTERVAL.as_secs(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            request_timeout_secs: 60,
            concurrency: 8,
            ownership: OwnershipLabel::default(),
            output_format: None,
            json_logs: false,
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("io", "cabundle", "cabundle-operator")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        Ok(config)
    }

    /// Apply command-line and environment overrides.
    #[must_use]
    pub fn merge(mut self, args: &SyncArgs) -> Self {
        if let Some(namespace) = &args.namespace {
            self.namespace = Some(namespace.clone());
        }
        if let Some(name) = &args.config_name {
            self.config_name.clone_from(name);
        }
        if let Some(url) = &args.bundle_url {
            self.bundle_url = Some(url.clone());
        }
        if let Some(secs) = args.interval_secs {
            self.interval_secs = secs;
        }
        if let Some(secs) = args.fetch_timeout_secs {
            self.fetch_timeout_secs = secs;
        }
        self
    }

    /// Per-request HTTP timeout
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build validated synchronization settings.
    pub fn settings(&self) -> Result<SyncSettings> {
        let namespace = self.namespace.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "Target namespace required.\n\n\
                 Set it with one of:\n  \
                 1. --namespace <NAMESPACE>\n  \
                 2. CABUNDLE_NAMESPACE environment variable\n  \
                 3. `namespace` in the config file"
            )
        })?;

        let mut builder = SyncSettings::builder(namespace)
            .config_name(self.config_name.clone())
            .ownership(self.ownership.clone())
            .interval(Duration::from_secs(self.interval_secs))
            .fetch_timeout(Duration::from_secs(self.fetch_timeout_secs));
        if let Some(url) = &self.bundle_url {
            builder = builder.bundle_url(url.clone());
        }

        Ok(builder.build()?)
    }
}
