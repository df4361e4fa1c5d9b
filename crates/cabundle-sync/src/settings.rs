//! Validated synchronization settings.

use cabundle_core::OwnershipLabel;
use std::time::Duration;
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Name of the configuration resource read each cycle.
pub const DEFAULT_CONFIG_NAME: &str = "periodic-cabundle-enqueue";

/// Key in the configuration resource holding the listing location.
pub const BUNDLE_URL_KEY: &str = "bundle_url";

/// Default time between periodic triggers.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Default ceiling on one complete fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Default trigger queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;

/// Where a cycle finds the listing location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleUrlSource {
    /// Read [`BUNDLE_URL_KEY`] from this resource in the target namespace
    ConfigResource {
        /// Resource name
        name: String,
    },
    /// Use a fixed location and skip the configuration resource
    Static(Url),
}

/// Everything a cycle needs to know, validated once at construction.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    namespace: String,
    url_source: BundleUrlSource,
    ownership: OwnershipLabel,
    interval: Duration,
    fetch_timeout: Duration,
    queue_capacity: usize,
}

impl SyncSettings {
    /// Start building settings for the given target namespace
    #[must_use]
    pub fn builder(namespace: impl Into<String>) -> SyncSettingsBuilder {
        SyncSettingsBuilder::new(namespace)
    }

    /// Namespace holding the owned resources and the configuration resource
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Where the listing location comes from
    #[must_use]
    pub const fn url_source(&self) -> &BundleUrlSource {
        &self.url_source
    }

    /// Label marking owned resources
    #[must_use]
    pub const fn ownership(&self) -> &OwnershipLabel {
        &self.ownership
    }

    /// Time between periodic triggers
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Ceiling on one complete fetch
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Trigger queue capacity
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

/// Builder for [`SyncSettings`]
#[derive(Debug, Clone)]
pub struct SyncSettingsBuilder {
    namespace: String,
    config_name: String,
    static_url: Option<String>,
    ownership: OwnershipLabel,
    interval: Duration,
    fetch_timeout: Duration,
    queue_capacity: usize,
}

impl SyncSettingsBuilder {
    fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            config_name: DEFAULT_CONFIG_NAME.to_string(),
            static_url: None,
            ownership: OwnershipLabel::default(),
            interval: DEFAULT_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Read the listing location from this configuration resource
    #[must_use]
    pub fn config_name(mut self, name: impl Into<String>) -> Self {
        self.config_name = name.into();
        self
    }

    /// Use a fixed listing location instead of the configuration resource
    #[must_use]
    pub fn bundle_url(mut self, url: impl Into<String>) -> Self {
        self.static_url = Some(url.into());
        self
    }

    /// Set the ownership label
    #[must_use]
    pub fn ownership(mut self, label: OwnershipLabel) -> Self {
        self.ownership = label;
        self
    }

    /// Set the periodic trigger interval
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the fetch deadline
    #[must_use]
    pub const fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the trigger queue capacity
    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Validate and build the settings
    pub fn build(self) -> SyncResult<SyncSettings> {
        validate_dns_label("namespace", &self.namespace)?;

        if self.ownership.key.trim().is_empty() || self.ownership.value.trim().is_empty() {
            return Err(SyncError::Config(format!(
                "ownership label `{}` must have a key and a value",
                self.ownership
            )));
        }
        if self.interval.is_zero() {
            return Err(SyncError::Config("interval must be greater than zero".into()));
        }
        if self.fetch_timeout.is_zero() {
            return Err(SyncError::Config("fetch timeout must be greater than zero".into()));
        }
        if self.queue_capacity == 0 {
            return Err(SyncError::Config("queue capacity must be at least 1".into()));
        }

        let url_source = match self.static_url {
            Some(raw) => {
                let url = Url::parse(raw.trim())
                    .map_err(|e| SyncError::Config(format!("bundle URL `{raw}`: {e}")))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(SyncError::Config(format!(
                        "bundle URL `{raw}` must use http or https"
                    )));
                }
                BundleUrlSource::Static(url)
            }
            None => {
                if self.config_name.trim().is_empty() {
                    return Err(SyncError::Config("config resource name is empty".into()));
                }
                BundleUrlSource::ConfigResource {
                    name: self.config_name,
                }
            }
        };

        Ok(SyncSettings {
            namespace: self.namespace,
            url_source,
            ownership: self.ownership,
            interval: self.interval,
            fetch_timeout: self.fetch_timeout,
            queue_capacity: self.queue_capacity,
        })
    }
}

/// Check a value against the DNS-1123 label rules namespaces follow.
fn validate_dns_label(field: &str, value: &str) -> SyncResult<()> {
    let valid = !value.is_empty()
        && value.len() <= 63
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !value.starts_with('-')
        && !value.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(SyncError::Config(format!(
            "{field} `{value}` is not a valid DNS-1123 label"
        )))
    }
}
