use cabundle_core::{ClusterError, FetchError};
use thiserror::Error;

/// Result type alias for synchronization operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Errors that end or skip a synchronization cycle
#[derive(Error, Debug)]
pub enum SyncError {
    /// Fetching the published bundles failed; nothing was written
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The configuration resource does not exist
    #[error("configuration resource {namespace}/{name} not found")]
    ConfigNotFound {
        /// Namespace of the configuration resource
        namespace: String,
        /// Name of the configuration resource
        name: String,
    },

    /// The configuration resource has no usable bundle location
    #[error("configuration resource {namespace}/{name} has no `{key}` value")]
    ConfigMissingKey {
        /// Namespace of the configuration resource
        namespace: String,
        /// Name of the configuration resource
        name: String,
        /// Missing key
        key: &'static str,
    },

    /// Reading a single resource failed
    #[error("failed to read {namespace}/{name} ({applied} writes applied before): {source}")]
    ClusterRead {
        /// Namespace of the resource
        namespace: String,
        /// Name of the resource
        name: String,
        /// Writes already applied in this cycle
        applied: usize,
        #[source]
        source: ClusterError,
    },

    /// Creating or updating a resource failed
    #[error("failed to write {namespace}/{name} ({applied} writes applied before): {source}")]
    ClusterWrite {
        /// Namespace of the resource
        namespace: String,
        /// Name of the resource
        name: String,
        /// Writes already applied in this cycle
        applied: usize,
        #[source]
        source: ClusterError,
    },

    /// Listing owned resources failed
    #[error("failed to list resources in {namespace}: {source}")]
    ClusterList {
        /// Namespace that was listed
        namespace: String,
        #[source]
        source: ClusterError,
    },

    /// One or more stale resources could not be deleted
    #[error("failed to delete {failed} of {attempted} stale resources; last failure on {name}: {source}")]
    Reap {
        /// Deletions that failed
        failed: usize,
        /// Deletions attempted
        attempted: usize,
        /// Resource of the last failure
        name: String,
        #[source]
        source: ClusterError,
    },

    /// Settings failed validation
    #[error("invalid settings: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns true if the cycle should be skipped rather than reported as failed
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        matches!(self, Self::ConfigNotFound { .. } | Self::ConfigMissingKey { .. })
    }

    /// Returns true if the next trigger is likely to succeed unchanged
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            Self::ClusterRead { source, .. }
            | Self::ClusterWrite { source, .. }
            | Self::ClusterList { source, .. }
            | Self::Reap { source, .. } => source.is_retryable(),
            Self::ConfigNotFound { .. } | Self::ConfigMissingKey { .. } | Self::Config(_) => false,
        }
    }

    /// Number of writes that landed before the failure
    #[must_use]
    pub const fn applied(&self) -> usize {
        match self {
            Self::ClusterRead { applied, .. } | Self::ClusterWrite { applied, .. } => *applied,
            _ => 0,
        }
    }
}
