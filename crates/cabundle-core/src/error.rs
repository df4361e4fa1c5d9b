use thiserror::Error;

/// Result type alias for bundle fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for cluster client operations
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Errors that can occur while fetching bundles from the published location
#[derive(Error, Debug)]
pub enum FetchError {
    /// The base location or an entry link is not a usable URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request never produced a response
    #[error("HTTP request to {url} failed: {reason}")]
    Transport {
        /// URL that was requested
        url: String,
        /// Underlying transport error
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("GET {url} returned status {status}")]
    Status {
        /// URL that was requested
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The directory listing could not be parsed
    #[error("unparseable listing at {url}: {reason}")]
    Listing {
        /// Listing URL
        url: String,
        /// Why parsing failed
        reason: String,
    },

    /// Downloading a single bundle failed, which aborts the whole fetch
    #[error("failed to download bundle {name}: {reason}")]
    Download {
        /// Logical name of the bundle
        name: String,
        /// Why the download failed
        reason: String,
    },

    /// Request or overall fetch deadline elapsed
    #[error("fetch timed out after {0} seconds")]
    Timeout(u64),
}

impl FetchError {
    /// Returns true if retrying on the next cycle could succeed without
    /// any configuration change
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Download { .. } | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidUrl(_) | Self::Listing { .. } => false,
        }
    }

    /// Returns the HTTP status code if the server answered with one
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors reported by a [`ClusterClient`](crate::ClusterClient) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The named resource does not exist
    #[error("resource {namespace}/{name} not found")]
    NotFound {
        /// Namespace of the resource
        namespace: String,
        /// Name of the resource
        name: String,
    },

    /// Create of an existing resource or an update with a stale version
    #[error("conflict on {namespace}/{name}: {message}")]
    Conflict {
        /// Namespace of the resource
        namespace: String,
        /// Name of the resource
        name: String,
        /// Message returned by the API
        message: String,
    },

    /// The API server rejected the request
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from the API
        message: String,
    },

    /// The client could not reach the API server
    #[error("cluster connection failed: {0}")]
    Connection(String),

    /// A resource could not be converted to or from the wire representation
    #[error("invalid resource: {0}")]
    Invalid(String),
}

impl ClusterError {
    /// Build a [`ClusterError::NotFound`] for the given key
    pub fn not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns true if the resource was missing
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the error is transient
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } | Self::Connection(_) => true,
            Self::Api { code, .. } => *code >= 500 || *code == 429,
            Self::NotFound { .. } | Self::Invalid(_) => false,
        }
    }
}
