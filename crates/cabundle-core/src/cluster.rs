//! Seam between the synchronization engine and the cluster API.

use async_trait::async_trait;

use crate::error::ClusterResult;
use crate::types::{KvResource, OwnershipLabel};

/// Primitive operations on namespaced key-value resources.
///
/// Implementations own retries, backoff and write serialization; the engine
/// calls each method at most once per resource per cycle.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Read one resource, `Ok(None)` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> ClusterResult<Option<KvResource>>;

    /// List resources in `namespace` carrying `label`
    async fn list(&self, namespace: &str, label: &OwnershipLabel)
        -> ClusterResult<Vec<KvResource>>;

    /// Create a resource that does not exist yet
    async fn create(&self, resource: &KvResource) -> ClusterResult<()>;

    /// Replace an existing resource
    async fn update(&self, resource: &KvResource) -> ClusterResult<()>;

    /// Delete a resource
    ///
    /// Returns [`ClusterError::NotFound`](crate::ClusterError::NotFound) if it
    /// was already gone.
    async fn delete(&self, namespace: &str, name: &str) -> ClusterResult<()>;
}
