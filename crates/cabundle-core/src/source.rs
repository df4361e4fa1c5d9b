//! Seam between the synchronization engine and wherever bundles are published.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::BundleRecord;

/// Something that can produce the authoritative bundle set.
#[async_trait]
pub trait BundleSource: Send + Sync {
    /// Fetch every bundle published under `base_url`.
    ///
    /// Either all discovered bundles are returned or the call fails; a
    /// partial set is never reported as success.
    async fn fetch(&self, base_url: &str) -> FetchResult<Vec<BundleRecord>>;
}
