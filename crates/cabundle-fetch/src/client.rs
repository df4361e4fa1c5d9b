//! HTTP bundle fetcher implementation.

use async_trait::async_trait;
use cabundle_core::{BundleRecord, BundleSource, FetchError, FetchResult};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::listing::{self, ListingEntry};

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of bundle downloads in flight at once
const DEFAULT_CONCURRENCY: usize = 8;

/// Fetches every bundle published under a base location
#[derive(Clone)]
pub struct BundleFetcher {
    inner: Arc<FetcherInner>,
}

struct FetcherInner {
    http: HttpClient,
    timeout: Duration,
    concurrency: usize,
}

impl BundleFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> FetchResult<Self> {
        BundleFetcherBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> BundleFetcherBuilder {
        BundleFetcherBuilder::new()
    }

    /// Fetch the listing at `base_url` and download every bundle in it.
    ///
    /// Any failure, including a single failed download, fails the whole call.
    pub async fn fetch_all(&self, base_url: &str) -> FetchResult<Vec<BundleRecord>> {
        let base = listing::base_url(base_url)?;
        let entries = self.list(&base).await?;

        info!(url = %base, bundles = entries.len(), "discovered bundles in listing");

        futures_util::stream::iter(entries)
            .map(|entry| self.download(entry))
            .buffered(self.inner.concurrency)
            .try_collect()
            .await
    }

    /// Fetch and parse the listing document
    pub async fn list(&self, base: &Url) -> FetchResult<Vec<ListingEntry>> {
        let body = self.get_bytes(base).await?;
        let document = String::from_utf8(body).map_err(|e| FetchError::Listing {
            url: base.to_string(),
            reason: e.to_string(),
        })?;

        listing::bundle_entries(base, &document)
    }

    async fn download(&self, entry: ListingEntry) -> FetchResult<BundleRecord> {
        let content = self
            .get_bytes(&entry.url)
            .await
            .map_err(|e| FetchError::Download {
                name: entry.name.clone(),
                reason: e.to_string(),
            })?;

        debug!(name = %entry.name, bytes = content.len(), "downloaded bundle");
        Ok(BundleRecord::new(entry.name, content))
    }

    /// Perform a GET request and return the body of a 2xx response
    async fn get_bytes(&self, url: &Url) -> FetchResult<Vec<u8>> {
        debug!(url = %url, "GET request");

        let response = self
            .inner
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, &e))?;
        Ok(body.to_vec())
    }

    fn transport_error(&self, url: &Url, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.inner.timeout.as_secs())
        } else {
            FetchError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl BundleSource for BundleFetcher {
    async fn fetch(&self, base_url: &str) -> FetchResult<Vec<BundleRecord>> {
        self.fetch_all(base_url).await
    }
}

/// Builder for configuring a [`BundleFetcher`]
pub struct BundleFetcherBuilder {
    timeout: Duration,
    user_agent: String,
    concurrency: usize,
}

impl Default for BundleFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleFetcherBuilder {
    /// Create a new builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("cabundle-operator/{}", env!("CARGO_PKG_VERSION")),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set how many downloads may run at once (minimum 1)
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Build the fetcher
    pub fn build(self) -> FetchResult<BundleFetcher> {
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(BundleFetcher {
            inner: Arc::new(FetcherInner {
                http,
                timeout: self.timeout,
                concurrency: self.concurrency,
            }),
        })
    }
}
