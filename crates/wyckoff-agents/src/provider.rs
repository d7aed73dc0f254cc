use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};
use wyckoff_cache::CacheStore;
use wyckoff_models::DatasetKind;

use crate::error::AgentError;
use crate::retry::{RetryExecutor, RetryPolicy};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider returned an empty payload")]
    Empty,
}

/// Upstream source of raw market datasets, keyed by subject code and kind.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch(&self, code: &str, kind: DatasetKind) -> Result<String, ProviderError>;
}

/// Fetches datasets from an HTTP data service, one path segment per kind.
pub struct HttpDataProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDataProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("client build failed: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    async fn fetch(&self, code: &str, kind: DatasetKind) -> Result<String, ProviderError> {
        let url = format!("{}/{}/{}", self.base_url, kind.as_str(), code);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let payload = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if payload.trim().is_empty() {
            return Err(ProviderError::Empty);
        }
        Ok(payload)
    }
}

/// Read-through dataset access: cache first, then a retried upstream fetch,
/// then a best-effort write back to the cache.
///
/// Cache failures on either side degrade to upstream behavior; only an
/// exhausted fetch surfaces as an error.
pub struct CachedFetcher {
    cache: Arc<CacheStore>,
    provider: Arc<dyn DataProvider>,
    max_age: Duration,
    retry: RetryPolicy,
}

impl CachedFetcher {
    pub fn new(
        cache: Arc<CacheStore>,
        provider: Arc<dyn DataProvider>,
        max_age: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            provider,
            max_age,
            retry,
        }
    }

    pub async fn get_or_fetch(&self, code: &str, kind: DatasetKind) -> Result<String, AgentError> {
        let key = kind.cache_key(code);

        match self.cache.get(&key, self.max_age).await {
            Ok(Some(payload)) => {
                debug!(key, "Dataset cache hit");
                return Ok(payload);
            }
            Ok(None) => {}
            Err(e) => warn!(key, error = %e, "Cache read failed, fetching upstream"),
        }

        let executor = RetryExecutor::new(self.retry);
        let payload = executor
            .run(kind.as_str(), |_| self.provider.fetch(code, kind))
            .await
            .map_err(|e| {
                AgentError::DataUnavailable(format!(
                    "{} for {code}: {e}",
                    kind.as_str()
                ))
            })?;

        if let Err(e) = self.cache.put(&key, &payload).await {
            warn!(key, error = %e, "Cache write failed, continuing without it");
        }
        Ok(payload)
    }
}
