//! Signing key set cache.
//!
//! Key sets are cached per URL for the configured TTL. Callers that miss a
//! `kid` call [`KeySetCache::refresh`] once before giving up, so a rotated
//! key is picked up without re-fetching on every unknown `kid`.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use moka::future::Cache;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// Cache of published signing key sets.
#[derive(Clone)]
pub struct KeySetCache {
    /// HTTP client with retry middleware.
    http: ClientWithMiddleware,

    /// Fetched key sets by URL.
    cache: Cache<String, Arc<JwkSet>>,

    /// Request timeout, reported on timeouts.
    request_timeout: Duration,
}

impl KeySetCache {
    /// Create a new cache.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(200), Duration::from_secs(2))
            .build_with_max_retries(config.key_fetch_retries);

        let http = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let cache = Cache::builder()
            .max_capacity(config.key_cache_max_size)
            .time_to_live(config.key_cache_ttl)
            .build();

        Ok(Self { http, cache, request_timeout: config.request_timeout })
    }

    /// Return the cached key set for `url`, fetching it if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns error if the key set cannot be fetched or parsed.
    pub async fn get(&self, url: &str) -> ClientResult<Arc<JwkSet>> {
        if let Some(keys) = self.cache.get(url).await {
            return Ok(keys);
        }
        self.fetch_and_store(url).await
    }

    /// Drop the cached key set for `url` and fetch it again.
    ///
    /// # Errors
    ///
    /// Returns error if the key set cannot be fetched or parsed.
    pub async fn refresh(&self, url: &str) -> ClientResult<Arc<JwkSet>> {
        self.cache.invalidate(url).await;
        self.fetch_and_store(url).await
    }

    async fn fetch_and_store(&self, url: &str) -> ClientResult<Arc<JwkSet>> {
        tracing::debug!(url, "Fetching signing key set");

        let response = self.http.get(url).send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e.into()))?;
        if !status.is_success() {
            return Err(if status.is_server_error() {
                ClientError::server(status.as_u16(), text)
            } else {
                ClientError::UnexpectedStatus { status: status.as_u16(), message: text }
            });
        }

        let keys = Arc::new(serde_json::from_str::<JwkSet>(&text)?);
        tracing::debug!(url, keys = keys.keys.len(), "Cached signing key set");
        self.cache.insert(url.to_string(), Arc::clone(&keys)).await;

        Ok(keys)
    }

    fn transport_error(&self, err: reqwest_middleware::Error) -> ClientError {
        match err {
            reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => {
                ClientError::Timeout(self.request_timeout)
            }
            reqwest_middleware::Error::Reqwest(e) => ClientError::Http(e),
            other => ClientError::Middleware(other),
        }
    }
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache").field("entries", &self.cache.entry_count()).finish()
    }
}
