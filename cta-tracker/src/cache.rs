//! Caching layer for tracker responses.
//!
//! The trackers rate-limit by key, so identical requests within the TTL are
//! answered from the cache. Entries are the decoded JSON payload; classification
//! runs on every read so resolution always uses the current schedule.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use moka::future::Cache as MokaCache;
use serde_json::Value;
use tracing::debug;

use crate::classify::Endpoint;
use crate::client::CtaError;

/// Cached payload.
pub type Payload = Arc<Value>;

/// Configuration for the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_capacity: 1000,
        }
    }
}

/// Cache key: the operation plus its parameters in name order.
///
/// API keys are not part of it; a cache belongs to one client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    endpoint: Endpoint,
    params: Vec<(&'static str, String)>,
}

impl RequestKey {
    pub fn new(endpoint: Endpoint, params: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        let mut params: Vec<_> = params.into_iter().collect();
        params.sort();
        Self { endpoint, params }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint.path())?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

/// A store of payloads by request.
///
/// [`fetch`](Self::fetch) has a default built on `read` and `write`, which is
/// enough for a single caller. Backends shared between tasks should override it
/// so concurrent misses on one key run the producer once.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// A live entry; expired entries read as absent.
    async fn read(&self, key: &RequestKey) -> Option<Payload>;

    async fn write(&self, key: RequestKey, payload: Payload);

    /// The cached payload, or the producer's result stored under `key`.
    async fn fetch(
        &self,
        key: RequestKey,
        producer: BoxFuture<'_, Result<Payload, CtaError>>,
    ) -> Result<Payload, CtaError> {
        if let Some(hit) = self.read(&key).await {
            debug!(%key, "cache hit");
            return Ok(hit);
        }
        debug!(%key, "cache miss");
        let payload = producer.await?;
        self.write(key, payload.clone()).await;
        Ok(payload)
    }
}

/// Default cache, backed by moka.
///
/// Expiry is checked on read. Concurrent fetches of a missing key wait on a
/// single producer.
#[derive(Clone)]
pub struct MokaResponseCache {
    entries: MokaCache<RequestKey, Payload>,
}

impl MokaResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();
        Self { entries }
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

#[async_trait]
impl ResponseCache for MokaResponseCache {
    async fn read(&self, key: &RequestKey) -> Option<Payload> {
        self.entries.get(key).await
    }

    async fn write(&self, key: RequestKey, payload: Payload) {
        self.entries.insert(key, payload).await;
    }

    async fn fetch(
        &self,
        key: RequestKey,
        producer: BoxFuture<'_, Result<Payload, CtaError>>,
    ) -> Result<Payload, CtaError> {
        let label = key.to_string();
        let entry = self
            .entries
            .entry(key)
            .or_try_insert_with(producer)
            .await
            .map_err(CtaError::from_shared)?;
        if entry.is_fresh() {
            debug!(key = %label, "cache miss");
        } else {
            debug!(key = %label, "cache hit");
        }
        Ok(entry.into_value())
    }
}
