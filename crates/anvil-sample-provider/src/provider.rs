//! The Sample provider port and its three adapters.

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::cache::{BoundedLruCache, TtlCache};
use crate::dto::SampleDto;
use crate::error::{SampleProviderError, SampleProviderResult};
use anvil_storage::traits::SampleRefStore;
use anvil_types::{SampleId, TenantId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Fetches sample content by id, with a batched form for export and
/// agreement recomputation workloads. The core never calls this port
/// synchronously inside a state-changing transaction.
#[async_trait]
pub trait SampleProvider: Send + Sync {
 async fn fetch(&self, tenant: &TenantId, id: &SampleId) -> SampleProviderResult<SampleDto>;

 async fn fetch_batch(
 &self,
 tenant: &TenantId,
 ids: &[SampleId],
) -> SampleProviderResult<Vec<SampleDto>> {
 let mut out = Vec::with_capacity(ids.len());
 for id in ids {
 out.push(self.fetch(tenant, id).await?);
 }
 Ok(out)
 }
}

/// Adapter 1: queries the same durable store Anvil itself uses. Content
/// is whatever the sample reference's metadata carries; this adapter
/// never reaches out over the network.
pub struct DirectProvider<S: SampleRefStore> {
 store: Arc<S>,
}

impl<S: SampleRefStore> DirectProvider<S> {
 pub fn new(store: Arc<S>) -> Self {
 Self { store }
 }
}

#[async_trait]
impl<S: SampleRefStore> SampleProvider for DirectProvider<S> {
 async fn fetch(&self, tenant: &TenantId, id: &SampleId) -> SampleProviderResult<SampleDto> {
 let sample_ref = self
.store
.get_sample_ref(tenant, id)
.await?
.ok_or_else(|| SampleProviderError::NotFound(id.to_string()))?;
 Ok(SampleDto {
 id: sample_ref.id,
 content: sample_ref.metadata.clone(),
 version: sample_ref.version_tag,
 metadata: sample_ref.metadata,
 asset_urls: Vec::new(),
 })
 }
}

/// A remote sample content endpoint. Implementations issue the actual
/// network call; [`RemoteProvider`] wraps one with a deadline, a circuit
/// breaker, and an LRU fallback cache.
#[async_trait]
pub trait RemoteSampleSource: Send + Sync {
 async fn fetch_remote(
 &self,
 tenant: &TenantId,
 id: &SampleId,
) -> Result<SampleDto, reqwest::Error>;
}

/// HTTP-backed [`RemoteSampleSource`], used outside tests.
pub struct HttpSampleSource {
 client: reqwest::Client,
 base_url: String,
}

impl HttpSampleSource {
 pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
 let client = reqwest::Client::builder()
.timeout(timeout)
.build()
.expect("reqwest client configuration is always valid here");
 Self {
 client,
 base_url: base_url.into(),
 }
 }
}

#[async_trait]
impl RemoteSampleSource for HttpSampleSource {
 async fn fetch_remote(
 &self,
 tenant: &TenantId,
 id: &SampleId,
) -> Result<SampleDto, reqwest::Error> {
 let url = format!("{}/tenants/{}/samples/{}", self.base_url, tenant, id);
 self.client.get(url).send().await?.json().await
 }
}

/// Adapter 2: a network call guarded by a circuit breaker. After
/// `failure_threshold` failures the breaker opens for `reset_timeout`;
/// while open, reads fall back to a bounded LRU cache; if the cache also
/// misses, the caller sees `provider_unavailable`.
pub struct RemoteProvider<T: RemoteSampleSource> {
 source: T,
 breaker: CircuitBreaker,
 fallback_cache: BoundedLruCache<(TenantId, SampleId), SampleDto>,
 deadline: Duration,
}

impl<T: RemoteSampleSource> RemoteProvider<T> {
 pub fn new(source: T, breaker_config: CircuitBreakerConfig, cache_capacity: usize) -> Self {
 Self {
 source,
 breaker: CircuitBreaker::new("sample-provider-remote", breaker_config),
 fallback_cache: BoundedLruCache::new(cache_capacity),
 deadline: Duration::from_secs(5),
 }
 }

 pub fn with_deadline(mut self, deadline: Duration) -> Self {
 self.deadline = deadline;
 self
 }

 pub fn breaker_state(&self) -> CircuitState {
 self.breaker.state()
 }
}

#[async_trait]
impl<T: RemoteSampleSource> SampleProvider for RemoteProvider<T> {
 async fn fetch(&self, tenant: &TenantId, id: &SampleId) -> SampleProviderResult<SampleDto> {
 let cache_key = (*tenant, id.clone());

 if !self.breaker.allow_request() {
 return self.fallback_cache.get(&cache_key).ok_or_else(|| {
 warn!(%tenant, %id, "remote sample provider breaker open, no cached fallback");
 SampleProviderError::ProviderUnavailable
 });
 }

 match tokio::time::timeout(self.deadline, self.source.fetch_remote(tenant, id)).await {
 Ok(Ok(dto)) => {
 self.breaker.record_success();
 self.fallback_cache.put(cache_key, dto.clone());
 Ok(dto)
 }
 Ok(Err(_)) => {
 self.breaker.record_failure();
 self.fallback_cache.get(&cache_key).ok_or(
 SampleProviderError::ProviderUnavailable,
)
 }
 Err(_) => {
 self.breaker.record_failure();
 self.fallback_cache
.get(&cache_key)
.ok_or(SampleProviderError::Timeout)
 }
 }
 }
}

/// Adapter 3: wraps either of the above with a TTL cache. Invalidated on
/// external update notification via [`CachedProxyProvider::invalidate`].
pub struct CachedProxyProvider<P: SampleProvider> {
 inner: P,
 cache: TtlCache<(TenantId, SampleId), SampleDto>,
}

impl<P: SampleProvider> CachedProxyProvider<P> {
 pub fn new(inner: P, ttl: Duration) -> Self {
 Self {
 inner,
 cache: TtlCache::new(ttl),
 }
 }

 pub fn invalidate(&self, tenant: &TenantId, id: &SampleId) {
 self.cache.invalidate(&(*tenant, id.clone()));
 }
}

#[async_trait]
impl<P: SampleProvider> SampleProvider for CachedProxyProvider<P> {
 async fn fetch(&self, tenant: &TenantId, id: &SampleId) -> SampleProviderResult<SampleDto> {
 let key = (*tenant, id.clone());
 if let Some(cached) = self.cache.get(&key) {
 return Ok(cached);
 }
 let dto = self.inner.fetch(tenant, id).await?;
 self.cache.put(key, dto.clone());
 info!(%tenant, %id, "cached proxy populated sample entry");
 Ok(dto)
 }
}

#[cfg(test)]
mod tests {
 use super::*;
 use anvil_storage::InMemoryStorage;
 use chrono::Utc;
 use std::sync::atomic::{AtomicU32, Ordering};

 #[tokio::test]
 async fn direct_provider_reads_through_storage() {
 let storage = Arc::new(InMemoryStorage::new());
 let tenant = TenantId::generate();
 let queue = anvil_types::QueueId::generate();
 let sample_id = SampleId::new("s1");
 storage
.put_sample_ref(anvil_types::SampleRef {
 tenant,
 queue_id: queue,
 id: sample_id.clone(),
 version_tag: "v1".into(),
 metadata: serde_json::json!({"text": "hello"}),
 created_at: Utc::now(),
 })
.await
.unwrap();

 let provider = DirectProvider::new(storage);
 let dto = provider.fetch(&tenant, &sample_id).await.unwrap();
 assert_eq!(dto.version, "v1");
 }

 struct FlakySource {
 failures_remaining: AtomicU32,
 }

 #[async_trait]
 impl RemoteSampleSource for FlakySource {
 async fn fetch_remote(
 &self,
 _tenant: &TenantId,
 id: &SampleId,
) -> Result<SampleDto, reqwest::Error> {
 if self.failures_remaining.load(Ordering::SeqCst) > 0 {
 self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
 // Construct a reqwest::Error without a live network call:
 // a builder error from an invalid URL does the job inline.
 return Err(reqwest::Client::new()
.get("not a url")
.build()
.unwrap_err());
 }
 Ok(SampleDto {
 id: id.clone(),
 content: serde_json::json!({}),
 version: "v2".into(),
 metadata: serde_json::json!({}),
 asset_urls: vec![],
 })
 }
 }

 #[tokio::test]
 async fn remote_provider_falls_back_to_cache_when_breaker_open() {
 let source = FlakySource {
 failures_remaining: AtomicU32::new(10),
 };
 let provider = RemoteProvider::new(
 source,
 CircuitBreakerConfig {
 failure_threshold: 2,
 success_threshold: 1,
 reset_timeout: Duration::from_secs(3600),
 half_open_max_requests: 1,
 },
 10,
);
 let tenant = TenantId::generate();
 let id = SampleId::new("s1");

 // Prime the cache before the breaker trips by seeding it directly.
 provider
.fallback_cache
.put((tenant, id.clone()), SampleDto {
 id: id.clone(),
 content: serde_json::json!({}),
 version: "cached".into(),
 metadata: serde_json::json!({}),
 asset_urls: vec![],
 });

 let _ = provider.fetch(&tenant, &id).await;
 let _ = provider.fetch(&tenant, &id).await;
 assert_eq!(provider.breaker_state(), CircuitState::Open);

 let result = provider.fetch(&tenant, &id).await.unwrap();
 assert_eq!(result.version, "cached");
 }
}
