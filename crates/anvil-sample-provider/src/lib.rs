//! The Sample provider port: fetches sample content by id and
//! version, with a circuit breaker and caching adapters. The core never
//! calls this port synchronously inside a state-changing transaction
//!; it calls it before creating an Assignment (to pin
//! the version tag) and during export (to enrich manifests).

pub mod breaker;
pub mod cache;
pub mod dto;
pub mod error;
pub mod provider;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use cache::{BoundedLruCache, TtlCache};
pub use dto::SampleDto;
pub use error::{SampleProviderError, SampleProviderResult};
pub use provider::{
 CachedProxyProvider, DirectProvider, HttpSampleSource, RemoteProvider, RemoteSampleSource,
 SampleProvider,
};
