use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::future::Future;
use std::time::Duration;

use crate::models::Address;

/// Process-lifetime memo of resolved addresses keyed by normalized CEP.
///
/// Bounded by entry count with least-recently-used eviction. Only successful
/// resolutions are stored, so a provider outage does not pin a failure until restart.
#[derive(Clone)]
pub struct CepCache {
    inner: Cache<String, Address>,
}

impl CepCache {
    pub fn new(max_capacity: u64, time_to_live: Option<Duration>) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru());
        if let Some(ttl) = time_to_live {
            builder = builder.time_to_live(ttl);
        }

        Self {
            inner: builder.build(),
        }
    }

    /// Returns the cached address for `cep`, or runs `resolve` and caches a `Some`.
    ///
    /// Concurrent callers for the same key share a single `resolve` run.
    pub async fn get_or_resolve<F>(&self, cep: &str, resolve: F) -> Option<Address>
    where
        F: Future<Output = Option<Address>>,
    {
        self.inner.optionally_get_with(cep.to_string(), resolve).await
    }

    #[cfg(test)]
    pub(crate) async fn get(&self, cep: &str) -> Option<Address> {
        self.inner.get(cep).await
    }

    pub fn contains(&self, cep: &str) -> bool {
        self.inner.contains_key(cep)
    }

    /// Approximate entry count, reported by the health endpoint.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Applies pending evictions so `entry_count` is exact.
    #[cfg(test)]
    pub(crate) async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}
