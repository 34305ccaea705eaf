//! CEP to address resolution with provider fallback.
//!
//! Providers are tried in order until one returns a complete address. Results are
//! memoized per normalized CEP in a [`CepCache`], and each provider sits behind its own
//! circuit breaker so a dead upstream is skipped rather than waited on.

use failsafe::futures::CircuitBreaker;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CepCache;
use crate::circuit_breaker::{create_provider_circuit_breaker, ProviderCircuitBreaker};
use crate::config::ProviderConfig;
use crate::errors::{AppError, ProviderError};
use crate::models::{normalize_cep, Address};
use crate::services::{default_providers, AddressProvider};

struct ProviderSlot {
    provider: Arc<dyn AddressProvider>,
    breaker: ProviderCircuitBreaker,
}

/// Tunables for [`AddressResolver::new`].
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Pause before each fallback attempt.
    pub retry_delay: Duration,
    /// Consecutive outages before a provider is skipped.
    pub failure_threshold: u32,
    pub cache_capacity: u64,
    pub cache_ttl: Option<Duration>,
}

impl From<&ProviderConfig> for ResolverSettings {
    fn from(config: &ProviderConfig) -> Self {
        Self {
            retry_delay: config.retry_delay(),
            failure_threshold: config.failure_threshold,
            cache_capacity: config.cache_capacity,
            cache_ttl: config.cache_ttl(),
        }
    }
}

pub struct AddressResolver {
    providers: Vec<ProviderSlot>,
    retry_delay: Duration,
    cache: CepCache,
}

impl AddressResolver {
    pub fn new(providers: Vec<Arc<dyn AddressProvider>>, settings: ResolverSettings) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| ProviderSlot {
                provider,
                breaker: create_provider_circuit_breaker(settings.failure_threshold),
            })
            .collect();

        Self {
            providers,
            retry_delay: settings.retry_delay,
            cache: CepCache::new(settings.cache_capacity, settings.cache_ttl),
        }
    }

    /// Resolver over ViaCEP, OpenCEP and BrasilAPI sharing one HTTP client.
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create CEP HTTP client: {}", e))?;

        Ok(Self::new(default_providers(&client, config), config.into()))
    }

    /// The result cache, exposed for the health endpoint.
    pub fn cache(&self) -> &CepCache {
        &self.cache
    }

    /// Resolves a raw CEP to an address.
    ///
    /// Cached per normalized CEP. Returns [`AppError::AllProvidersExhausted`] when no
    /// provider produced a complete address.
    pub async fn resolve(&self, raw_cep: &str) -> Result<Address, AppError> {
        tracing::info!("Looking up CEP: {}", raw_cep);
        let cep = normalize_cep(raw_cep);

        let address = self
            .cache
            .get_or_resolve(&cep, self.resolve_uncached(&cep))
            .await;

        address.ok_or(AppError::AllProvidersExhausted(cep))
    }

    async fn resolve_uncached(&self, cep: &str) -> Option<Address> {
        for (attempt, slot) in self.providers.iter().enumerate() {
            let name = slot.provider.name();

            if attempt > 0 && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }

            let result = slot
                .breaker
                .call_with(ProviderError::is_outage, slot.provider.lookup(cep))
                .await;

            match result {
                Ok(address) => {
                    tracing::info!(
                        "{} used - City: {}, Street: {}, Neighborhood: {}, State: {}",
                        name,
                        address.city,
                        address.street,
                        address.neighborhood,
                        address.state
                    );
                    return Some(address);
                }
                Err(failsafe::Error::Inner(e)) => {
                    tracing::error!("{} failed for CEP {}: {}", name, cep, e);
                }
                Err(failsafe::Error::Rejected) => {
                    tracing::warn!("{} circuit open, skipping for CEP {}", name, cep);
                }
            }
        }

        tracing::error!(
            "Could not resolve CEP {} with any of the {} providers",
            cep,
            self.providers.len()
        );
        None
    }
}
