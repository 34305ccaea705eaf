use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use crate::models::*;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// One external CEP lookup API.
///
/// Implementations map their own response schema onto [`Address`] and report every
/// failure as a [`ProviderError`]; they never panic and never retry.
#[async_trait]
pub trait AddressProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Looks up an already-normalized CEP.
    async fn lookup(&self, cep: &str) -> Result<Address, ProviderError>;
}

/// Builds `{base}/{segments...}` with each segment percent-encoded, so a crafted CEP
/// cannot walk out of the provider's path.
fn build_url(base_url: &str, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ProviderError::Transport(format!("invalid base URL {}: {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ProviderError::Transport(format!("base URL {} cannot be a base", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    provider: &str,
    url: Url,
) -> Result<T, ProviderError> {
    tracing::debug!("{}: GET {}", provider, url);

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::debug!("{} returned {}: {}", provider, status, error_text);
        return Err(ProviderError::Status(status.as_u16()));
    }

    let data = response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Data(format!("failed to parse response: {}", e)))?;

    Ok(data)
}

fn complete(address: Address) -> Result<Address, ProviderError> {
    if address.is_complete() {
        Ok(address)
    } else {
        Err(ProviderError::Data("city or state missing".to_string()))
    }
}

// ============ ViaCEP ============

pub struct ViaCepService {
    client: Client,
    base_url: String,
}

impl ViaCepService {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AddressProvider for ViaCepService {
    fn name(&self) -> &str {
        "ViaCEP"
    }

    async fn lookup(&self, cep: &str) -> Result<Address, ProviderError> {
        // ViaCEP wants a trailing slash: /ws/{cep}/json/
        let url = build_url(&self.base_url, &[cep, "json", ""])?;
        let data: ViaCepResponse = fetch_json(&self.client, self.name(), url).await?;

        if data.erro.is_some() {
            return Err(ProviderError::Data("payload carries 'erro' marker".to_string()));
        }

        complete(Address::from(data))
    }
}

// ============ OpenCEP ============

pub struct OpenCepService {
    client: Client,
    base_url: String,
}

impl OpenCepService {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AddressProvider for OpenCepService {
    fn name(&self) -> &str {
        "OpenCEP"
    }

    async fn lookup(&self, cep: &str) -> Result<Address, ProviderError> {
        let url = build_url(&self.base_url, &[cep])?;
        let data: OpenCepResponse = fetch_json(&self.client, self.name(), url).await?;
        complete(Address::from(data))
    }
}

// ============ BrasilAPI ============

pub struct BrasilApiService {
    client: Client,
    base_url: String,
}

impl BrasilApiService {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AddressProvider for BrasilApiService {
    fn name(&self) -> &str {
        "BrasilAPI"
    }

    async fn lookup(&self, cep: &str) -> Result<Address, ProviderError> {
        let url = build_url(&self.base_url, &[cep])?;
        let data: BrasilApiResponse = fetch_json(&self.client, self.name(), url).await?;
        complete(Address::from(data))
    }
}

/// The providers in fallback order: ViaCEP, then OpenCEP, then BrasilAPI.
pub fn default_providers(
    client: &Client,
    config: &ProviderConfig,
) -> Vec<Arc<dyn AddressProvider>> {
    vec![
        Arc::new(ViaCepService::new(client.clone(), &config.viacep_base_url)),
        Arc::new(OpenCepService::new(client.clone(), &config.opencep_base_url)),
        Arc::new(BrasilApiService::new(client.clone(), &config.brasilapi_base_url)),
    ]
}
