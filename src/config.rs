use serde::Deserialize;
use std::time::Duration;

/// Bitrix24 custom-field keys that receive the resolved address components.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CrmFieldMap {
    pub city: String,
    pub street: String,
    pub neighborhood: String,
    pub state: String,
}

impl Default for CrmFieldMap {
    fn default() -> Self {
        Self {
            city: "UF_CRM_1731588487".to_string(),
            street: "UF_CRM_1731957878".to_string(),
            neighborhood: "UF_CRM_1731957897".to_string(),
            state: "UF_CRM_1731589190".to_string(),
        }
    }
}

/// Settings for the CEP providers, the fallback loop and the result cache.
///
/// Split out of [`Config`] so tools that only resolve addresses (the `cep-lookup`
/// binary) can load them without a CRM webhook configured.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub viacep_base_url: String,
    pub opencep_base_url: String,
    pub brasilapi_base_url: String,
    pub http_timeout_secs: u64,
    pub retry_delay_ms: u64,
    pub failure_threshold: u32,
    pub cache_capacity: u64,
    pub cache_ttl_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            viacep_base_url: "https://viacep.com.br/ws".to_string(),
            opencep_base_url: "https://opencep.com.br/api/cep".to_string(),
            brasilapi_base_url: "https://brasilapi.com.br/api/cep/v2".to_string(),
            http_timeout_secs: 5,
            retry_delay_ms: 1000,
            failure_threshold: 5,
            cache_capacity: 1024,
            cache_ttl_secs: None,
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            viacep_base_url: url_var("VIACEP_BASE_URL", defaults.viacep_base_url)?,
            opencep_base_url: url_var("OPENCEP_BASE_URL", defaults.opencep_base_url)?,
            brasilapi_base_url: url_var("BRASILAPI_BASE_URL", defaults.brasilapi_base_url)?,
            http_timeout_secs: parsed_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            retry_delay_ms: parsed_var("PROVIDER_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            failure_threshold: parsed_var(
                "PROVIDER_FAILURE_THRESHOLD",
                defaults.failure_threshold,
            )
            .and_then(|threshold| {
                if threshold == 0 {
                    anyhow::bail!("PROVIDER_FAILURE_THRESHOLD must be at least 1");
                }
                Ok(threshold)
            })?,
            cache_capacity: parsed_var("CEP_CACHE_CAPACITY", defaults.cache_capacity)?,
            cache_ttl_secs: std::env::var("CEP_CACHE_TTL_SECS")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.trim()
                        .parse()
                        .map_err(|_| anyhow::anyhow!("CEP_CACHE_TTL_SECS must be a number"))
                })
                .transpose()?,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub bitrix_webhook_url: String,
    pub crm_fields: CrmFieldMap,
    pub providers: ProviderConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let default_fields = CrmFieldMap::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "7964".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            bitrix_webhook_url: std::env::var("BITRIX_WEBHOOK_URL")
                .map_err(|_| anyhow::anyhow!("BITRIX_WEBHOOK_URL environment variable required"))
                .and_then(|url| validate_url("BITRIX_WEBHOOK_URL", url))?,
            crm_fields: CrmFieldMap {
                city: string_var("BITRIX_FIELD_CITY", default_fields.city),
                street: string_var("BITRIX_FIELD_STREET", default_fields.street),
                neighborhood: string_var(
                    "BITRIX_FIELD_NEIGHBORHOOD",
                    default_fields.neighborhood,
                ),
                state: string_var("BITRIX_FIELD_STATE", default_fields.state),
            },
            providers: ProviderConfig::from_env()?,
        };

        // Webhook URL embeds the Bitrix24 access token, keep it out of the logs
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("ViaCEP Base URL: {}", config.providers.viacep_base_url);
        tracing::debug!("OpenCEP Base URL: {}", config.providers.opencep_base_url);
        tracing::debug!("BrasilAPI Base URL: {}", config.providers.brasilapi_base_url);
        tracing::debug!(
            "CEP cache capacity: {}, TTL: {:?}",
            config.providers.cache_capacity,
            config.providers.cache_ttl_secs
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn string_var(name: &str, default: String) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
}

fn url_var(name: &str, default: String) -> anyhow::Result<String> {
    validate_url(name, string_var(name, default))
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        _ => Ok(default),
    }
}

fn validate_url(name: &str, url: String) -> anyhow::Result<String> {
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    let parsed = url::Url::parse(url.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("X", "https://viacep.com.br/ws".to_string()).is_ok());
        assert!(validate_url("X", "http://localhost:8080".to_string()).is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(validate_url("X", "ftp://example.com".to_string()).is_err());
        assert!(validate_url("X", "not a url".to_string()).is_err());
        assert!(validate_url("X", "   ".to_string()).is_err());
    }

    #[test]
    fn test_validate_url_trims() {
        let url = validate_url("X", "  https://example.com/rest/1/abc/ ".to_string()).unwrap();
        assert_eq!(url, "https://example.com/rest/1/abc/");
    }

    #[test]
    fn test_provider_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry_delay(), Duration::from_millis(1000));
        assert_eq!(config.cache_ttl(), None);
        assert_eq!(config.failure_threshold, 5);
    }

    #[test]
    fn test_default_field_map() {
        let fields = CrmFieldMap::default();
        assert_eq!(fields.city, "UF_CRM_1731588487");
        assert_eq!(fields.state, "UF_CRM_1731589190");
    }
}
