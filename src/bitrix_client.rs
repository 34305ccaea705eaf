use crate::config::CrmFieldMap;
use crate::models::Address;
use reqwest;
use serde_json::{json, Value};
use std::time::Duration;
use tracing;

/// Result of a deal update. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Bitrix24 accepted the update.
    Updated,
    /// Bitrix24 answered with a non-success status.
    Rejected { status: u16, body: String },
    /// The request never got an answer (connection error, timeout, bad URL).
    TransportFailed(String),
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Updated)
    }
}

/// Client for the Bitrix24 inbound webhook.
///
/// The webhook base URL already carries the user id and access token
/// (`https://<portal>/rest/<user>/<token>/`), so no extra auth header is sent.
#[derive(Clone)]
pub struct BitrixClient {
    client: reqwest::Client,
    webhook_url: String,
    fields: CrmFieldMap,
}

impl BitrixClient {
    /// Creates a new `BitrixClient`.
    ///
    /// # Arguments
    ///
    /// * `webhook_url` - The Bitrix24 inbound webhook base URL.
    /// * `fields` - Custom-field keys receiving the address components.
    /// * `timeout` - Per-request timeout.
    pub fn new(
        webhook_url: String,
        fields: CrmFieldMap,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create Bitrix24 client: {}", e))?;

        Ok(Self {
            client,
            webhook_url,
            fields,
        })
    }

    fn update_url(&self) -> String {
        format!(
            "{}/crm.deal.update.json",
            self.webhook_url.trim_end_matches('/')
        )
    }

    /// Builds the `crm.deal.update` payload with every address component upper-cased.
    pub fn build_payload(&self, deal_id: u64, address: &Address) -> Value {
        let mut fields = serde_json::Map::new();
        fields.insert(
            self.fields.neighborhood.clone(),
            json!(address.neighborhood.to_uppercase()),
        );
        fields.insert(self.fields.street.clone(), json!(address.street.to_uppercase()));
        fields.insert(self.fields.city.clone(), json!(address.city.to_uppercase()));
        fields.insert(self.fields.state.clone(), json!(address.state.to_uppercase()));

        json!({
            "ID": deal_id,
            "FIELDS": fields
        })
    }

    /// Writes the address into the deal's custom fields.
    ///
    /// Every call sends a new request; Bitrix24 overwrites the fields by deal id.
    ///
    /// # Arguments
    ///
    /// * `deal_id` - The ID of the deal.
    /// * `address` - The resolved address.
    ///
    /// # Returns
    ///
    /// * `UpdateOutcome` - What happened; never an error.
    pub async fn update_deal(&self, deal_id: u64, address: &Address) -> UpdateOutcome {
        tracing::info!(
            "Updating Bitrix24 deal {} with City: {}, Street: {}, Neighborhood: {}, State: {}",
            deal_id,
            address.city,
            address.street,
            address.neighborhood,
            address.state
        );

        let body = self.build_payload(deal_id, address);

        let response = match self.client.post(self.update_url()).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Bitrix24 request for deal {} failed: {}", deal_id, e);
                return UpdateOutcome::TransportFailed(e.to_string());
            }
        };

        let status = response.status();
        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::info!("Bitrix24 response: {} - {}", status, response_text);

        if !status.is_success() {
            tracing::error!(
                "Failed to update deal {} in Bitrix24: {} - {}",
                deal_id,
                status,
                response_text
            );
            return UpdateOutcome::Rejected {
                status: status.as_u16(),
                body: response_text,
            };
        }

        tracing::info!("✓ Deal {} updated successfully", deal_id);
        UpdateOutcome::Updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> BitrixClient {
        BitrixClient::new(url.to_string(), CrmFieldMap::default(), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_update_url_handles_trailing_slash() {
        let with_slash = client("https://portal.bitrix24.com.br/rest/1/abc/");
        let without_slash = client("https://portal.bitrix24.com.br/rest/1/abc");
        assert_eq!(
            with_slash.update_url(),
            "https://portal.bitrix24.com.br/rest/1/abc/crm.deal.update.json"
        );
        assert_eq!(with_slash.update_url(), without_slash.update_url());
    }

    #[test]
    fn test_payload_is_upper_cased() {
        let client = client("https://portal.bitrix24.com.br/rest/1/abc/");
        let address = Address {
            city: "São Paulo".to_string(),
            street: "Av. Paulista".to_string(),
            neighborhood: "Bela Vista".to_string(),
            state: "sp".to_string(),
        };

        let payload = client.build_payload(42, &address);

        assert_eq!(payload["ID"], 42);
        assert_eq!(payload["FIELDS"]["UF_CRM_1731588487"], "SÃO PAULO");
        assert_eq!(payload["FIELDS"]["UF_CRM_1731957878"], "AV. PAULISTA");
        assert_eq!(payload["FIELDS"]["UF_CRM_1731957897"], "BELA VISTA");
        assert_eq!(payload["FIELDS"]["UF_CRM_1731589190"], "SP");
        assert_eq!(payload["FIELDS"].as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_malformed_webhook_url_is_transport_failure() {
        let client = client("not-a-url");
        let outcome = client.update_deal(1, &Address::default()).await;
        assert!(matches!(outcome, UpdateOutcome::TransportFailed(_)));
        assert!(!outcome.is_success());
    }
}
