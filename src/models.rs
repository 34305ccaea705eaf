use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Normalizes a CEP for cache lookups and outbound URLs.
///
/// Strips surrounding and inner whitespace and every hyphen. No format check is
/// applied; malformed codes are left for the providers to reject.
pub fn normalize_cep(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Address resolved from a single provider.
///
/// Fields the provider did not return are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    /// City (localidade).
    pub city: String,
    /// Street (logradouro).
    pub street: String,
    /// Neighborhood (bairro).
    pub neighborhood: String,
    /// State abbreviation (UF).
    pub state: String,
}

impl Address {
    /// An address is usable only when both city and state were returned.
    pub fn is_complete(&self) -> bool {
        !self.city.trim().is_empty() && !self.state.trim().is_empty()
    }
}

// ============ Provider payloads ============

/// ViaCEP `/ws/{cep}/json/` response.
///
/// Unknown CEPs come back as HTTP 200 with `{"erro": true}` (older deployments send
/// the string `"true"`), so the marker is kept as a raw value.
#[derive(Debug, Clone, Deserialize)]
pub struct ViaCepResponse {
    #[serde(default)]
    pub erro: Option<serde_json::Value>,
    #[serde(default)]
    pub localidade: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
}

/// OpenCEP `/api/cep/{cep}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenCepResponse {
    #[serde(default)]
    pub cidade: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
}

/// BrasilAPI `/api/cep/v2/{cep}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BrasilApiResponse {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl From<ViaCepResponse> for Address {
    fn from(data: ViaCepResponse) -> Self {
        Self {
            city: data.localidade.unwrap_or_default(),
            street: data.logradouro.unwrap_or_default(),
            neighborhood: data.bairro.unwrap_or_default(),
            state: data.uf.unwrap_or_default(),
        }
    }
}

impl From<OpenCepResponse> for Address {
    fn from(data: OpenCepResponse) -> Self {
        Self {
            city: data.cidade.unwrap_or_default(),
            street: data.logradouro.unwrap_or_default(),
            neighborhood: data.bairro.unwrap_or_default(),
            state: data.uf.unwrap_or_default(),
        }
    }
}

impl From<BrasilApiResponse> for Address {
    fn from(data: BrasilApiResponse) -> Self {
        Self {
            city: data.city.unwrap_or_default(),
            street: data.street.unwrap_or_default(),
            neighborhood: data.neighborhood.unwrap_or_default(),
            state: data.state.unwrap_or_default(),
        }
    }
}

// ============ HTTP response bodies ============

/// Body returned when the deal update went through.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    #[schema(example = "Registro 42 atualizado com sucesso!")]
    pub sucesso: String,
}

/// Body returned for every client or server error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Não foi possível obter dados para o CEP")]
    pub erro: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_cep_strips_hyphen_and_whitespace() {
        assert_eq!(normalize_cep("01310-100"), "01310100");
        assert_eq!(normalize_cep("  01310-100 "), "01310100");
        assert_eq!(normalize_cep("01 310-100"), "01310100");
        assert_eq!(normalize_cep("01310100"), "01310100");
    }

    #[test]
    fn test_normalize_cep_passes_malformed_through() {
        assert_eq!(normalize_cep("abc-12"), "abc12");
        assert_eq!(normalize_cep(" - "), "");
    }

    #[test]
    fn test_viacep_mapping() {
        let payload: ViaCepResponse = serde_json::from_value(serde_json::json!({
            "cep": "01310-100",
            "logradouro": "Avenida Paulista",
            "bairro": "Bela Vista",
            "localidade": "São Paulo",
            "uf": "SP"
        }))
        .unwrap();
        assert!(payload.erro.is_none());

        let address = Address::from(payload);
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.street, "Avenida Paulista");
        assert_eq!(address.neighborhood, "Bela Vista");
        assert_eq!(address.state, "SP");
    }

    #[test]
    fn test_viacep_error_marker_parsed() {
        let payload: ViaCepResponse =
            serde_json::from_value(serde_json::json!({ "erro": true })).unwrap();
        assert!(payload.erro.is_some());
        assert!(!Address::from(payload).is_complete());
    }

    #[test]
    fn test_brasilapi_missing_fields_default_to_empty() {
        let payload: BrasilApiResponse = serde_json::from_value(serde_json::json!({
            "cep": "69900000",
            "city": "Rio Branco",
            "state": "AC"
        }))
        .unwrap();
        let address = Address::from(payload);
        assert_eq!(address.street, "");
        assert_eq!(address.neighborhood, "");
        assert!(address.is_complete());
    }

    #[test]
    fn test_is_complete_requires_city_and_state() {
        let mut address = Address {
            city: "Curitiba".to_string(),
            state: "PR".to_string(),
            ..Default::default()
        };
        assert!(address.is_complete());
        address.state = " ".to_string();
        assert!(!address.is_complete());
    }
}
