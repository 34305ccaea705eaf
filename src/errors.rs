use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

use crate::models::ErrorResponse;

/// Application-level errors that shape the HTTP response.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Deal id or CEP missing or unusable.
    MissingParameter(String),
    /// Every provider failed for the given (normalized) CEP.
    AllProvidersExhausted(String),
    /// Anything unexpected; the detail is logged, never returned.
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::MissingParameter(msg) => write!(f, "Missing parameter: {}", msg),
            AppError::AllProvidersExhausted(cep) => {
                write!(f, "All CEP providers failed for {}", cep)
            }
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and an `{"erro": ...}` body.
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MissingParameter(msg) => {
                tracing::error!("Invalid parameters: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    "Parâmetros obrigatórios não fornecidos".to_string(),
                )
            }
            AppError::AllProvidersExhausted(cep) => {
                tracing::error!("Could not resolve city and state for CEP {}", cep);
                (
                    StatusCode::BAD_REQUEST,
                    "Não foi possível obter dados para o CEP".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Erro interno no servidor".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { erro: message })).into_response()
    }
}

/// Failure of a single provider attempt. Never leaves the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection failure or timeout.
    Transport(String),
    /// Provider answered with a non-success status.
    Status(u16),
    /// Payload undecodable, flagged as an error, or missing city/state.
    Data(String),
}

impl ProviderError {
    /// Errors that say something about the provider's health rather than the CEP.
    ///
    /// Only these count towards opening the provider's circuit breaker.
    pub fn is_outage(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Status(code) => *code == 429 || *code >= 500,
            ProviderError::Data(_) => false,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {}", msg),
            ProviderError::Status(code) => write!(f, "returned status {}", code),
            ProviderError::Data(msg) => write!(f, "unusable payload: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Data(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_parameter_is_bad_request() {
        let response = AppError::MissingParameter("cep".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["erro"], "Parâmetros obrigatórios não fornecidos");
    }

    #[tokio::test]
    async fn test_exhausted_is_bad_request() {
        let response = AppError::AllProvidersExhausted("00000000".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["erro"], "Não foi possível obter dados para o CEP");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response =
            AppError::InternalError("connection pool poisoned at 10.0.0.3".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["erro"], "Erro interno no servidor");
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn test_outage_classification() {
        assert!(ProviderError::Transport("timed out".to_string()).is_outage());
        assert!(ProviderError::Status(503).is_outage());
        assert!(ProviderError::Status(429).is_outage());
        assert!(!ProviderError::Status(404).is_outage());
        assert!(!ProviderError::Status(400).is_outage());
        assert!(!ProviderError::Data("erro".to_string()).is_outage());
    }
}
