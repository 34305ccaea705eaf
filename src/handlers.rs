use crate::bitrix_client::BitrixClient;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{normalize_cep, SuccessResponse};
use crate::resolver::AddressResolver;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// CEP resolver with its provider chain and result cache.
    pub resolver: AddressResolver,
    /// Client for the Bitrix24 webhook.
    pub bitrix: BitrixClient,
}

/// Health check endpoint.
///
/// Returns the service status, version and CEP cache fill.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "ops"
)]
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "cep-crm-sync",
            "version": env!("CARGO_PKG_VERSION"),
            "cep_cache": {
                "entries": state.resolver.cache().entry_count(),
                "capacity": state.config.providers.cache_capacity
            }
        })),
    )
}

/// POST /atualizar_cidade_uf/:deal_id/:cep
///
/// Resolves the CEP to city, street, neighborhood and state and writes them into the
/// Bitrix24 deal. The response is 200 once the address is resolved, even if the
/// Bitrix24 write itself failed; that outcome is only logged.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `deal_id` - Bitrix24 deal id (positive integer).
/// * `cep` - CEP, with or without hyphen.
///
/// # Returns
///
/// * `Result<(StatusCode, Json<SuccessResponse>), AppError>` - Success message or an error.
#[utoipa::path(
    post,
    path = "/atualizar_cidade_uf/{deal_id}/{cep}",
    params(
        ("deal_id" = u64, Path, description = "Bitrix24 deal id"),
        ("cep" = String, Path, description = "Postal code, e.g. 01310-100")
    ),
    responses(
        (status = 200, description = "Address resolved and sent to Bitrix24", body = SuccessResponse),
        (status = 400, description = "Missing parameters or CEP not resolvable", body = ErrorResponse),
        (status = 500, description = "Unexpected failure", body = ErrorResponse)
    ),
    tag = "deals"
)]
pub async fn atualizar_cidade_uf(
    State(state): State<Arc<AppState>>,
    Path((deal_id, cep)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SuccessResponse>), AppError> {
    tracing::info!("POST /atualizar_cidade_uf/{}/{}", deal_id, cep);

    let deal_id = parse_deal_id(&deal_id)?;
    if normalize_cep(&cep).is_empty() {
        return Err(AppError::MissingParameter(format!(
            "deal_id={}, cep={:?}",
            deal_id, cep
        )));
    }

    let address = state.resolver.resolve(&cep).await?;

    let outcome = state.bitrix.update_deal(deal_id, &address).await;
    if !outcome.is_success() {
        tracing::warn!(
            "Reporting deal {} as updated although the Bitrix24 write failed: {:?}",
            deal_id,
            outcome
        );
    }

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            sucesso: format!("Registro {} atualizado com sucesso!", deal_id),
        }),
    ))
}

/// Catches `/atualizar_cidade_uf` requests missing the deal id or CEP segment.
pub async fn missing_parameters() -> AppError {
    AppError::MissingParameter("deal_id and cep path segments are required".to_string())
}

fn parse_deal_id(raw: &str) -> Result<u64, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::MissingParameter(format!("deal_id={:?}", raw))),
    }
}

/// Turns a handler panic into the generic 500 body.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::InternalError(format!("handler panicked: {}", detail)).into_response()
}
