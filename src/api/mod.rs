//! HTTP surface: routes, OpenAPI document and the layers every route shares.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{self, AppState};
use crate::models::{Address, ErrorResponse, SuccessResponse};

#[derive(OpenApi)]
#[openapi(
    paths(handlers::atualizar_cidade_uf, handlers::health),
    components(schemas(SuccessResponse, ErrorResponse, Address)),
    tags(
        (name = "deals", description = "Bitrix24 deal address updates"),
        (name = "ops", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;

/// Deal update routes, left unlayered so the caller decides on rate limiting.
///
/// Requests missing the CEP (or both segments) get the same 400 as a blank CEP
/// instead of a routing 404.
pub fn business_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/atualizar_cidade_uf/:deal_id/:cep",
            post(handlers::atualizar_cidade_uf),
        )
        .route(
            "/atualizar_cidade_uf/:deal_id",
            post(handlers::missing_parameters),
        )
        .route("/atualizar_cidade_uf/:deal_id/", post(handlers::missing_parameters))
        .route("/atualizar_cidade_uf", post(handlers::missing_parameters))
        .route("/atualizar_cidade_uf/", post(handlers::missing_parameters))
}

/// Full application: health, docs and the given business routes.
pub fn app(state: Arc<AppState>, business: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(business)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
