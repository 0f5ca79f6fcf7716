pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::exchange::ExchangeService;
use crate::services::token_store::TokenStore;
use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::cipher::encrypt_file,
        api::handlers::cipher::download_file,
        api::handlers::cipher::token_info,
        api::handlers::cipher::revoke_token,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::cipher::EncryptResponse,
            api::handlers::cipher::TokenInfoResponse,
        )
    ),
    tags(
        (name = "system", description = "Service status endpoints"),
        (name = "cipher", description = "Encrypt-and-exchange endpoints")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenStore>,
    pub exchange: Arc<ExchangeService>,
    pub config: AppConfig,
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.allowed_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/cipher/encrypt",
            post(api::handlers::cipher::encrypt_file),
        )
        .route(
            "/api/cipher/download/:token",
            get(api::handlers::cipher::download_file),
        )
        .route(
            "/api/cipher/info/:token",
            get(api::handlers::cipher::token_info),
        )
        .route(
            "/api/cipher/:token",
            delete(api::handlers::cipher::revoke_token),
        )
        .layer(cors)
        .with_state(state)
}
