//! Top-level application router.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{middleware, Json, Router};
use http::{header, HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::messaging::{messaging_routes, MessagingAppState};
use super::middleware::{auth_middleware, AuthState};

/// GET /health - Liveness check, unauthenticated.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Builds the full application.
///
/// Everything under `/api` passes through session authentication; the
/// transport (plain request or WebSocket upgrade) decides where the token
/// is read from.
pub fn app_router(state: MessagingAppState, validator: AuthState, server: &ServerConfig) -> Router {
    let api = Router::new()
        .nest("/api", messaging_routes())
        .layer(middleware::from_fn_with_state(validator, auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.cors_origins_list()))
                .layer(TimeoutLayer::new(server.request_timeout())),
        )
}

/// CORS for browser clients. No configured origins means any origin,
/// without credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    cors.allow_origin(allowed).allow_credentials(true)
}
