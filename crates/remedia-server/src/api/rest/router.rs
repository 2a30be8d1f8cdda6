//! Router creation and configuration

use super::handlers::*;
use super::types::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create REST API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/events", post(handle_event))
        .route("/v1/presign", post(presign))
        // Path used by the legacy upload frontend
        .route("/firmar-url", post(presign))
        .route("/v1/models", get(list_models))
        .route("/objects/:bucket/*key", get(get_object).put(put_object))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
