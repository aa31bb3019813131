//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_body_size;

    Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/channels", get(handlers::list_channels))
        // Tracker events
        .route("/webhook", post(handlers::receive_webhook))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
