//! v2 API route table.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::AppState;
use super::v2_handlers;

/// Build the v2 API router.
pub fn v2_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/system/health", get(v2_handlers::system_health))
        // Advice
        .route("/predict", post(v2_handlers::predict))
        .route("/recommend", post(v2_handlers::recommend))
        .route("/crops", get(v2_handlers::crops))
        // Readings
        .route("/readings/latest", get(v2_handlers::latest_reading))
        .route("/readings", get(v2_handlers::readings))
        .route("/readings", post(v2_handlers::add_reading))
        .with_state(state)
}
