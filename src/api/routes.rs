//! Legacy route table
//!
//! - `/` - liveness text
//! - `/sensordata` - latest reading / append reading
//! - `/predict` - crop prediction with fertilizer guidance

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, AppState};

/// Flat routes served at the root, as older clients expect.
pub fn legacy_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/sensordata", get(handlers::get_sensor_data))
        .route("/sensordata", post(handlers::post_sensor_data))
        .route("/predict", post(handlers::predict))
        .with_state(state)
}
