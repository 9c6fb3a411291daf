//! Legacy API handlers
//!
//! Flat routes kept for existing dashboard and sensor clients:
//! - `GET /` - liveness text
//! - `GET /sensordata` - latest reading as a one-element array
//! - `POST /sensordata` - append a reading
//! - `POST /predict` - crop prediction plus fertilizer guidance

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use super::prediction::{self, LegacyPrediction, PredictRequest, INVALID_FEATURES_MESSAGE};
use crate::classifier::CropClassifier;
use crate::dosage::DosageEngine;
use crate::storage::{NewReading, SensorStore};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DosageEngine>,
    pub classifier: Arc<dyn CropClassifier>,
    pub store: Arc<dyn SensorStore>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        engine: Arc<DosageEngine>,
        classifier: Arc<dyn CropClassifier>,
        store: Arc<dyn SensorStore>,
    ) -> Self {
        Self {
            engine,
            classifier,
            store,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

fn legacy_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn index() -> &'static str {
    "Crop Recommendation API is running."
}

/// GET /sensordata
pub async fn get_sensor_data(State(state): State<AppState>) -> Response {
    match state.store.latest().await {
        Ok(latest) => Json(latest.into_iter().collect::<Vec<_>>()).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read latest sensor reading");
            legacy_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /sensordata
pub async fn post_sensor_data(
    State(state): State<AppState>,
    body: Result<Json<NewReading>, JsonRejection>,
) -> Response {
    let reading = match body {
        Ok(Json(r)) if r.is_finite() => r,
        Ok(_) => return legacy_error(StatusCode::BAD_REQUEST, "Readings must be finite numbers."),
        Err(rejection) => return legacy_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.store.append(reading).await {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to store sensor reading");
            legacy_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// POST /predict
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let features = match body {
        Ok(Json(req)) => req.features(),
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "Rejected predict body");
            None
        }
    };
    let Some(features) = features else {
        return legacy_error(StatusCode::BAD_REQUEST, INVALID_FEATURES_MESSAGE);
    };

    Json(LegacyPrediction::from(prediction::predict(&state, features))).into_response()
}
