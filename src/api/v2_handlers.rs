//! v2 API handlers: enveloped, typed responses with ISO-8601 timestamps.
//!
//! All handlers return `Response` via [`ApiResponse`] or [`ApiErrorResponse`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use super::envelope::{ApiErrorResponse, ApiResponse};
use super::handlers::AppState;
use super::prediction::{self, PredictRequest, RecommendRequest, INVALID_FEATURES_MESSAGE};
use crate::config::defaults;
use crate::storage::{NewReading, StorageError};

// ============================================================================
// Response types
// ============================================================================

/// Body of `/api/v2/system/health`.
#[derive(Debug, Serialize)]
pub struct HealthV2 {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub classifier: String,
    pub crops: usize,
    pub store: StoreHealth,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Query types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn resolved(&self) -> usize {
        self.limit
            .unwrap_or(defaults::DEFAULT_READINGS_LIMIT)
            .clamp(1, defaults::MAX_READINGS_LIMIT)
    }
}

// ============================================================================
// Internal helpers
// ============================================================================

/// Remote and unconfigured stores are "unavailable"; local failures are internal.
fn storage_error_response(e: &StorageError) -> Response {
    error!(error = %e, "Sensor store error");
    match e {
        StorageError::Remote(_)
        | StorageError::RemoteStatus { .. }
        | StorageError::NotConfigured(_) => {
            ApiErrorResponse::service_unavailable(format!("Sensor store unavailable: {e}"))
        }
        StorageError::Database(_) | StorageError::Serialization(_) => {
            ApiErrorResponse::internal(format!("Storage error: {e}"))
        }
    }
}

fn json_error(rejection: &JsonRejection) -> Response {
    ApiErrorResponse::bad_request(rejection.body_text())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v2/system/health
pub async fn system_health(State(state): State<AppState>) -> Response {
    let store_error = state.store.latest().await.err().map(|e| e.to_string());
    let health = HealthV2 {
        status: if store_error.is_none() { "ok" } else { "degraded" },
        uptime_secs: state.uptime_secs(),
        classifier: state.classifier.name().to_string(),
        crops: state.engine.targets().len(),
        store: StoreHealth {
            backend: state.store.backend_name(),
            reachable: store_error.is_none(),
            error: store_error,
        },
    };
    ApiResponse::ok(health)
}

/// POST /api/v2/predict
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return json_error(&rejection),
    };
    match req.features() {
        Some(features) => ApiResponse::ok(prediction::predict(&state, features)),
        None => ApiErrorResponse::bad_request(INVALID_FEATURES_MESSAGE),
    }
}

/// POST /api/v2/recommend: engine only, the caller names the crop.
pub async fn recommend(
    State(state): State<AppState>,
    body: Result<Json<RecommendRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return json_error(&rejection),
    };
    let Some(features) = req.features() else {
        return ApiErrorResponse::bad_request(INVALID_FEATURES_MESSAGE);
    };
    let crop = req.crop.trim();
    if crop.is_empty() {
        return ApiErrorResponse::bad_request("crop must not be empty");
    }
    ApiResponse::ok(prediction::recommend(&state, crop.to_string(), features))
}

/// GET /api/v2/crops
pub async fn crops(State(state): State<AppState>) -> Response {
    ApiResponse::ok(state.engine.targets())
}

/// GET /api/v2/readings/latest
pub async fn latest_reading(State(state): State<AppState>) -> Response {
    match state.store.latest().await {
        Ok(Some(reading)) => ApiResponse::ok(reading),
        Ok(None) => ApiErrorResponse::not_found("No sensor readings recorded yet"),
        Err(e) => storage_error_response(&e),
    }
}

/// GET /api/v2/readings?limit=N
pub async fn readings(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Response {
    match state.store.recent(q.resolved()).await {
        Ok(items) => ApiResponse::ok(items),
        Err(e) => storage_error_response(&e),
    }
}

/// POST /api/v2/readings
pub async fn add_reading(
    State(state): State<AppState>,
    body: Result<Json<NewReading>, JsonRejection>,
) -> Response {
    let Json(reading) = match body {
        Ok(b) => b,
        Err(rejection) => return json_error(&rejection),
    };
    if !reading.is_finite() {
        return ApiErrorResponse::bad_request("Readings must be finite numbers");
    }
    match state.store.append(reading).await {
        Ok(stored) => ApiResponse::created(stored),
        Err(e) => storage_error_response(&e),
    }
}
