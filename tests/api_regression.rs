//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the legacy flat routes and /api/v2/* using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use crop_advisor::api::{create_app, AppState};
use crop_advisor::config::{AdvisorConfig, ServerConfig};
use crop_advisor::storage::InMemorySensorStore;
use crop_advisor::{
    CropClassifier, DosageEngine, NewReading, SensorStore, StorageError, StoredReading,
};

/// Always predicts the same crop, so responses are predictable.
struct FixedClassifier(&'static str);

impl CropClassifier for FixedClassifier {
    fn classify(&self, _features: [f64; 3]) -> String {
        self.0.to_string()
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// A store whose backend is always down.
struct UnreachableStore;

#[async_trait]
impl SensorStore for UnreachableStore {
    async fn append(&self, _reading: NewReading) -> Result<StoredReading, StorageError> {
        Err(StorageError::Remote("connection refused".to_string()))
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<StoredReading>, StorageError> {
        Err(StorageError::Remote("connection refused".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

fn test_state(crop: &'static str, store: Arc<dyn SensorStore>) -> AppState {
    let engine = Arc::new(DosageEngine::from_config(&AdvisorConfig::default()));
    AppState::new(engine, Arc::new(FixedClassifier(crop)), store)
}

fn test_app(crop: &'static str) -> Router {
    let store: Arc<dyn SensorStore> = Arc::new(InMemorySensorStore::default());
    create_app(test_state(crop, store), &ServerConfig::default())
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Legacy routes
// ============================================================================

#[tokio::test]
async fn test_root_reports_running() {
    let app = test_app("maize");
    let resp = app.oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Crop Recommendation API is running.");
}

#[tokio::test]
async fn test_legacy_predict_maize_example() {
    let app = test_app("maize");
    let (status, v) = send_json(&app, post_json("/predict", r#"{"features": [100, 20, 50]}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["prediction"], "maize");
    assert_eq!(v["needed_nutrients"]["N"], 97);
    assert_eq!(v["needed_nutrients"]["P"], 50);
    assert_eq!(v["needed_nutrients"]["K"], 130);
    assert!(v["needed_nutrients"]["N"].is_i64(), "legacy amounts are integers");
    assert_eq!(v["fertilizer"]["Urea"], 38.8);
    assert_eq!(v["fertilizer"]["TSP"], 90.0);
    assert_eq!(v["fertilizer"]["MOP"], 60.0);
    assert!(v.get("guidance").is_none());
}

#[tokio::test]
async fn test_legacy_predict_unknown_crop_gives_guidance() {
    let app = test_app("coffee");
    let (status, v) = send_json(&app, post_json("/predict", r#"{"features": [10, 10, 10]}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["prediction"], "coffee");
    assert_eq!(v["guidance"], "No fertilizer guidance available for coffee");
    assert!(v.get("fertilizer").is_none());
    assert!(v.get("needed_nutrients").is_none());
}

#[tokio::test]
async fn test_legacy_predict_rejects_bad_input() {
    let app = test_app("maize");
    let bodies = [
        r#"{"features": [1, 2]}"#,
        r#"{"features": [1, 2, 3, 4]}"#,
        r#"{"features": ["a", 2, 3]}"#,
        r#"{"values": [1, 2, 3]}"#,
        "not json",
    ];

    for body in bodies {
        let (status, v) = send_json(&app, post_json("/predict", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} should be rejected");
        assert_eq!(v["error"], "Invalid input. Must be a list of 3 NPK values.");
    }
}

#[tokio::test]
async fn test_legacy_routes_carry_deprecation_headers() {
    let app = test_app("maize");
    let resp = app
        .oneshot(post_json("/predict", r#"{"features": [1, 2, 3]}"#))
        .await
        .unwrap();

    assert_eq!(resp.headers().get("deprecation").unwrap(), "true");
    assert!(resp
        .headers()
        .get("link")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("/api/v2"));
}

#[tokio::test]
async fn test_sensordata_roundtrip() {
    let app = test_app("maize");

    let (status, v) = send_json(&app, get("/sensordata")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, serde_json::json!([]));

    let (status, _) = send_json(
        &app,
        post_json("/sensordata", r#"{"nitrogen": 90, "phosphorus": 42, "potassium": 43}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send_json(
        &app,
        post_json("/sensordata", r#"{"nitrogen": 12.5, "phosphorus": 7, "potassium": 8}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, v) = send_json(&app, get("/sensordata")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = v.as_array().unwrap();
    assert_eq!(rows.len(), 1, "only the latest reading is returned");
    assert_eq!(rows[0]["nitrogen"], 12.5);
}

#[tokio::test]
async fn test_sensordata_store_failure_is_500() {
    let app = create_app(
        test_state("maize", Arc::new(UnreachableStore)),
        &ServerConfig::default(),
    );
    let (status, v) = send_json(&app, get("/sensordata")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().unwrap().contains("connection refused"));
}

// ============================================================================
// v2 routes
// ============================================================================

#[tokio::test]
async fn test_v2_health() {
    let app = test_app("maize");
    let (status, v) = send_json(&app, get("/api/v2/system/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["meta"]["version"], "2");
    assert_eq!(v["data"]["status"], "ok");
    assert_eq!(v["data"]["classifier"], "fixed");
    assert_eq!(v["data"]["crops"], 2);
    assert_eq!(v["data"]["store"]["backend"], "memory");
    assert_eq!(v["data"]["store"]["reachable"], true);
}

#[tokio::test]
async fn test_v2_health_degraded_when_store_down() {
    let app = create_app(
        test_state("maize", Arc::new(UnreachableStore)),
        &ServerConfig::default(),
    );
    let (status, v) = send_json(&app, get("/api/v2/system/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["status"], "degraded");
    assert_eq!(v["data"]["store"]["reachable"], false);
}

#[tokio::test]
async fn test_v2_predict_is_enveloped() {
    let app = test_app("maize");
    let (status, v) =
        send_json(&app, post_json("/api/v2/predict", r#"{"features": [200, 80, 190]}"#)).await;

    assert_eq!(status, StatusCode::OK);
    let data = &v["data"];
    assert_eq!(data["prediction"], "maize");
    assert_eq!(data["reading"]["nitrogen"], 200);
    assert_eq!(data["recommendation"]["dosage"]["Urea"], 0.0);
    assert_eq!(data["recommendation"]["dosage"]["TSP"], 0.0);
    assert_eq!(data["recommendation"]["dosage"]["MOP"], 0.0);
}

#[tokio::test]
async fn test_v2_predict_bad_input_is_400_envelope() {
    let app = test_app("maize");
    let (status, v) = send_json(&app, post_json("/api/v2/predict", r#"{"features": []}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_v2_recommend_uses_named_crop() {
    // Classifier would say maize; recommend must ignore it.
    let app = test_app("maize");
    let (status, v) = send_json(
        &app,
        post_json("/api/v2/recommend", r#"{"crop": "rice", "features": [175, 200, 100]}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rec = &v["data"]["recommendation"];
    assert_eq!(rec["crop"], "rice");
    assert_eq!(rec["dosage"]["Urea"], 0.0);
    assert_eq!(rec["dosage"]["TSP"], 0.0);
    assert_eq!(rec["dosage"]["MOP"], 48.0);
}

#[tokio::test]
async fn test_v2_recommend_unknown_crop() {
    let app = test_app("maize");
    let (status, v) = send_json(
        &app,
        post_json("/api/v2/recommend", r#"{"crop": "unknown_crop", "features": [10, 10, 10]}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(v["data"]["recommendation"].is_null());
    assert_eq!(
        v["data"]["guidance"],
        "No fertilizer guidance available for unknown_crop"
    );
}

#[tokio::test]
async fn test_v2_crops_lists_targets() {
    let app = test_app("maize");
    let (status, v) = send_json(&app, get("/api/v2/crops")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["maize"]["n"], 197.0);
    assert_eq!(v["data"]["rice"]["k"], 178.0);
}

#[tokio::test]
async fn test_v2_readings_flow() {
    let app = test_app("maize");

    let (status, v) = send_json(&app, get("/api/v2/readings/latest")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"]["code"], "NOT_FOUND");

    for n in 1..=5 {
        let body = format!(r#"{{"nitrogen": {n}, "phosphorus": 1, "potassium": 1}}"#);
        let (status, v) = send_json(&app, post_json("/api/v2/readings", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(v["data"]["nitrogen"], f64::from(n));
    }

    let (status, v) = send_json(&app, get("/api/v2/readings?limit=3")).await;
    assert_eq!(status, StatusCode::OK);
    let n: Vec<f64> = v["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["nitrogen"].as_f64().unwrap())
        .collect();
    assert_eq!(n, vec![5.0, 4.0, 3.0]);

    let (status, v) = send_json(&app, get("/api/v2/readings/latest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["nitrogen"], 5.0);
}

#[tokio::test]
async fn test_v2_readings_store_failure_is_503() {
    let app = create_app(
        test_state("maize", Arc::new(UnreachableStore)),
        &ServerConfig::default(),
    );
    let (status, v) = send_json(&app, get("/api/v2/readings")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["error"]["code"], "SERVICE_UNAVAILABLE");

    let (status, _) = send_json(
        &app,
        post_json("/api/v2/readings", r#"{"nitrogen": 1, "phosphorus": 1, "potassium": 1}"#),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = test_app("maize");
    let (status, v) = send_json(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = ServerConfig {
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let store: Arc<dyn SensorStore> = Arc::new(InMemorySensorStore::default());
    let app = create_app(test_state("maize", store), &server);

    let padding = " ".repeat(256);
    let body = format!(r#"{{"features": [1, 2, 3]{padding}}}"#);
    let (status, _) = send_json(&app, post_json("/api/v2/predict", &body)).await;
    assert!(status.is_client_error(), "got {status}");
}
