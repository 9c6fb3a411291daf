//! REST API module using Axum
//!
//! Provides HTTP endpoints for sensor probes and the advisory dashboard:
//! - v2 API under `/api/v2` with a consistent `{data, meta}` envelope
//! - legacy flat routes (`/`, `/sensordata`, `/predict`), deprecated in favour of v2

pub mod envelope;
pub mod handlers;
pub mod middleware;
pub mod prediction;
mod routes;
pub mod v2_handlers;
mod v2_routes;

pub use handlers::AppState;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method, Uri};
use axum::middleware as axum_mw;
use axum::response::Response;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use envelope::ApiErrorResponse;

async fn not_found(uri: Uri) -> Response {
    ApiErrorResponse::not_found(format!("No route for {}", uri.path()))
}

/// Build the CORS layer from `[server].cors_origins`.
///
/// `"*"` allows any origin. Otherwise only the listed origins are allowed;
/// an empty list means same-origin only.
fn build_cors_layer(server: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if server.allows_any_origin() {
        tracing::info!("CORS: allowing any origin");
        return cors.allow_origin(Any);
    }

    for origin in server.rejected_origins() {
        tracing::warn!(origin, "CORS: ignoring origin that is not a valid header value");
    }
    let allowed: Vec<_> = server
        .cors_origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    tracing::info!(origins = ?server.cors_origins, "CORS: allowing configured origins");
    cors.allow_origin(allowed)
}

/// Create the complete application router.
pub fn create_app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        // v2 API (primary)
        .nest("/api/v2", v2_routes::v2_api_routes(state.clone()))
        // Legacy flat routes (adds Deprecation + Link headers)
        .merge(
            routes::legacy_routes(state)
                .layer(axum_mw::from_fn(middleware::add_legacy_deprecation_headers)),
        )
        .fallback(not_found)
        // Middleware
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(server))
}
