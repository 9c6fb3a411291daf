//! API middleware layers.
//!
//! Currently provides deprecation headers for the legacy flat routes
//! (`/predict`, `/sensordata`), whose successor is `/api/v2`.

use axum::http::header::{HeaderName, LINK};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// Axum middleware that adds RFC 8594 deprecation headers to legacy responses.
///
/// - `Deprecation: true`
/// - `Link: </api/v2>; rel="successor-version"`
pub async fn add_legacy_deprecation_headers(
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("deprecation"),
        HeaderValue::from_static("true"),
    );
    headers.insert(
        LINK,
        HeaderValue::from_static("</api/v2>; rel=\"successor-version\""),
    );

    response
}
