//! HTTP routes for Skydeck
//!
//! Handlers take an already-buffered `Request<Bytes>` so they can be driven
//! directly from tests without a socket.

pub mod auth_routes;
pub mod feeds;
pub mod health;
pub mod records;

pub use auth_routes::handle_auth_request;
pub use feeds::handle_feed_request;
pub use health::{health_check, version_info};
pub use records::handle_records_request;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::types::SkydeckError;

/// Serialize `body` as a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(json)))
            .unwrap(),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .body(Full::new(Bytes::from_static(
                    br#"{"error":"Failed to serialize response"}"#,
                )))
                .unwrap()
        }
    }
}

/// Response for a `SkydeckError`; server-side failures are logged here
pub fn error_response(err: &SkydeckError) -> Response<Full<Bytes>> {
    if !err.is_client_error() {
        error!(error = %err, "Request failed");
    }
    json_response(err.status_code(), &err.to_json_body())
}

pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "Not Found", "path": path }),
    )
}

pub fn method_not_allowed(allow: &'static str) -> Response<Full<Bytes>> {
    let mut response = json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "message": "Method not allowed" }),
    );
    response
        .headers_mut()
        .insert(hyper::header::ALLOW, hyper::header::HeaderValue::from_static(allow));
    response
}
