//! Health and build info endpoints
//!
//! - /health, /healthz - liveness probe, always 200 while the process serves
//! - /version          - build info captured by build.rs

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// "development" or "production"
    pub mode: &'static str,
    /// Record store backend in use
    pub store: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub commit_full: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

pub fn build_health_response(state: &AppState) -> HealthResponse {
    HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        mode: if state.args.dev_mode {
            "development"
        } else {
            "production"
        },
        store: state.records.store().backend_name(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Handle liveness probe (/health, /healthz)
pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &build_health_response(state))
}

/// Handle /version
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        commit_full: option_env!("GIT_COMMIT_FULL").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "skydeck",
    };
    json_response(StatusCode::OK, &response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let response = version_info();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_version_fields() {
        let body = serde_json::to_value(VersionResponse {
            version: "0.1.0",
            commit: "abc1234",
            commit_full: "abc1234def",
            build_time: "2024-01-01T00:00:00Z",
            service: "skydeck",
        })
        .unwrap();
        assert_eq!(body["commitFull"], "abc1234def");
        assert_eq!(body["buildTime"], "2024-01-01T00:00:00Z");
    }
}
