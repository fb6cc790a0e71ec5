//! Session endpoints
//!
//! - GET  /auth/user      - who the session belongs to
//! - GET  /auth/logout    - clear the session cookie, back to the frontend
//! - POST /auth/dev-login - mint a session without the external handshake (dev mode only)

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, LOCATION, SET_COOKIE};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::{error_response, json_response, method_not_allowed, not_found_response};
use crate::auth::{session_cookie, SessionInput};
use crate::server::AppState;
use crate::types::SkydeckError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevLoginRequest {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Handle /auth/*; `None` for paths that are not session endpoints
pub fn handle_auth_request(state: &AppState, req: &Request<Bytes>) -> Option<Response<Full<Bytes>>> {
    let path = req.uri().path();
    let response = match path {
        "/auth/user" => match *req.method() {
            Method::GET => handle_user(state, req),
            _ => method_not_allowed("GET, OPTIONS"),
        },
        "/auth/logout" => match *req.method() {
            Method::GET => handle_logout(state),
            _ => method_not_allowed("GET, OPTIONS"),
        },
        "/auth/dev-login" if !state.args.dev_mode => not_found_response(path),
        "/auth/dev-login" => match *req.method() {
            Method::POST => handle_dev_login(state, req.body()),
            _ => method_not_allowed("POST, OPTIONS"),
        },
        _ => return None,
    };
    Some(response)
}

fn handle_user(state: &AppState, req: &Request<Bytes>) -> Response<Full<Bytes>> {
    match state.identity.current_caller(req.headers()) {
        Some(caller) => {
            info!(user = %caller.id, "Session check - authenticated");
            json_response(StatusCode::OK, &caller)
        }
        None => json_response(
            StatusCode::UNAUTHORIZED,
            &serde_json::json!({ "message": "Not logged in" }),
        ),
    }
}

fn handle_logout(state: &AppState) -> Response<Full<Bytes>> {
    let mut response = Response::builder()
        .status(StatusCode::FOUND)
        .body(Full::new(Bytes::new()))
        .unwrap();

    if let Ok(location) = HeaderValue::from_str(&state.args.frontend_url) {
        response.headers_mut().insert(LOCATION, location);
    }
    if let Ok(cookie) = HeaderValue::from_str(&session_cookie(None, 0)) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

fn handle_dev_login(state: &AppState, body: &Bytes) -> Response<Full<Bytes>> {
    let request: DevLoginRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => return error_response(&SkydeckError::from(e)),
    };
    if request.user_id.trim().is_empty() {
        return error_response(&SkydeckError::BadRequest("userId is required".into()));
    }

    let token = match state.sessions.issue(SessionInput {
        user_id: request.user_id.clone(),
        name: request.name.clone(),
        email: request.email.clone(),
    }) {
        Ok(token) => token,
        Err(e) => return error_response(&e),
    };

    warn!(user = %request.user_id, "Dev login issued a session");

    let mut response = json_response(
        StatusCode::OK,
        &serde_json::json!({
            "id": request.user_id,
            "displayName": request.name,
            "email": request.email,
            "token": token,
        }),
    );
    let cookie = session_cookie(Some(&token), state.sessions.expiry_seconds());
    if let Ok(cookie) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}
