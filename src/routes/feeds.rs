//! Feed proxy endpoints
//!
//! - GET /api/proxy/nasa?count=N
//! - GET /api/proxy/weather?city=X
//! - GET /api/proxy/news
//!
//! Open to anyone; the upstream keys never leave the server.

use std::collections::HashMap;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};

use super::{json_response, method_not_allowed};
use crate::feeds::FeedError;
use crate::server::AppState;

const FEEDS_PREFIX: &str = "/api/proxy/";

/// Handle /api/proxy/*; `None` for unknown feeds
pub async fn handle_feed_request(
    state: &AppState,
    req: &Request<Bytes>,
) -> Option<Response<Full<Bytes>>> {
    let feed = req.uri().path().strip_prefix(FEEDS_PREFIX)?;
    if !matches!(feed, "nasa" | "weather" | "news") {
        return None;
    }
    if req.method() != Method::GET {
        return Some(method_not_allowed("GET, OPTIONS"));
    }

    let query = parse_query(req.uri().query());
    let feeds = &state.feeds;

    let result = match feed {
        "nasa" => feeds.nasa(query.get("count").map(String::as_str)).await,
        "weather" => feeds.weather(query.get("city").map(String::as_str)).await,
        _ => feeds.news().await,
    };

    Some(match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => feed_error_response(&e),
    })
}

fn feed_error_response(err: &FeedError) -> Response<Full<Bytes>> {
    json_response(err.status_code(), &err.to_json_body())
}

/// Decode a query string; malformed input reads as no parameters
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .and_then(|q| serde_urlencoded::from_str(q).ok())
        .unwrap_or_default()
}
