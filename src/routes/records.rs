//! Records endpoints
//!
//! - GET    /api/records       - newest records of the caller
//! - POST   /api/records       - save a snapshot
//! - PUT    /api/records/{id}  - replace or merge a snapshot
//! - DELETE /api/records/{id}  - remove a snapshot
//!
//! All four need a session and the X-API-Key header.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};
use tracing::debug;

use super::{error_response, json_response, method_not_allowed};
use crate::auth::API_KEY_HEADER;
use crate::records::{Owner, RecordPayload};
use crate::server::AppState;
use crate::types::{Result, SkydeckError};

const RECORDS_PREFIX: &str = "/api/records";

/// Which records resource a path names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordsPath<'a> {
    Collection,
    Item(&'a str),
}

fn match_path(path: &str) -> Option<RecordsPath<'_>> {
    let rest = path.strip_prefix(RECORDS_PREFIX)?;
    match rest {
        "" | "/" => Some(RecordsPath::Collection),
        _ => {
            let id = rest.strip_prefix('/')?.trim_end_matches('/');
            if id.is_empty() || id.contains('/') {
                None
            } else {
                Some(RecordsPath::Item(id))
            }
        }
    }
}

/// Handle /api/records*; `None` when the path is not a records path
pub async fn handle_records_request(
    state: &AppState,
    req: &Request<Bytes>,
) -> Option<Response<Full<Bytes>>> {
    let target = match_path(req.uri().path())?;

    let allowed = match (target, req.method()) {
        (RecordsPath::Collection, &Method::GET | &Method::POST) => true,
        (RecordsPath::Item(_), &Method::PUT | &Method::DELETE) => true,
        _ => false,
    };
    if !allowed {
        return Some(method_not_allowed(match target {
            RecordsPath::Collection => "GET, POST, OPTIONS",
            RecordsPath::Item(_) => "PUT, DELETE, OPTIONS",
        }));
    }

    let response = match dispatch(state, req, target).await {
        Ok(response) => response,
        Err(e) => error_response(&e),
    };
    Some(response)
}

async fn dispatch(
    state: &AppState,
    req: &Request<Bytes>,
    target: RecordsPath<'_>,
) -> Result<Response<Full<Bytes>>> {
    let owner = authorize(state, req)?;
    let service = &state.records;

    match (target, req.method()) {
        (RecordsPath::Collection, &Method::GET) => {
            let records = service.list(&owner).await?;
            Ok(json_response(StatusCode::OK, &records))
        }
        (RecordsPath::Collection, _) => {
            let payload = parse_payload(req.body())?;
            let record = service.create(&owner, payload).await?;
            Ok(json_response(StatusCode::OK, &record))
        }
        (RecordsPath::Item(id), &Method::PUT) => {
            let payload = parse_payload(req.body())?;
            let record = service.update(&owner, id, payload).await?;
            Ok(json_response(StatusCode::OK, &record))
        }
        (RecordsPath::Item(id), _) => {
            let deleted = service.delete(&owner, id).await?;
            Ok(json_response(StatusCode::OK, &deleted))
        }
    }
}

fn authorize(state: &AppState, req: &Request<Bytes>) -> Result<Owner> {
    let caller = state.identity.current_caller(req.headers());
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    state.records.authorize(caller.as_ref(), api_key)
}

fn parse_payload(body: &Bytes) -> Result<RecordPayload> {
    RecordPayload::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejected record body");
        SkydeckError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_path() {
        assert_eq!(match_path("/api/records"), Some(RecordsPath::Collection));
        assert_eq!(match_path("/api/records/"), Some(RecordsPath::Collection));
        assert_eq!(
            match_path("/api/records/665f1c2e9b1e8a3d4c5b6a79"),
            Some(RecordsPath::Item("665f1c2e9b1e8a3d4c5b6a79"))
        );
        assert_eq!(match_path("/api/records/abc/"), Some(RecordsPath::Item("abc")));
        assert_eq!(match_path("/api/records/abc/def"), None);
        assert_eq!(match_path("/api/recordsx"), None);
        assert_eq!(match_path("/api/proxy/nasa"), None);
    }
}
