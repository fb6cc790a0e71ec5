//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Bodies are buffered
//! (capped at `MAX_BODY_BYTES`) before routing, so every handler works on
//! a `Request<Bytes>`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{IdentityProvider, SessionValidator};
use crate::config::Args;
use crate::feeds::FeedClient;
use crate::records::{RecordService, RecordStore};
use crate::routes;
use crate::types::SkydeckError;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, X-API-Key";

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub records: RecordService,
    /// Resolves the caller of a request from its session
    pub identity: Arc<dyn IdentityProvider>,
    /// Mints sessions for dev login
    pub sessions: SessionValidator,
    pub feeds: FeedClient,
}

impl AppState {
    /// Wire up state from configuration and a record store
    pub fn new(args: Args, store: Arc<dyn RecordStore>) -> Result<Self, SkydeckError> {
        let sessions = args.session_validator()?;
        let records = RecordService::new(store, args.record_service_config());
        let feeds = FeedClient::new(args.feed_config());

        Ok(Self {
            identity: Arc::new(sessions.clone()),
            sessions,
            records,
            feeds,
            args,
        })
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), SkydeckError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Skydeck listening on {} (store: {})",
        state.args.listen,
        state.records.store().backend_name()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - dev login available, default secrets allowed");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Buffer the body and hand off to `dispatch`
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    info!("[{}] {} {}", addr, req.method(), req.uri().path());

    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                SkydeckError::PayloadTooLarge("Request body too large".into())
            } else {
                debug!("Failed to read request body: {}", e);
                SkydeckError::BadRequest("Failed to read request body".into())
            };
            return Ok(with_cors(
                routes::error_response(&err),
                &state.args.frontend_url,
            ));
        }
    };

    Ok(dispatch(state, Request::from_parts(parts, body)).await)
}

/// Route a buffered request
pub async fn dispatch(state: Arc<AppState>, req: Request<Bytes>) -> Response<Full<Bytes>> {
    let response = route(&state, &req).await;
    with_cors(response, &state.args.frontend_url)
}

async fn route(state: &AppState, req: &Request<Bytes>) -> Response<Full<Bytes>> {
    let path = req.uri().path();

    if req.method() == Method::OPTIONS {
        return preflight_response();
    }

    match (req.method(), path) {
        (&Method::GET, "/health" | "/healthz") => return routes::health_check(state),
        (&Method::GET, "/version") => return routes::version_info(),
        _ => {}
    }

    if path.starts_with("/auth/") {
        if let Some(response) = routes::handle_auth_request(state, req) {
            return response;
        }
    }

    if path.starts_with("/api/records") {
        if let Some(response) = routes::handle_records_request(state, req).await {
            return response;
        }
    }

    if path.starts_with("/api/proxy/") {
        if let Some(response) = routes::handle_feed_request(state, req).await {
            return response;
        }
    }

    routes::not_found_response(path)
}

/// Credentialed CORS for the configured frontend
fn with_cors(mut response: Response<Full<Bytes>>, origin: &str) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    if let Ok(origin) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    response
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS)
        .header(header::ACCESS_CONTROL_MAX_AGE, "600")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
