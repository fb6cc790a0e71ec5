//! Error types for Skydeck

use hyper::StatusCode;

/// Main error type for Skydeck operations
#[derive(Debug, thiserror::Error)]
pub enum SkydeckError {
    /// Payload carried nothing worth persisting
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SkydeckError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for errors the caller caused (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// JSON body for an HTTP response.
    ///
    /// Client errors carry `message`, server errors carry `error`, matching
    /// what the dashboard client reads.
    pub fn to_json_body(&self) -> serde_json::Value {
        match self {
            Self::Store(msg) => serde_json::json!({ "error": format!("Server error: {}", msg) }),
            Self::Upstream(msg) => serde_json::json!({ "error": msg }),
            e if e.is_client_error() => serde_json::json!({ "message": e.to_string() }),
            e => serde_json::json!({ "error": e.to_string() }),
        }
    }
}

impl From<std::io::Error> for SkydeckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for SkydeckError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("Invalid JSON: {}", err))
    }
}

impl From<hyper::Error> for SkydeckError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<mongodb::error::Error> for SkydeckError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<bson::ser::Error> for SkydeckError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Store(format!("BSON encode failed: {}", err))
    }
}

impl From<bson::de::Error> for SkydeckError {
    fn from(err: bson::de::Error) -> Self {
        Self::Store(format!("BSON decode failed: {}", err))
    }
}

impl From<reqwest::Error> for SkydeckError {
    fn from(err: reqwest::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for SkydeckError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("Session error: {}", err))
    }
}

/// Result type alias for Skydeck operations
pub type Result<T> = std::result::Result<T, SkydeckError>;
