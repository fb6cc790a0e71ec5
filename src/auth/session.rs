//! Session tokens
//!
//! The identity provider finishes its login handshake by minting an HS256
//! JWT signed with the shared session secret. Browsers carry it in the
//! `skydeck_session` cookie; scripts may send it as a Bearer token.
//! Skydeck only ever verifies these tokens, except for the dev-mode login.

use hyper::HeaderMap;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::identity::{CallerIdentity, IdentityProvider};
use crate::types::SkydeckError;

/// Cookie holding the session token
pub const SESSION_COOKIE: &str = "skydeck_session";

/// Payload stored in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Stable user id from the identity provider
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Input for minting a session
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Session token verifier (and minter, for dev login and tests)
#[derive(Clone)]
pub struct SessionValidator {
    secret: String,
    expiry_seconds: u64,
}

impl SessionValidator {
    /// Create a new validator
    ///
    /// Returns an error if the secret is empty or too short
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, SkydeckError> {
        if secret.is_empty() {
            return Err(SkydeckError::Config("SESSION_SECRET must not be empty".into()));
        }

        if secret.len() < 32 {
            return Err(SkydeckError::Config(
                "SESSION_SECRET must be at least 32 characters".into(),
            ));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Validator for dev mode
    pub fn new_dev() -> Self {
        Self {
            secret: "dev-mode-session-secret-not-for-production".into(),
            expiry_seconds: 86_400,
        }
    }

    /// Lifetime of minted sessions
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// Mint a session token
    pub fn issue(&self, input: SessionInput) -> Result<String, SkydeckError> {
        let now = unix_now()?;

        let claims = SessionClaims {
            sub: input.user_id,
            name: input.name,
            email: input.email,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| SkydeckError::Internal(format!("Failed to issue session: {}", e)))
    }

    /// Verify and decode a session token
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SkydeckError> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Session expired",
                ErrorKind::InvalidSignature => "Invalid session signature",
                _ => "Invalid session",
            };
            SkydeckError::Unauthorized(reason.into())
        })
    }

    /// Pull a token from the request (cookie first, then Authorization)
    pub fn token_from_headers<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let cookie = headers
            .get_all(hyper::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(extract_session_cookie);

        cookie.or_else(|| {
            extract_token_from_header(
                headers
                    .get(hyper::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok()),
            )
        })
    }
}

impl IdentityProvider for SessionValidator {
    fn current_caller(&self, headers: &HeaderMap) -> Option<CallerIdentity> {
        let token = self.token_from_headers(headers)?;
        match self.verify(token) {
            Ok(claims) if !claims.sub.is_empty() => Some(CallerIdentity {
                id: claims.sub,
                display_name: claims.name,
                email: claims.email,
            }),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                None
            }
        }
    }
}

fn unix_now() -> Result<u64, SkydeckError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| SkydeckError::Internal(format!("System time error: {}", e)))
}

/// Extract a Bearer token from an Authorization header
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Find the session token in a Cookie header value
pub fn extract_session_cookie(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Set-Cookie value for a session; `None` clears it
pub fn session_cookie(token: Option<&str>, max_age_seconds: u64) -> String {
    match token {
        Some(token) => format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, token, max_age_seconds
        ),
        None => format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE),
    }
}
