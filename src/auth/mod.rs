//! Authentication and authorization for Skydeck
//!
//! Provides:
//! - Session token verification (HS256 JWT minted by the identity provider)
//! - The `IdentityProvider` capability the record service consumes
//! - Shared application API key validation (X-API-Key header)

pub mod api_key;
pub mod identity;
pub mod session;

pub use api_key::{ApiKeyValidator, API_KEY_HEADER};
pub use identity::{CallerIdentity, IdentityProvider};
pub use session::{
    extract_session_cookie, extract_token_from_header, session_cookie, SessionClaims,
    SessionInput, SessionValidator, SESSION_COOKIE,
};
