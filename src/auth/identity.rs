//! Caller identity capability
//!
//! The record layer never sees how a login happened. It only asks "who is
//! calling, if anyone". Anything that can answer that from request headers
//! can stand in as the identity provider.

use hyper::HeaderMap;
use serde::Serialize;

/// The authenticated caller behind a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    /// Stable user id; records are owned by this value
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Resolves the caller of a request, or `None` when unauthenticated
pub trait IdentityProvider: Send + Sync {
    fn current_caller(&self, headers: &HeaderMap) -> Option<CallerIdentity>;
}
