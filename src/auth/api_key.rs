//! Application API key check
//!
//! Every records call carries a shared key in the X-API-Key header in
//! addition to the caller's session. The key identifies the dashboard
//! deployment, not the user.

/// Header carrying the application key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Validates the shared application key
#[derive(Debug, Clone)]
pub struct ApiKeyValidator {
    expected: Option<String>,
}

impl ApiKeyValidator {
    /// Create a validator; an empty key counts as unconfigured
    pub fn new(expected: Option<String>) -> Self {
        Self {
            expected: expected.filter(|k| !k.is_empty()),
        }
    }

    /// Check if a key is configured at all
    pub fn is_configured(&self) -> bool {
        self.expected.is_some()
    }

    /// Exact match against the configured key.
    ///
    /// With no key configured nothing is accepted.
    pub fn is_valid(&self, presented: Option<&str>) -> bool {
        match (&self.expected, presented) {
            (Some(expected), Some(presented)) => constant_time_compare(presented, expected),
            _ => false,
        }
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
