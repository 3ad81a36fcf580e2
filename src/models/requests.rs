//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for prefix invalidation (POST /cache/invalidate)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// Every key starting with this string is removed
    pub prefix: String,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.prefix.is_empty() {
            return Some("Prefix cannot be empty; use DELETE /cache to clear everything".to_string());
        }
        None
    }
}
