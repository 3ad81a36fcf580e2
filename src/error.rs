//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Errors raised by the cache itself.
///
/// The read path never produces these for a well-formed call; they signal
/// programmer errors (bad key, bad TTL) or misuse of the global instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key is empty or could not be built
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// TTL is zero
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    /// Invalid admin request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Global cache was already initialized
    #[error("Cache already initialized")]
    AlreadyInitialized,
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_)
            | CacheError::InvalidTtl(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::AlreadyInitialized => StatusCode::CONFLICT,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Query Error Enum ==
/// Errors raised by the cached query layer.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Rejected by the cache before the backend was reached
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The hosted backend failed
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    /// A single-row read found nothing
    #[error("{table} not found: {key}")]
    NotFound { table: &'static str, key: String },

    /// Page number or page size below 1
    #[error("Invalid page: page={page}, limit={limit}")]
    InvalidPage { page: u32, limit: u32 },
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
