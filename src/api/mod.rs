//! API Module
//!
//! HTTP handlers and routing for the cache admin API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /monitoring/cache` - Counters, hit rate, and entry census
//! - `DELETE /cache/keys/:key` - Delete one key
//! - `POST /cache/invalidate` - Delete every key under a prefix
//! - `DELETE /cache` - Clear everything

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
