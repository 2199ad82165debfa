//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Bearer token check (connector routes only)

pub mod auth;
pub mod request_id;

pub use auth::require_api_token;
pub use request_id::request_id_middleware;
