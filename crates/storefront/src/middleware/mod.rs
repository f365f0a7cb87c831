//! HTTP middleware for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transaction)
//! 2. CORS (only when an origin is configured)
//! 3. `TraceLayer` (request span with `request_id` and `account_id` fields)
//! 4. Request ID (fills the span field and echoes the header)
//!
//! Authentication is done per handler with the extractors in [`auth`].

pub mod auth;
pub mod request_id;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
