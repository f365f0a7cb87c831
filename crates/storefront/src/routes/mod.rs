//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness
//! GET    /health/ready               - Readiness (storage ping)
//!
//! # Auth
//! POST   /api/auth/register          - Create account, returns token
//! POST   /api/auth/login             - Exchange credentials for token
//! GET    /api/auth/me                - Current account (auth)
//!
//! # Catalog
//! GET    /api/sweets                 - List with optional filters
//! GET    /api/sweets/search          - Same, echoing the query
//! POST   /api/sweets                 - Create (auth)
//! GET    /api/sweets/{id}            - Detail
//! PUT    /api/sweets/{id}            - Update (owner or admin)
//! DELETE /api/sweets/{id}            - Delete (admin)
//! POST   /api/sweets/{id}/purchase   - Direct purchase (auth)
//! POST   /api/sweets/{id}/restock    - Restock (admin)
//! POST   /api/purchase               - Legacy direct purchase (auth)
//!
//! # Cart (auth)
//! GET    /api/cart                   - Current cart
//! POST   /api/cart                   - Add item
//! DELETE /api/cart                   - Clear
//! PUT    /api/cart/{sweetId}         - Set line quantity (0 removes)
//! DELETE /api/cart/{sweetId}         - Remove line
//! POST   /api/cart/checkout          - Buy everything in the cart
//! ```

pub mod auth;
pub mod cart;
pub mod sweets;

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use sweet_shop_core::SweetId;

use crate::error::Result;
use crate::services::catalog::parse_sweet_id;
use crate::state::AppState;

/// Success envelope: `{"success": true, "data": ..., "message"?: ..., "count"?: ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<serde_json::Value>,
    data: T,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            query: None,
            data,
            status: StatusCode::OK,
        }
    }

    pub const fn created(data: T) -> Self {
        let mut response = Self::ok(data);
        response.status = StatusCode::CREATED;
        response
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn query(mut self, query: serde_json::Value) -> Self {
        self.query = Some(query);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// A sweet ID as sent in a JSON body, either `7` or `"7"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Number(i64),
    Text(String),
}

impl IdInput {
    /// Validate into a [`SweetId`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidInput` if the value is not a positive ID.
    pub fn sweet_id(&self) -> Result<SweetId> {
        match self {
            Self::Number(n) => parse_sweet_id(&n.to_string()),
            Self::Text(s) => parse_sweet_id(s),
        }
    }
}

/// Body extractor result for handlers that take an optional JSON body.
pub type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Unwrap a JSON body, treating a request without one as `T::default()`.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` for a body that is present but malformed.
pub fn json_or_default<T: Default>(body: JsonBody<T>) -> Result<T> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the sweets routes router.
pub fn sweet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sweets::index).post(sweets::create))
        .route("/search", get(sweets::search))
        .route(
            "/{id}",
            get(sweets::show).put(sweets::update).delete(sweets::destroy),
        )
        .route("/{id}/purchase", post(sweets::purchase))
        .route("/{id}/restock", post(sweets::restock))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/checkout", post(cart::checkout))
        .route("/{sweet_id}", put(cart::update).delete(cart::remove))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/sweets", sweet_routes())
        .nest("/api/cart", cart_routes())
        .route("/api/purchase", post(sweets::legacy_purchase))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2]).count(2)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert!(json.get("message").is_none());
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_id_input_forms() {
        let number: IdInput = serde_json::from_str("7").unwrap();
        let text: IdInput = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(number.sweet_id().unwrap(), SweetId::new(7));
        assert_eq!(text.sweet_id().unwrap(), SweetId::new(7));

        let bad: IdInput = serde_json::from_str("\"abc\"").unwrap();
        assert!(bad.sweet_id().is_err());
        let negative: IdInput = serde_json::from_str("-3").unwrap();
        assert!(negative.sweet_id().is_err());
    }
}
