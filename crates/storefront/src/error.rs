//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`, and every failure is rendered as the JSON envelope
//! `{"success": false, "error": "...", "details": ...}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::StockShortfall;
use crate::services::auth::AuthError;

/// Message returned to clients for any server-side failure.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// What was short when a stock check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockProblem {
    /// A single sweet, from a direct purchase or cart edit.
    Single {
        available: i32,
        requested: i32,
        /// Units already in the cart, for cart edits.
        in_cart: Option<i32>,
    },
    /// One entry per failing cart line at checkout.
    Lines(Vec<StockShortfall>),
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Missing or malformed input.
    #[error("{0}")]
    InvalidInput(String),

    /// Input present but violating field constraints.
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Caller is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness conflict.
    #[error("{0}")]
    Conflict(String),

    /// Not enough units on hand.
    #[error("Insufficient stock")]
    InsufficientStock(StockProblem),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::MissingInput(_) | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::AccountGone => StatusCode::UNAUTHORIZED,
                AuthError::AdminRequired | AuthError::AdminGrantDenied => StatusCode::FORBIDDEN,
                AuthError::EmailTaken | AuthError::UsernameTaken => StatusCode::CONFLICT,
                AuthError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::Signing(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::InvalidInput(_) | Self::Validation(_) | Self::InsufficientStock(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Build the client-facing body. Server errors never leak details.
    fn body(&self) -> ErrorBody {
        let mut body = ErrorBody::new(INTERNAL_MESSAGE);
        match self {
            Self::Database(RepositoryError::NotFound) => body.error = "Not found".to_owned(),
            Self::Database(RepositoryError::Conflict(field)) => {
                body.error = format!("{field} already exists");
            }
            Self::Database(_) | Self::Internal(_) => {}
            Self::Auth(err) => {
                if let Some(message) = err.client_message() {
                    body.error = message;
                }
                if let AuthError::Validation(messages) = err {
                    body.details = Some(serde_json::json!(messages));
                }
            }
            Self::Validation(messages) => {
                body.error = "Validation failed".to_owned();
                body.details = Some(serde_json::json!(messages));
            }
            Self::InsufficientStock(StockProblem::Single {
                available,
                requested,
                in_cart,
            }) => {
                body.error = "Insufficient stock.".to_owned();
                body.available = Some(*available);
                body.requested = Some(*requested);
                body.in_cart = *in_cart;
            }
            Self::InsufficientStock(StockProblem::Lines(lines)) => {
                body.error = "Some items have insufficient stock".to_owned();
                body.details = serde_json::to_value(lines).ok();
            }
            Self::InvalidInput(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message) => body.error.clone_from(message),
        }
        body
    }
}

/// Failure envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_cart: Option<i32>,
}

impl ErrorBody {
    fn new(error: &str) -> Self {
        Self {
            success: false,
            error: error.to_owned(),
            details: None,
            available: None,
            requested: None,
            in_cart: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidInput(format!("Invalid query: {}", rejection.body_text()))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Called after the bearer token resolves, so errors are associated with the
/// acting account.
pub fn set_sentry_user(account_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            username: Some(username.to_owned()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("sweet_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
