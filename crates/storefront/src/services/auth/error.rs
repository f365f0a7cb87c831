//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was missing or blank.
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// One or more fields failed validation.
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("email already registered")]
    EmailTaken,

    /// Username already taken.
    #[error("username already taken")]
    UsernameTaken,

    /// No bearer token on the request.
    #[error("no token provided")]
    MissingToken,

    /// Token malformed or signature invalid.
    #[error("invalid token")]
    InvalidToken,

    /// Token past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Token is valid but its account no longer exists.
    #[error("account no longer exists")]
    AccountGone,

    /// Caller is not an admin.
    #[error("admin privileges required")]
    AdminRequired,

    /// Non-admin asked to register an admin account.
    #[error("admin accounts can only be created by an admin")]
    AdminGrantDenied,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token could not be signed.
    #[error("token signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Message shown to clients, or `None` for server-side failures.
    #[must_use]
    pub fn client_message(&self) -> Option<String> {
        let message = match self {
            Self::MissingInput(message) => *message,
            Self::Validation(_) => "Validation failed",
            Self::InvalidCredentials => "Invalid email or password.",
            Self::EmailTaken => "Email already registered.",
            Self::UsernameTaken => "Username already taken.",
            Self::MissingToken => "Access denied. No token provided.",
            Self::InvalidToken => "Invalid token.",
            Self::TokenExpired => "Token expired. Please log in again.",
            Self::AccountGone => "Account no longer exists.",
            Self::AdminRequired => "Access denied. Admin privileges required.",
            Self::AdminGrantDenied => "Only an admin can create admin accounts.",
            Self::Repository(RepositoryError::NotFound) => "Not found",
            Self::Repository(_) | Self::PasswordHash | Self::Signing(_) => return None,
        };
        Some(message.to_owned())
    }
}
