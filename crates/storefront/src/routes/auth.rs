//! Authentication route handlers.
//!
//! Registration and login return a bearer token together with the public
//! account summary.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Serialize;
use tracing::instrument;

use super::ApiResponse;
use crate::error::Result;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::AccountSummary;
use crate::services::auth::{AuthService, Credentials, Registration, Session};
use crate::state::AppState;

/// Token plus the account it was issued for.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub token: String,
    pub user: AccountSummary,
}

impl From<Session> for SessionBody {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user: session.account.summary(),
        }
    }
}

/// Current-account body.
#[derive(Debug, Serialize)]
pub struct MeBody {
    pub user: AccountSummary,
}

/// Register a new account.
///
/// POST /api/auth/register
///
/// An admin role may only be requested with an admin bearer token.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    OptionalAuth(actor): OptionalAuth,
    body: std::result::Result<Json<Registration>, JsonRejection>,
) -> Result<ApiResponse<SessionBody>> {
    let Json(registration) = body?;
    let session = AuthService::new(state.storage(), state.tokens())
        .register(&registration, actor.as_ref())
        .await?;

    Ok(ApiResponse::created(SessionBody::from(session)).message("User registered successfully"))
}

/// Log in with email and password.
///
/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<ApiResponse<SessionBody>> {
    let Json(credentials) = body?;
    let session = AuthService::new(state.storage(), state.tokens())
        .login(&credentials)
        .await?;

    Ok(ApiResponse::ok(SessionBody::from(session)).message("Login successful"))
}

/// Return the authenticated account.
///
/// GET /api/auth/me
pub async fn me(RequireAuth(account): RequireAuth) -> ApiResponse<MeBody> {
    ApiResponse::ok(MeBody {
        user: account.summary(),
    })
}
