//! Authentication extractors.
//!
//! Route handlers declare what they need in their signature:
//!
//! ```rust,ignore
//! async fn me(RequireAuth(account): RequireAuth) -> Json<AccountSummary> {
//!     Json(account.summary())
//! }
//! ```
//!
//! Tokens are read from `Authorization: Bearer <token>`. The role is always
//! taken from the stored account, never from the token claims.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use sweet_shop_core::Role;

use crate::error::{AppError, set_sentry_user};
use crate::models::Account;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
pub struct RequireAuth(pub Account);

/// Extractor that requires a valid bearer token for an admin account.
pub struct RequireAdmin(pub Account);

/// Extractor that resolves the caller if a token is supplied.
///
/// A missing header yields `None`. A header that is present but invalid is
/// still rejected.
pub struct OptionalAuth(pub Option<Account>);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingToken)?;
        Ok(Self(authenticate(state, &token, None).await?))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or(AuthError::MissingToken)?;
        Ok(Self(authenticate(state, &token, Some(Role::Admin)).await?))
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => Ok(Self(Some(authenticate(state, &token, None).await?))),
            None => Ok(Self(None)),
        }
    }
}

/// Pull the token out of the `Authorization` header.
///
/// Returns `Ok(None)` when the header is absent or blank.
fn bearer_token(parts: &Parts) -> Result<Option<String>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)?
        .trim();
    if token.is_empty() {
        return Ok(None);
    }
    Ok(Some(token.to_owned()))
}

/// Resolve the token, requiring the stored role to be `role` when given.
async fn authenticate(
    state: &AppState,
    token: &str,
    role: Option<Role>,
) -> Result<Account, AuthError> {
    let auth = AuthService::new(state.storage(), state.tokens());
    let account = match role {
        Some(role) => auth.require_role(token, role).await.inspect_err(|e| {
            if matches!(e, AuthError::AdminRequired) {
                tracing::warn!("Admin route denied");
            }
        })?,
        None => auth.resolve_session(token).await?,
    };

    Span::current().record("account_id", account.id.as_i32());
    set_sentry_user(&account.id, account.username.as_str());
    Ok(account)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_absent() {
        assert_eq!(bearer_token(&parts(None)).unwrap(), None);
        assert_eq!(bearer_token(&parts(Some("  "))).unwrap(), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))).unwrap(), None);
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(
            bearer_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(),
            Some("abc.def.ghi".to_owned())
        );
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        assert!(matches!(
            bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))),
            Err(AuthError::InvalidToken)
        ));
    }
}
