//! Authentication service.
//!
//! Password registration and login, plus resolution of bearer tokens into
//! the acting account.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use tracing::instrument;

use sweet_shop_core::{Email, Role, Username, UsernameError};

use crate::db::accounts::USERNAME_FIELD;
use crate::db::{RepositoryError, Storage};
use crate::models::{Account, NewAccount};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;
/// Maximum password length, bounding hashing cost.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Registration request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Login request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A freshly issued token and the account it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub account: Account,
}

/// Authentication service.
pub struct AuthService<'a> {
    storage: &'a dyn Storage,
    tokens: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(storage: &'a dyn Storage, tokens: &'a TokenSigner) -> Self {
        Self { storage, tokens }
    }

    /// Register a new account and issue its first token.
    ///
    /// `actor` is the already-authenticated caller, if any. Only an admin
    /// actor may create another admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingInput` if a required field is blank.
    /// Returns `AuthError::Validation` listing every violated constraint.
    /// Returns `AuthError::AdminGrantDenied` for an unauthorized admin request.
    /// Returns `AuthError::EmailTaken` or `AuthError::UsernameTaken` on conflict.
    #[instrument(skip_all, fields(username = ?registration.username))]
    pub async fn register(
        &self,
        registration: &Registration,
        actor: Option<&Account>,
    ) -> Result<Session, AuthError> {
        let (Some(username), Some(email), Some(password)) = (
            present(registration.username.as_deref()),
            present(registration.email.as_deref()),
            present(registration.password.as_deref()),
        ) else {
            return Err(AuthError::MissingInput(
                "Please provide username, email, and password.",
            ));
        };

        let mut problems = Vec::new();
        let username = Username::parse(username)
            .map_err(|e| problems.push(username_message(&e)))
            .ok();
        let email = Email::parse(email)
            .map_err(|_| problems.push("Please provide a valid email".to_owned()))
            .ok();
        if let Err(message) = validate_password(password) {
            problems.push(message);
        }
        let role = match present(registration.role.as_deref()) {
            None => Some(Role::User),
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|_| problems.push("Role must be either user or admin".to_owned()))
                .ok(),
        };

        let (Some(username), Some(email), Some(role)) = (username, email, role) else {
            return Err(AuthError::Validation(problems));
        };
        if !problems.is_empty() {
            return Err(AuthError::Validation(problems));
        }

        if role.is_admin() && !actor.is_some_and(Account::is_admin) {
            tracing::warn!("Rejected admin self-registration");
            return Err(AuthError::AdminGrantDenied);
        }

        let account = create_account(self.storage, username, email, password, role).await?;
        let token = self.tokens.issue(&account)?;

        tracing::info!(account_id = %account.id, role = %account.role, "Account registered");
        Ok(Session { token, account })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingInput` if either field is blank.
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong. The two cases are indistinguishable to the caller.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let (Some(email), Some(password)) = (
            present(credentials.email.as_deref()),
            present(credentials.password.as_deref()),
        ) else {
            return Err(AuthError::MissingInput("Please provide email and password."));
        };

        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (account, password_hash) = self
            .storage
            .credentials_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(&account)?;
        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(Session { token, account })
    }

    /// Resolve a bearer token to the stored account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` / `AuthError::TokenExpired` if the
    /// token does not verify, and `AuthError::AccountGone` if its account no
    /// longer exists.
    pub async fn resolve_session(&self, token: &str) -> Result<Account, AuthError> {
        let claims = self.tokens.verify(token)?;
        let account_id = claims.account_id()?;

        self.storage
            .account_by_id(account_id)
            .await?
            .ok_or(AuthError::AccountGone)
    }

    /// Resolve a token and require the stored role to be `role`.
    ///
    /// # Errors
    ///
    /// As [`Self::resolve_session`], plus `AuthError::AdminRequired` when the
    /// role does not match.
    pub async fn require_role(&self, token: &str, role: Role) -> Result<Account, AuthError> {
        let account = self.resolve_session(token).await?;
        if account.role != role {
            return Err(AuthError::AdminRequired);
        }
        Ok(account)
    }
}

/// Trimmed value, or `None` if absent or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn username_message(error: &UsernameError) -> String {
    match error {
        UsernameError::TooShort { min } => format!("Username must be at least {min} characters"),
        UsernameError::TooLong { max } => format!("Username must be at most {max} characters"),
        UsernameError::InvalidCharacter => {
            "Username may only contain letters, digits, '_', '-' and '.'".to_owned()
        }
    }
}

/// Store an account with a freshly hashed password.
///
/// Bypasses the admin gate; callers are trusted (registration after the
/// gate, or the CLI).
///
/// # Errors
///
/// Returns `AuthError::EmailTaken`, `AuthError::UsernameTaken`,
/// `AuthError::PasswordHash` or `AuthError::Repository`.
pub async fn create_account(
    storage: &dyn Storage,
    username: Username,
    email: Email,
    password: &str,
    role: Role,
) -> Result<Account, AuthError> {
    let password_hash = hash_password(password)?;

    storage
        .insert_account(NewAccount {
            username,
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(field) if field == USERNAME_FIELD => AuthError::UsernameTaken,
            RepositoryError::Conflict(_) => AuthError::EmailTaken,
            other => AuthError::Repository(other),
        })
}

/// Validate password length.
///
/// # Errors
///
/// Returns the client-facing message for a password that is too short or
/// too long.
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::memory::MemoryStore;
    use chrono::Duration;
    use secrecy::SecretString;

    fn signer() -> TokenSigner {
        TokenSigner::new(&AuthConfig {
            jwt_secret: SecretString::from("k3#Lq9!vB2@mZ7$wX4%nR8^tY1&pC6*d"),
            token_ttl: Duration::days(7),
        })
    }

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: Some(username.to_owned()),
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
            role: None,
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("gumdrops").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("gumdrops", &hash).is_ok());
        assert!(matches!(
            verify_password("licorice", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        let session = auth
            .register(&registration("fudge", "Fudge@Example.com", "caramel1"), None)
            .await
            .unwrap();
        assert_eq!(session.account.email.as_str(), "fudge@example.com");
        assert_eq!(session.account.role, Role::User);

        let login = auth
            .login(&Credentials {
                email: Some("fudge@example.com".to_owned()),
                password: Some("caramel1".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(login.account.id, session.account.id);

        let resolved = auth.resolve_session(&login.token).await.unwrap();
        assert_eq!(resolved.username.as_str(), "fudge");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        auth.register(&registration("first", "dup@example.com", "secret1"), None)
            .await
            .unwrap();
        let err = auth
            .register(&registration("second", "DUP@example.com", "secret1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));

        let err = auth
            .register(&registration("first", "other@example.com", "secret1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
    }

    #[tokio::test]
    async fn test_login_failures_are_identical() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);
        auth.register(&registration("nougat", "nougat@example.com", "almond1"), None)
            .await
            .unwrap();

        let unknown = auth
            .login(&Credentials {
                email: Some("ghost@example.com".to_owned()),
                password: Some("almond1".to_owned()),
            })
            .await
            .unwrap_err();
        let wrong = auth
            .login(&Credentials {
                email: Some("nougat@example.com".to_owned()),
                password: Some("walnut1".to_owned()),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown.client_message(), wrong.client_message());
        assert_eq!(
            wrong.client_message().unwrap(),
            "Invalid email or password."
        );
    }

    #[tokio::test]
    async fn test_missing_and_invalid_fields() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        let err = auth
            .register(&registration("  ", "a@b.co", "secret1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingInput(_)));

        let err = auth
            .register(&registration("ab", "not-an-email", "123"), None)
            .await
            .unwrap_err();
        let AuthError::Validation(problems) = err else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 3);
    }

    #[tokio::test]
    async fn test_admin_registration_is_gated() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        let mut request = registration("boss", "boss@example.com", "secret1");
        request.role = Some("admin".to_owned());
        let err = auth.register(&request, None).await.unwrap_err();
        assert!(matches!(err, AuthError::AdminGrantDenied));

        let admin = create_account(
            &store,
            Username::parse("root").unwrap(),
            Email::parse("root@example.com").unwrap(),
            "secret1",
            Role::Admin,
        )
        .await
        .unwrap();
        let session = auth.register(&request, Some(&admin)).await.unwrap();
        assert_eq!(session.account.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_require_role_uses_stored_role() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        let session = auth
            .register(&registration("plain", "plain@example.com", "secret1"), None)
            .await
            .unwrap();
        let err = auth
            .require_role(&session.token, Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AdminRequired));
        assert!(auth.require_role(&session.token, Role::User).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_for_missing_account() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        let other = MemoryStore::new();
        let session = AuthService::new(&other, &tokens)
            .register(&registration("ghost", "ghost@example.com", "secret1"), None)
            .await
            .unwrap();
        // Fresh store has no account 1.
        let err = auth.resolve_session(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::AccountGone));
    }
}
