//! Account domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use sweet_shop_core::{AccountId, Email, Role, Username};

/// A registered shop account (domain type).
///
/// The password hash is deliberately absent; it is only ever read alongside
/// the account during login.
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Unique display name.
    pub username: Username,
    /// Unique, lower-cased email address.
    pub email: Email,
    /// Role used for authorization decisions.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Public view of the account returned by the auth endpoints.
    #[must_use]
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Account fields safe to return to clients.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: AccountId,
    pub username: Username,
    pub email: Email,
    pub role: Role,
}

/// A validated account ready to be stored.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: Username,
    pub email: Email,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub role: Role,
}
