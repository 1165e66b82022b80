//! User and session domain models

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Profile of the authenticated wallet owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Display name (backend `fullName`)
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub wallet_number: Option<String>,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            email: email.into(),
            user_name: None,
            wallet_number: None,
            balance: Decimal::ZERO,
            avatar_url: None,
            gender: None,
        }
    }

    /// True when `account` is this user's own wallet number
    pub fn owns_wallet(&self, account: &str) -> bool {
        self.wallet_number.as_deref() == Some(account.trim())
    }
}

/// A logged-in session: bearer token plus the cached profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            user: None,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Whether the session has been idle longer than `limit` at `now`
    pub fn is_idle(&self, limit: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity > limit
    }
}

/// Registration form, mapped to the backend's register body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub full_name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub pin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Login form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}
