//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Note that these may differ from API-specific models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_teacher: bool,
    pub is_student: bool,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// Which kind of account a registration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationType {
    Student,
    Teacher,
}

/// Registration payload as submitted by a client.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateNewUser {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Missing first name value."))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Missing last name value."))]
    pub last_name: String,

    #[serde(default)]
    #[validate(
        email(message = "Invalid email address."),
        length(max = 255, message = "Email too long")
    )]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Missing username value."))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Missing password value."))]
    pub password: String,

    pub registration_type: RegistrationType,
}

/// Insert payload for a new user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_teacher: bool,
    pub is_student: bool,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only login ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LoginAttempt {
    pub id: i64,
    /// `None` when the submitted username did not resolve to a user.
    pub user_id: Option<i64>,
    pub attempted_at: DateTime<Utc>,
    pub ip_address: String,
    pub success: bool,
}

#[derive(Debug, Clone)]
pub struct CreateLoginAttempt {
    pub user_id: Option<i64>,
    pub attempted_at: DateTime<Utc>,
    pub ip_address: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AccountLockout {
    pub user_id: i64,
    pub activated_at: DateTime<Utc>,
    /// `None` locks the account until it is cleared by hand.
    pub unlock_at: Option<DateTime<Utc>>,
}

impl AccountLockout {
    /// A lockout blocks logins while it has no unlock time or the unlock time is ahead of `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.unlock_at {
            None => true,
            Some(unlock_at) => unlock_at > now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RememberMeToken {
    pub series: String,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl RememberMeToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Server-side session bound to exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub authenticated: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
