//! Collaborator interfaces consumed by the authenticator.
//!
//! The authenticator only sees these traits; the SQLite repositories in
//! `crate::repositories` are the production implementations.

use crate::database::models::{
    AccountLockout, CreateLoginAttempt, LoginAttempt, RememberMeToken, Session, User,
};
use crate::errors::ServiceResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> ServiceResult<Option<User>>;

    async fn find_user_by_id(&self, id: i64) -> ServiceResult<Option<User>>;
}

/// Append-only log of login attempts.
#[async_trait]
pub trait AttemptLedger: Send + Sync {
    async fn append_login_attempt(
        &self,
        attempt: CreateLoginAttempt,
    ) -> ServiceResult<LoginAttempt>;

    /// Failed attempts for `user_id` strictly after `since`.
    async fn count_failed_attempts_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> ServiceResult<i64>;
}

#[async_trait]
pub trait LockoutStore: Send + Sync {
    async fn get_active_lockout(&self, user_id: i64) -> ServiceResult<Option<AccountLockout>>;

    /// Stores `lockout`, replacing any lockout already held by the same user.
    async fn insert_lockout(&self, lockout: &AccountLockout) -> ServiceResult<()>;

    async fn remove_lockout(&self, user_id: i64) -> ServiceResult<()>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token_by_series(&self, series: &str) -> ServiceResult<Option<RememberMeToken>>;

    async fn save_token(&self, token: &RememberMeToken) -> ServiceResult<()>;

    /// Replaces the secret of `series` only if it still equals `expected_secret`.
    ///
    /// Returns `false` when another request rotated the series first.
    async fn rotate_token(
        &self,
        series: &str,
        expected_secret: &str,
        new_secret: &str,
        new_expires_at: DateTime<Utc>,
    ) -> ServiceResult<bool>;

    async fn delete_token(&self, series: &str) -> ServiceResult<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> ServiceResult<()>;

    /// Looks up a live session; expired sessions are treated as absent.
    async fn find_session(&self, id: &str, now: DateTime<Utc>) -> ServiceResult<Option<Session>>;

    async fn delete_session(&self, id: &str) -> ServiceResult<()>;
}
