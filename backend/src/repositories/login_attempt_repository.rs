//! Database repository for the login attempt ledger.
//!
//! Rows are only ever inserted; the lockout policy derives failure counts
//! from them on demand.

use crate::auth::store::AttemptLedger;
use crate::database::models::{CreateLoginAttempt, LoginAttempt};
use crate::errors::ServiceResult;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct LoginAttemptRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl LoginAttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends one attempt to the ledger.
    ///
    /// # Returns
    /// The stored attempt, including its ledger id
    pub async fn insert_login_attempt(&self, attempt: CreateLoginAttempt) -> Result<LoginAttempt> {
        let attempt = sqlx::query_as::<_, LoginAttempt>(
            "INSERT INTO login_attempts (user_id, attempted_at, ip_address, success) \
             VALUES (?, ?, ?, ?) \
             RETURNING id, user_id, attempted_at, ip_address, success",
        )
        .bind(attempt.user_id)
        .bind(attempt.attempted_at)
        .bind(attempt.ip_address)
        .bind(attempt.success)
        .fetch_one(&self.pool)
        .await?;

        Ok(attempt)
    }

    /// Counts failed attempts for a user recorded strictly after `since`.
    ///
    /// Timestamps are compared through `julianday` so that differing
    /// fractional-second precision in the stored text does not matter.
    pub async fn count_failed_attempts_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM login_attempts \
             WHERE user_id = ? AND success = 0 AND julianday(attempted_at) > julianday(?)",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl AttemptLedger for LoginAttemptRepository {
    async fn append_login_attempt(
        &self,
        attempt: CreateLoginAttempt,
    ) -> ServiceResult<LoginAttempt> {
        Ok(self.insert_login_attempt(attempt).await?)
    }

    async fn count_failed_attempts_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> ServiceResult<i64> {
        Ok(LoginAttemptRepository::count_failed_attempts_since(self, user_id, since).await?)
    }
}
