//! Database repository for account lockouts.
//!
//! A user holds at most one lockout row; inserting replaces the previous one.

use crate::auth::store::LockoutStore;
use crate::database::models::AccountLockout;
use crate::errors::ServiceResult;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AccountLockoutRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl AccountLockoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Retrieves the lockout held by a user, expired or not.
    ///
    /// Deciding whether it still applies is left to the caller.
    pub async fn get_active_lockout(&self, user_id: i64) -> Result<Option<AccountLockout>> {
        let lockout = sqlx::query_as::<_, AccountLockout>(
            "SELECT user_id, activated_at, unlock_at FROM account_lockouts WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lockout)
    }

    pub async fn insert_account_lockout(&self, lockout: &AccountLockout) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO account_lockouts (user_id, activated_at, unlock_at) \
             VALUES (?, ?, ?)",
        )
        .bind(lockout.user_id)
        .bind(lockout.activated_at)
        .bind(lockout.unlock_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes the lockout for a user.
    ///
    /// # Returns
    /// `true` if a row was deleted
    pub async fn remove_active_lockout(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM account_lockouts WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LockoutStore for AccountLockoutRepository {
    async fn get_active_lockout(&self, user_id: i64) -> ServiceResult<Option<AccountLockout>> {
        Ok(AccountLockoutRepository::get_active_lockout(self, user_id).await?)
    }

    async fn insert_lockout(&self, lockout: &AccountLockout) -> ServiceResult<()> {
        Ok(self.insert_account_lockout(lockout).await?)
    }

    async fn remove_lockout(&self, user_id: i64) -> ServiceResult<()> {
        self.remove_active_lockout(user_id).await?;
        Ok(())
    }
}
