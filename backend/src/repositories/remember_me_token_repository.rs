//! Database repository for persistent remember-me tokens.
//!
//! Tokens are keyed by their series; the secret in `token` rotates on every
//! successful use.

use crate::auth::store::TokenStore;
use crate::database::models::RememberMeToken;
use crate::errors::ServiceResult;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct RememberMeTokenRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl RememberMeTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_token_by_series(&self, series: &str) -> Result<Option<RememberMeToken>> {
        let token = sqlx::query_as::<_, RememberMeToken>(
            "SELECT series, user_id, token, expires_at FROM remember_me_tokens WHERE series = ?",
        )
        .bind(series)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    /// Inserts a token, overwriting any record with the same series.
    pub async fn save_token(&self, token: &RememberMeToken) -> Result<()> {
        sqlx::query(
            "INSERT INTO remember_me_tokens (series, user_id, token, expires_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (series) DO UPDATE SET \
             user_id = excluded.user_id, token = excluded.token, expires_at = excluded.expires_at",
        )
        .bind(&token.series)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Compare-and-swap of the secret for one series.
    ///
    /// The equality check and the write happen in a single statement, so two
    /// requests presenting the same secret cannot both rotate it.
    pub async fn rotate_token(
        &self,
        series: &str,
        expected_secret: &str,
        new_secret: &str,
        new_expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE remember_me_tokens SET token = ?, expires_at = ? \
             WHERE series = ? AND token = ?",
        )
        .bind(new_secret)
        .bind(new_expires_at)
        .bind(series)
        .bind(expected_secret)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_token(&self, series: &str) -> Result<()> {
        sqlx::query("DELETE FROM remember_me_tokens WHERE series = ?")
            .bind(series)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl TokenStore for RememberMeTokenRepository {
    async fn get_token_by_series(&self, series: &str) -> ServiceResult<Option<RememberMeToken>> {
        Ok(RememberMeTokenRepository::get_token_by_series(self, series).await?)
    }

    async fn save_token(&self, token: &RememberMeToken) -> ServiceResult<()> {
        Ok(RememberMeTokenRepository::save_token(self, token).await?)
    }

    async fn rotate_token(
        &self,
        series: &str,
        expected_secret: &str,
        new_secret: &str,
        new_expires_at: DateTime<Utc>,
    ) -> ServiceResult<bool> {
        Ok(RememberMeTokenRepository::rotate_token(
            self,
            series,
            expected_secret,
            new_secret,
            new_expires_at,
        )
        .await?)
    }

    async fn delete_token(&self, series: &str) -> ServiceResult<()> {
        Ok(RememberMeTokenRepository::delete_token(self, series).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_repository::UserRepository;
    use crate::test_support::{memory_pool, new_user, test_now};
    use chrono::Duration;

    async fn repo_with_token() -> (RememberMeTokenRepository, RememberMeToken) {
        let pool = memory_pool().await;
        let user = UserRepository::new(pool.clone())
            .create_user(new_user("alice", "hash", test_now()))
            .await
            .unwrap();
        let repo = RememberMeTokenRepository::new(pool);
        let token = RememberMeToken {
            series: "S1".to_string(),
            user_id: user.id,
            token: "T1".to_string(),
            expires_at: test_now() + Duration::days(3),
        };
        repo.save_token(&token).await.unwrap();
        (repo, token)
    }

    #[tokio::test]
    async fn test_save_and_fetch() {
        let (repo, token) = repo_with_token().await;

        let stored = repo.get_token_by_series("S1").await.unwrap().unwrap();
        assert_eq!(stored, token);
        assert!(repo.get_token_by_series("S2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rotation_requires_current_secret() {
        let (repo, _) = repo_with_token().await;
        let new_expiry = test_now() + Duration::days(14);

        assert!(repo.rotate_token("S1", "T1", "T2", new_expiry).await.unwrap());
        // Replaying the old secret no longer matches.
        assert!(!repo.rotate_token("S1", "T1", "T3", new_expiry).await.unwrap());

        let stored = repo.get_token_by_series("S1").await.unwrap().unwrap();
        assert_eq!(stored.token, "T2");
        assert_eq!(stored.expires_at, new_expiry);
    }

    #[tokio::test]
    async fn test_delete_token() {
        let (repo, _) = repo_with_token().await;
        repo.delete_token("S1").await.unwrap();
        assert!(repo.get_token_by_series("S1").await.unwrap().is_none());

        // Deleting twice is harmless.
        repo.delete_token("S1").await.unwrap();
    }
}
