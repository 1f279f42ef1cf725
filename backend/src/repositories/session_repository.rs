//! Database repository for server-side sessions.

use crate::auth::store::SessionStore;
use crate::database::models::Session;
use crate::errors::ServiceResult;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct SessionRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, authenticated, created_at, expires_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.authenticated)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Retrieves a session that has not expired at `now`.
    ///
    /// An expired session is deleted on the way out.
    pub async fn get_session(&self, id: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, authenticated, created_at, expires_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match session {
            Some(session) if session.expires_at <= now => {
                self.delete_session(id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn create_session(&self, session: &Session) -> ServiceResult<()> {
        Ok(SessionRepository::create_session(self, session).await?)
    }

    async fn find_session(&self, id: &str, now: DateTime<Utc>) -> ServiceResult<Option<Session>> {
        Ok(self.get_session(id, now).await?)
    }

    async fn delete_session(&self, id: &str) -> ServiceResult<()> {
        Ok(SessionRepository::delete_session(self, id).await?)
    }
}
