//! Database repository for user management operations.
//!
//! Provides creation and lookup of users. Uniqueness of username and email
//! is enforced by the schema.

use crate::auth::store::UserStore;
use crate::database::models::{CreateUser, User};
use crate::errors::ServiceResult;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

const USER_COLUMNS: &str = "id, first_name, last_name, email, username, password_hash, \
     is_teacher, is_student, is_public, created_at";

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - SQLite connection pool (cheap to clone)
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new user in the database.
    ///
    /// # Arguments
    /// * `user` - CreateUser DTO containing user details
    ///
    /// # Returns
    /// The newly created User with all fields populated
    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let sql = format!(
            "INSERT INTO users (first_name, last_name, email, username, password_hash, \
             is_teacher, is_student, is_public, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.email)
            .bind(user.username)
            .bind(user.password_hash)
            .bind(user.is_teacher)
            .bind(user.is_student)
            .bind(user.is_public)
            .bind(user.created_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their unique identifier.
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Retrieves a user by their username.
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Checks if a username already exists in the system.
    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Checks if an email already exists in the system.
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE lower(email) = lower(?)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        Ok(self.get_user_by_username(username).await?)
    }

    async fn find_user_by_id(&self, id: i64) -> ServiceResult<Option<User>> {
        Ok(self.get_user_by_id(id).await?)
    }
}
