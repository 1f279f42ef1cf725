//! Fixtures shared by the unit tests: an in-memory database, a settable
//! clock and a fully wired authenticator.

use crate::auth::credentials::{BcryptVerifier, CredentialVerifier};
use crate::auth::models::{LoginRequest, RequestContext};
use crate::auth::service::{AuthOutcome, AuthenticatedSession, SessionAuthenticator};
use crate::config::{AuthConfig, LockoutPolicy, RateLimitConfig};
use crate::database::models::{AccountLockout, CreateUser, RememberMeToken, User};
use crate::repositories::account_lockout_repository::AccountLockoutRepository;
use crate::repositories::remember_me_token_repository::RememberMeTokenRepository;
use crate::repositories::user_repository::UserRepository;
use crate::state::AppState;
use crate::utils::clock::Clock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

pub const TEST_BCRYPT_COST: u32 = 4;

/// Single-connection in-memory database with the schema applied.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    // One connection that never recycles, or the in-memory database vanishes.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
}

/// A student account with an `.edu` address derived from the username.
pub fn new_user(username: &str, password_hash: &str, created_at: DateTime<Utc>) -> CreateUser {
    CreateUser {
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: format!("{username}@example.edu"),
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        is_teacher: false,
        is_student: true,
        is_public: false,
        created_at,
    }
}

pub fn context() -> RequestContext {
    RequestContext {
        client_ip: "198.51.100.4".to_string(),
        secure: false,
    }
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        main_dashboard_page: "/dashboard".to_string(),
        remember_me_days: 14,
        session_ttl_seconds: 1800,
        bcrypt_cost: TEST_BCRYPT_COST,
        trust_proxy_headers: false,
        lockout: LockoutPolicy::default(),
        login_rate_limit: RateLimitConfig::default(),
    }
}

/// Clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct Harness {
    pub pool: SqlitePool,
    pub clock: Arc<FixedClock>,
    pub state: AppState,
    pub authenticator: Arc<SessionAuthenticator>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_auth_config()).await
    }

    pub async fn with_config(config: AuthConfig) -> Self {
        let pool = memory_pool().await;
        let clock = Arc::new(FixedClock::new(test_now()));
        let state = AppState::new(&pool, &config, clock.clone());
        let authenticator = state.authenticator.clone();

        Self {
            pool,
            clock,
            state,
            authenticator,
        }
    }

    pub async fn seed_user(&self, username: &str, password: &str) -> User {
        let hash = BcryptVerifier::new(TEST_BCRYPT_COST)
            .hash_secret(password)
            .unwrap();
        UserRepository::new(self.pool.clone())
            .create_user(new_user(username, &hash, self.clock.now()))
            .await
            .unwrap()
    }

    /// Password login that must succeed.
    pub async fn login_ok(
        &self,
        username: &str,
        password: &str,
        prior_session: Option<&str>,
    ) -> AuthenticatedSession {
        let request = LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            remember_me: false,
        };
        match self
            .authenticator
            .authenticate(&request, &context(), prior_session)
            .await
            .unwrap()
        {
            AuthOutcome::Authenticated(auth) => *auth,
            AuthOutcome::Rejected(reason) => panic!("login for {username} rejected: {reason}"),
        }
    }

    pub async fn seed_failure(&self, user_id: i64, minutes_ago: i64) {
        sqlx::query(
            "INSERT INTO login_attempts (user_id, attempted_at, ip_address, success) \
             VALUES (?, ?, ?, FALSE)",
        )
        .bind(user_id)
        .bind(self.clock.now() - Duration::minutes(minutes_ago))
        .bind("203.0.113.9")
        .execute(&self.pool)
        .await
        .unwrap();
    }

    /// Ledger rows for `user_id` (`None` meaning unattributed) with the given outcome.
    pub async fn attempt_count(&self, user_id: Option<i64>, success: bool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM login_attempts WHERE user_id IS ? AND success = ?")
            .bind(user_id)
            .bind(success)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn total_attempts(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM login_attempts")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Stored lockout row for `user_id`, active or not.
    pub async fn lockout(&self, user_id: i64) -> Option<AccountLockout> {
        sqlx::query_as::<_, AccountLockout>(
            "SELECT user_id, activated_at, unlock_at FROM account_lockouts WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .unwrap()
    }

    pub async fn insert_lockout(&self, lockout: AccountLockout) {
        AccountLockoutRepository::new(self.pool.clone())
            .insert_account_lockout(&lockout)
            .await
            .unwrap();
    }

    pub async fn seed_token(
        &self,
        series: &str,
        user_id: i64,
        secret: &str,
        expires_at: DateTime<Utc>,
    ) {
        RememberMeTokenRepository::new(self.pool.clone())
            .save_token(&RememberMeToken {
                series: series.to_string(),
                user_id,
                token: secret.to_string(),
                expires_at,
            })
            .await
            .unwrap();
    }

    pub async fn session_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn token(&self, series: &str) -> Option<RememberMeToken> {
        RememberMeTokenRepository::new(self.pool.clone())
            .get_token_by_series(series)
            .await
            .unwrap()
    }
}
