//! Core business logic for the authentication system.
//!
//! `SessionAuthenticator` decides, per login request, whether to authenticate,
//! lock out or reject. It owns no request state: everything durable lives in
//! the stores, and the caller passes in whatever session id the client
//! presented.

use crate::auth::credentials::CredentialVerifier;
use crate::auth::models::{LoginRequest, RequestContext};
use crate::auth::remember_me::RememberMeCredential;
use crate::auth::store::{AttemptLedger, LockoutStore, SessionStore, TokenStore, UserStore};
use crate::config::AuthConfig;
use crate::database::models::{AccountLockout, CreateLoginAttempt, Session, User};
use crate::errors::{AuthRejection, ServiceError, ServiceResult};
use crate::repositories::account_lockout_repository::AccountLockoutRepository;
use crate::repositories::login_attempt_repository::LoginAttemptRepository;
use crate::repositories::remember_me_token_repository::RememberMeTokenRepository;
use crate::repositories::session_repository::SessionRepository;
use crate::repositories::user_repository::UserRepository;
use crate::utils::clock::Clock;
use crate::utils::generate_random_string::generate_random_string;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SESSION_ID_LENGTH: usize = 48;

/// The stores the authenticator consults.
#[derive(Clone)]
pub struct AuthStores {
    pub users: Arc<dyn UserStore>,
    pub attempts: Arc<dyn AttemptLedger>,
    pub lockouts: Arc<dyn LockoutStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AuthStores {
    /// SQLite-backed stores sharing one pool.
    pub fn sqlite(pool: &SqlitePool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            attempts: Arc::new(LoginAttemptRepository::new(pool.clone())),
            lockouts: Arc::new(AccountLockoutRepository::new(pool.clone())),
            tokens: Arc::new(RememberMeTokenRepository::new(pool.clone())),
            sessions: Arc::new(SessionRepository::new(pool.clone())),
        }
    }
}

/// A freshly established authenticated session.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: User,
    pub session: Session,
    /// Set when a remember-me credential was issued or rotated.
    pub remember_me: Option<RememberMeCredential>,
}

#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(Box<AuthenticatedSession>),
    Rejected(AuthRejection),
}

/// Authentication service for password logins, remember-me logins and logout.
pub struct SessionAuthenticator {
    pub(super) stores: AuthStores,
    verifier: Arc<dyn CredentialVerifier>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: AuthConfig,
}

impl SessionAuthenticator {
    pub fn new(
        stores: AuthStores,
        verifier: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            stores,
            verifier,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticates a username/password pair.
    ///
    /// `prior_session` is the session id the client presented, if any; it is
    /// destroyed on success so every login starts from a new session id.
    ///
    /// # Errors
    /// Only storage or hashing faults are returned as `Err`; every
    /// authentication failure is an `AuthOutcome::Rejected`.
    pub async fn authenticate(
        &self,
        request: &LoginRequest,
        context: &RequestContext,
        prior_session: Option<&str>,
    ) -> ServiceResult<AuthOutcome> {
        // Nobody to attribute the attempt to, so the ledger is left alone.
        let (Some(username), Some(password)) = (request.username(), request.password()) else {
            debug!("Login rejected: missing username or password");
            return Ok(AuthOutcome::Rejected(AuthRejection::InvalidCredentials));
        };

        let Some(user) = self.stores.users.find_user_by_username(username).await? else {
            self.record_attempt(None, context, false).await?;
            return Ok(AuthOutcome::Rejected(AuthRejection::InvalidCredentials));
        };

        if self.is_locked_out(user.id).await? {
            self.record_attempt(Some(user.id), context, false).await?;
            info!(
                "Account {} is trying to log in, but it's locked out",
                user.id
            );
            return Ok(AuthOutcome::Rejected(AuthRejection::AccountLocked));
        }

        if !self.verifier.verify_secret(password, &user.password_hash)? {
            self.record_attempt(Some(user.id), context, false).await?;
            self.apply_lockout_threshold(user.id).await?;
            return Ok(AuthOutcome::Rejected(AuthRejection::InvalidCredentials));
        }

        self.record_attempt(Some(user.id), context, true).await?;
        let session = self.start_session(&user, prior_session).await?;
        let remember_me = if request.remember_me {
            Some(self.issue_remember_me(&user).await?)
        } else {
            None
        };

        debug!("Successful login for user {}", user.id);

        Ok(AuthOutcome::Authenticated(Box::new(AuthenticatedSession {
            user,
            session,
            remember_me,
        })))
    }

    /// Resolves a presented session id into a live, authenticated session.
    pub async fn current_session(&self, session_id: &str) -> ServiceResult<Option<Session>> {
        let session = self
            .stores
            .sessions
            .find_session(session_id, self.clock.now())
            .await?;

        Ok(session.filter(|session| session.authenticated))
    }

    /// The user a session is bound to.
    pub async fn session_user(&self, session: &Session) -> ServiceResult<Option<User>> {
        self.stores.users.find_user_by_id(session.user_id).await
    }

    /// Ends the client's session. Idempotent; absent or stale ids are ignored.
    ///
    /// A presented remember-me cookie is revoked server-side as well, so a
    /// copy captured before logout cannot be replayed.
    pub async fn logout(
        &self,
        session_id: Option<&str>,
        remember_me_cookie: Option<&str>,
    ) -> ServiceResult<Option<i64>> {
        let mut user_id = None;

        if let Some(session_id) = session_id {
            if let Some(session) = self
                .stores
                .sessions
                .find_session(session_id, self.clock.now())
                .await?
            {
                user_id = Some(session.user_id);
            }
            self.stores.sessions.delete_session(session_id).await?;
        }

        if let Some(cookie) = remember_me_cookie {
            self.revoke_remember_me(cookie).await?;
        }

        match user_id {
            Some(id) => info!("User with ID {} logged out successfully", id),
            None => info!("User logged out"),
        }

        Ok(user_id)
    }

    /// Whether `user_id` is currently locked out.
    ///
    /// A lockout whose unlock time has passed is removed here, so at most one
    /// active lockout exists when the caller goes on to evaluate a new one.
    pub(super) async fn is_locked_out(&self, user_id: i64) -> ServiceResult<bool> {
        let Some(lockout) = self.stores.lockouts.get_active_lockout(user_id).await? else {
            return Ok(false);
        };

        if lockout.is_active_at(self.clock.now()) {
            return Ok(true);
        }

        self.stores.lockouts.remove_lockout(user_id).await?;
        info!("Expired lockout cleared for user {}", user_id);
        Ok(false)
    }

    /// Replaces any prior session with a new authenticated one for `user`.
    pub(super) async fn start_session(
        &self,
        user: &User,
        prior_session: Option<&str>,
    ) -> ServiceResult<Session> {
        if let Some(prior) = prior_session {
            self.stores.sessions.delete_session(prior).await?;
        }

        let now = self.clock.now();
        let session = Session {
            id: generate_random_string(SESSION_ID_LENGTH),
            user_id: user.id,
            authenticated: true,
            created_at: now,
            expires_at: later(
                now,
                Duration::try_seconds(self.config.session_ttl_seconds),
                "session_ttl_seconds",
            )?,
        };
        self.stores.sessions.create_session(&session).await?;

        Ok(session)
    }

    pub(super) async fn record_attempt(
        &self,
        user_id: Option<i64>,
        context: &RequestContext,
        success: bool,
    ) -> ServiceResult<()> {
        let attempt = self
            .stores
            .attempts
            .append_login_attempt(CreateLoginAttempt {
                user_id,
                attempted_at: self.clock.now(),
                ip_address: context.client_ip.clone(),
                success,
            })
            .await?;

        debug!(
            attempt_id = attempt.id,
            user_id = ?attempt.user_id,
            success = attempt.success,
            "Login attempt recorded"
        );
        Ok(())
    }

    /// Locks the account once the trailing window holds enough failures.
    ///
    /// The count is read back from the ledger after this request's own
    /// failure was written, so the triggering attempt is included.
    async fn apply_lockout_threshold(&self, user_id: i64) -> ServiceResult<()> {
        let policy = self.config.lockout;
        let now = self.clock.now();
        let window_start = Duration::try_minutes(policy.window_minutes)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| out_of_range("lockout window_minutes"))?;

        let failures = self
            .stores
            .attempts
            .count_failed_attempts_since(user_id, window_start)
            .await?;

        if failures >= policy.max_failed_attempts {
            let lockout = AccountLockout {
                user_id,
                activated_at: now,
                unlock_at: Some(later(
                    now,
                    Duration::try_minutes(policy.lockout_minutes),
                    "lockout_minutes",
                )?),
            };
            self.stores.lockouts.insert_lockout(&lockout).await?;
            warn!(
                "Account {} locked after {} failed attempts until {:?}",
                user_id, failures, lockout.unlock_at
            );
        }

        Ok(())
    }
}

/// `now + span`, failing instead of panicking when the configured span
/// does not fit in a timestamp.
pub(super) fn later(
    now: DateTime<Utc>,
    span: Option<Duration>,
    setting: &str,
) -> ServiceResult<DateTime<Utc>> {
    span.and_then(|span| now.checked_add_signed(span))
        .ok_or_else(|| out_of_range(setting))
}

fn out_of_range(setting: &str) -> ServiceError {
    ServiceError::internal_error(format!("Configured {setting} is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Harness, context, test_auth_config};

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            remember_me: false,
        }
    }

    fn rejection(outcome: &AuthOutcome) -> Option<AuthRejection> {
        match outcome {
            AuthOutcome::Rejected(reason) => Some(*reason),
            AuthOutcome::Authenticated(_) => None,
        }
    }

    #[tokio::test]
    async fn test_successful_login_creates_session() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;

        let outcome = harness
            .authenticator
            .authenticate(&login("alice", "s3cret!"), &context(), None)
            .await
            .unwrap();

        let AuthOutcome::Authenticated(auth) = outcome else {
            panic!("expected authentication");
        };
        assert_eq!(auth.user.id, user.id);
        assert!(auth.session.authenticated);
        assert_eq!(auth.session.expires_at, harness.clock.now() + Duration::minutes(30));
        assert!(auth.remember_me.is_none());

        let current = harness
            .authenticator
            .current_session(&auth.session.id)
            .await
            .unwrap();
        assert_eq!(current, Some(auth.session.clone()));
        assert_eq!(harness.attempt_count(Some(user.id), true).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_indistinguishable_from_wrong_password() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;

        let unknown = harness
            .authenticator
            .authenticate(&login("nobody", "s3cret!"), &context(), None)
            .await
            .unwrap();
        let wrong = harness
            .authenticator
            .authenticate(&login("alice", "guess"), &context(), None)
            .await
            .unwrap();

        assert_eq!(rejection(&unknown), Some(AuthRejection::InvalidCredentials));
        assert_eq!(rejection(&unknown), rejection(&wrong));
        assert_eq!(
            rejection(&unknown).map(|r| r.to_string()),
            rejection(&wrong).map(|r| r.to_string())
        );

        assert_eq!(harness.attempt_count(None, false).await, 1);
        assert_eq!(harness.attempt_count(Some(user.id), false).await, 1);
    }

    #[tokio::test]
    async fn test_missing_credentials_do_not_touch_ledger() {
        let harness = Harness::new().await;
        harness.seed_user("alice", "s3cret!").await;

        let missing_password = LoginRequest {
            username: Some("alice".to_string()),
            password: None,
            remember_me: false,
        };
        let outcome = harness
            .authenticator
            .authenticate(&missing_password, &context(), None)
            .await
            .unwrap();
        assert_eq!(rejection(&outcome), Some(AuthRejection::InvalidCredentials));

        let outcome = harness
            .authenticator
            .authenticate(&login("", "s3cret!"), &context(), None)
            .await
            .unwrap();
        assert_eq!(rejection(&outcome), Some(AuthRejection::InvalidCredentials));

        assert_eq!(harness.total_attempts().await, 0);
    }

    #[tokio::test]
    async fn test_login_rotates_session_id() {
        let harness = Harness::new().await;
        harness.seed_user("alice", "s3cret!").await;

        let first = harness.login_ok("alice", "s3cret!", None).await;
        let second = harness
            .login_ok("alice", "s3cret!", Some(&first.session.id))
            .await;

        assert_ne!(first.session.id, second.session.id);
        let old = harness
            .authenticator
            .current_session(&first.session.id)
            .await
            .unwrap();
        assert!(old.is_none());
    }

    #[tokio::test]
    async fn test_fifth_failure_locks_account_going_forward() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;

        for minutes_ago in [10, 8, 5, 2] {
            harness.seed_failure(user.id, minutes_ago).await;
        }

        let outcome = harness
            .authenticator
            .authenticate(&login("alice", "wrong"), &context(), None)
            .await
            .unwrap();
        // The triggering attempt still reports bad credentials.
        assert_eq!(rejection(&outcome), Some(AuthRejection::InvalidCredentials));

        let lockout = harness.lockout(user.id).await.expect("lockout created");
        let now = harness.clock.now();
        assert_eq!(lockout.activated_at, now);
        assert_eq!(lockout.unlock_at, Some(now + Duration::minutes(30)));

        // Correct password is refused while locked, and the refusal is logged.
        let outcome = harness
            .authenticator
            .authenticate(&login("alice", "s3cret!"), &context(), None)
            .await
            .unwrap();
        assert_eq!(rejection(&outcome), Some(AuthRejection::AccountLocked));
        assert_eq!(harness.attempt_count(Some(user.id), false).await, 6);
    }

    #[tokio::test]
    async fn test_failures_outside_window_do_not_count() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;

        // First of the five is 16 minutes old by the time the fifth arrives.
        for minutes_ago in [16, 10, 8, 5] {
            harness.seed_failure(user.id, minutes_ago).await;
        }

        let outcome = harness
            .authenticator
            .authenticate(&login("alice", "wrong"), &context(), None)
            .await
            .unwrap();
        assert_eq!(rejection(&outcome), Some(AuthRejection::InvalidCredentials));
        assert!(harness.lockout(user.id).await.is_none());

        harness.login_ok("alice", "s3cret!", None).await;
    }

    #[tokio::test]
    async fn test_repeated_failures_lock_account() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;

        for _ in 0..4 {
            harness
                .authenticator
                .authenticate(&login("alice", "wrong"), &context(), None)
                .await
                .unwrap();
            harness.clock.advance(Duration::minutes(1));
        }
        assert!(harness.lockout(user.id).await.is_none());

        harness
            .authenticator
            .authenticate(&login("alice", "wrong"), &context(), None)
            .await
            .unwrap();
        assert!(harness.lockout(user.id).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_lockout_is_cleared_before_checking_password() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;
        let now = harness.clock.now();
        harness
            .insert_lockout(AccountLockout {
                user_id: user.id,
                activated_at: now - Duration::minutes(45),
                unlock_at: Some(now - Duration::minutes(15)),
            })
            .await;

        let auth = harness.login_ok("alice", "s3cret!", None).await;
        assert_eq!(auth.user.id, user.id);
        assert!(harness.lockout(user.id).await.is_none());
    }

    #[tokio::test]
    async fn test_lockout_without_unlock_time_is_never_cleared_by_time() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;
        harness
            .insert_lockout(AccountLockout {
                user_id: user.id,
                activated_at: harness.clock.now(),
                unlock_at: None,
            })
            .await;

        harness.clock.advance(Duration::days(400));

        let outcome = harness
            .authenticator
            .authenticate(&login("alice", "s3cret!"), &context(), None)
            .await
            .unwrap();
        assert_eq!(rejection(&outcome), Some(AuthRejection::AccountLocked));
        assert!(harness.lockout(user.id).await.is_some());
    }

    #[tokio::test]
    async fn test_oversized_durations_fail_without_panicking() {
        let mut config = test_auth_config();
        config.session_ttl_seconds = i64::MAX;
        let harness = Harness::with_config(config).await;
        harness.seed_user("alice", "s3cret!").await;

        let result = harness
            .authenticator
            .authenticate(&login("alice", "s3cret!"), &context(), None)
            .await;
        assert!(matches!(result, Err(ServiceError::InternalError { .. })));

        let mut config = test_auth_config();
        config.lockout.lockout_minutes = i64::MAX / 60;
        let harness = Harness::with_config(config).await;
        let user = harness.seed_user("alice", "s3cret!").await;
        for minutes_ago in [1, 2, 3, 4] {
            harness.seed_failure(user.id, minutes_ago).await;
        }

        let result = harness
            .authenticator
            .authenticate(&login("alice", "wrong"), &context(), None)
            .await;
        assert!(matches!(result, Err(ServiceError::InternalError { .. })));
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let harness = Harness::new().await;
        let user = harness.seed_user("alice", "s3cret!").await;
        let auth = harness.login_ok("alice", "s3cret!", None).await;

        let logged_out = harness
            .authenticator
            .logout(Some(&auth.session.id), None)
            .await
            .unwrap();
        assert_eq!(logged_out, Some(user.id));

        let replay = harness
            .authenticator
            .current_session(&auth.session.id)
            .await
            .unwrap();
        assert!(replay.is_none());

        // Second logout with the same id is a no-op.
        let again = harness
            .authenticator
            .logout(Some(&auth.session.id), None)
            .await
            .unwrap();
        assert_eq!(again, None);
    }

    #[tokio::test]
    async fn test_session_expires_lazily() {
        let harness = Harness::new().await;
        harness.seed_user("alice", "s3cret!").await;
        let auth = harness.login_ok("alice", "s3cret!", None).await;

        harness.clock.advance(Duration::minutes(31));
        let current = harness
            .authenticator
            .current_session(&auth.session.id)
            .await
            .unwrap();
        assert!(current.is_none());
    }
}
