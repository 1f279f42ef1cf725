//! Persistent "remember me" logins.
//!
//! A remember-me credential is a `series:secret` pair. The series is a stable
//! lookup key; the secret is replaced on every successful use, so a stolen
//! cookie works at most once and a replayed secret is refused.

use crate::auth::models::RequestContext;
use crate::auth::service::{AuthOutcome, AuthenticatedSession, SessionAuthenticator, later};
use crate::database::models::{RememberMeToken, User};
use crate::errors::{AuthRejection, ServiceResult};
use crate::utils::generate_random_string::generate_random_string;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

const SECRET_LENGTH: usize = 64;

/// Client-held half of a remember-me token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberMeCredential {
    pub series: String,
    pub secret: String,
    pub expires_at: DateTime<Utc>,
}

impl RememberMeCredential {
    pub fn cookie_value(&self) -> String {
        format!("{}:{}", self.series, self.secret)
    }
}

/// Splits a cookie value into `(series, secret)`.
pub fn parse_cookie_value(value: &str) -> Option<(&str, &str)> {
    let (series, secret) = value.split_once(':')?;
    if series.is_empty() || secret.is_empty() {
        return None;
    }
    Some((series, secret))
}

impl SessionAuthenticator {
    /// Issues a new series for `user` and persists it.
    pub(super) async fn issue_remember_me(&self, user: &User) -> ServiceResult<RememberMeCredential> {
        let credential = RememberMeCredential {
            series: Uuid::new_v4().to_string(),
            secret: generate_random_string(SECRET_LENGTH),
            expires_at: later(
                self.clock.now(),
                Duration::try_days(self.config.remember_me_days),
                "remember_me_days",
            )?,
        };

        self.stores
            .tokens
            .save_token(&RememberMeToken {
                series: credential.series.clone(),
                user_id: user.id,
                token: credential.secret.clone(),
                expires_at: credential.expires_at,
            })
            .await?;

        Ok(credential)
    }

    /// Authenticates from a raw `remember-me` cookie value.
    pub async fn authenticate_by_cookie(
        &self,
        cookie_value: &str,
        context: &RequestContext,
        prior_session: Option<&str>,
    ) -> ServiceResult<AuthOutcome> {
        match parse_cookie_value(cookie_value) {
            Some((series, secret)) => {
                self.authenticate_by_token(series, secret, context, prior_session)
                    .await
            }
            None => {
                debug!("Remember-me cookie is malformed");
                Ok(AuthOutcome::Rejected(AuthRejection::TokenInvalid))
            }
        }
    }

    /// Authenticates with a remember-me series and secret.
    ///
    /// Fails closed when the series is unknown, expired, or the secret does
    /// not match. A locked account is refused with `AccountLocked` and its
    /// token is left untouched. On success the secret is rotated and a new
    /// session is started, exactly as after a password login.
    pub async fn authenticate_by_token(
        &self,
        series: &str,
        presented_secret: &str,
        context: &RequestContext,
        prior_session: Option<&str>,
    ) -> ServiceResult<AuthOutcome> {
        let rejected = Ok(AuthOutcome::Rejected(AuthRejection::TokenInvalid));
        let now = self.clock.now();

        let Some(stored) = self.stores.tokens.get_token_by_series(series).await? else {
            debug!("Remember-me series not found");
            return rejected;
        };

        if stored.is_expired_at(now) {
            self.stores.tokens.delete_token(series).await?;
            debug!("Remember-me token for user {} expired", stored.user_id);
            return rejected;
        }

        if stored.token != presented_secret {
            debug!("Remember-me secret mismatch for user {}", stored.user_id);
            return rejected;
        }

        let Some(user) = self.stores.users.find_user_by_id(stored.user_id).await? else {
            return rejected;
        };

        if self.is_locked_out(user.id).await? {
            info!(
                "Account {} presented a remember-me token while locked out",
                user.id
            );
            return Ok(AuthOutcome::Rejected(AuthRejection::AccountLocked));
        }

        let rotated = RememberMeCredential {
            series: stored.series.clone(),
            secret: generate_random_string(SECRET_LENGTH),
            expires_at: later(
                now,
                Duration::try_days(self.config.remember_me_days),
                "remember_me_days",
            )?,
        };
        let swapped = self
            .stores
            .tokens
            .rotate_token(series, presented_secret, &rotated.secret, rotated.expires_at)
            .await?;
        if !swapped {
            // Another request used this secret first.
            debug!("Remember-me secret for user {} already rotated", user.id);
            return rejected;
        }

        self.record_attempt(Some(user.id), context, true).await?;
        let session = self.start_session(&user, prior_session).await?;

        info!("User {} authenticated by remember-me token", user.id);

        Ok(AuthOutcome::Authenticated(Box::new(AuthenticatedSession {
            user,
            session,
            remember_me: Some(rotated),
        })))
    }

    /// Deletes the stored token behind a cookie, if the cookie still matches it.
    pub(super) async fn revoke_remember_me(&self, cookie_value: &str) -> ServiceResult<()> {
        let Some((series, secret)) = parse_cookie_value(cookie_value) else {
            return Ok(());
        };

        if let Some(stored) = self.stores.tokens.get_token_by_series(series).await? {
            if stored.token == secret {
                self.stores.tokens.delete_token(series).await?;
                debug!("Remember-me series revoked for user {}", stored.user_id);
            }
        }

        Ok(())
    }
}
