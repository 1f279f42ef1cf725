//! Shared application state handed to every handler through an `Extension` layer.

use crate::auth::credentials::{BcryptVerifier, CredentialVerifier};
use crate::auth::rate_limit::LoginRateLimiter;
use crate::auth::service::{AuthStores, SessionAuthenticator};
use crate::config::AuthConfig;
use crate::repositories::user_repository::UserRepository;
use crate::services::user_service::UserService;
use crate::utils::clock::Clock;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<SessionAuthenticator>,
    pub users: Arc<UserService>,
    pub login_rate_limiter: Arc<LoginRateLimiter>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(pool: &SqlitePool, config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let verifier: Arc<dyn CredentialVerifier> = Arc::new(BcryptVerifier::new(config.bcrypt_cost));

        let authenticator = SessionAuthenticator::new(
            AuthStores::sqlite(pool),
            verifier.clone(),
            clock.clone(),
            config.clone(),
        );
        let users = UserService::new(UserRepository::new(pool.clone()), verifier, clock.clone());

        Self {
            authenticator: Arc::new(authenticator),
            users: Arc::new(users),
            login_rate_limiter: Arc::new(LoginRateLimiter::new(config.login_rate_limit)),
            clock,
        }
    }
}
