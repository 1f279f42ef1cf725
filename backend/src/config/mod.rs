//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, and the authentication policy (remember-me
//! lifetime, session lifetime, lockout thresholds and login rate limits).

use anyhow::{Context, Result, ensure};
use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Longest accepted login rate-limit window.
pub const MAX_RATE_WINDOW_SECONDS: i64 = 86_400;

const MINUTES_PER_YEAR: i64 = 525_600;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub server_port: u16,
    pub auth: AuthConfig,
}

/// Settings consumed by the authenticator and the login endpoints.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Where a client is sent once authenticated.
    pub main_dashboard_page: String,
    /// Lifetime of a remember-me token and its cookie.
    pub remember_me_days: i64,
    /// Lifetime of a server-side session.
    pub session_ttl_seconds: i64,
    /// bcrypt work factor used when hashing new passwords.
    pub bcrypt_cost: u32,
    /// Trust `X-Forwarded-*` headers when deriving the client origin.
    pub trust_proxy_headers: bool,
    pub lockout: LockoutPolicy,
    pub login_rate_limit: RateLimitConfig,
}

/// Failed-attempt threshold that locks an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: i64,
    pub window_minutes: i64,
    pub lockout_minutes: i64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            window_minutes: 15,
            lockout_minutes: 30,
        }
    }
}

/// Request budget for the login endpoint, per client origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 50,
            window_seconds: 60,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = var_or("DB_MAX_CONNECTIONS", 5u32)?;
        let acquire_timeout_seconds = var_or("DB_ACQUIRE_TIMEOUT_SECONDS", 3u64)?;
        let server_port = var_or("SERVER_PORT", 3000u16)?;

        let main_dashboard_page =
            env::var("MAIN_DASHBOARD_PAGE").unwrap_or_else(|_| "/dashboard".to_string());

        let defaults = LockoutPolicy::default();
        let lockout = LockoutPolicy {
            max_failed_attempts: var_or("LOCKOUT_MAX_FAILED_ATTEMPTS", defaults.max_failed_attempts)?,
            window_minutes: var_or("LOCKOUT_WINDOW_MINUTES", defaults.window_minutes)?,
            lockout_minutes: var_or("LOCKOUT_DURATION_MINUTES", defaults.lockout_minutes)?,
        };

        let defaults = RateLimitConfig::default();
        let login_rate_limit = RateLimitConfig {
            max_requests: var_or("LOGIN_RATE_LIMIT", defaults.max_requests)?,
            window_seconds: var_or("LOGIN_RATE_WINDOW_SECONDS", defaults.window_seconds)?,
        };

        let auth = AuthConfig {
            main_dashboard_page,
            remember_me_days: var_or("REMEMBER_ME_DAYS", 14i64)?,
            session_ttl_seconds: var_or("SESSION_TTL_SECONDS", 1800i64)?,
            bcrypt_cost: var_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            trust_proxy_headers: var_or("TRUST_PROXY_HEADERS", false)?,
            lockout,
            login_rate_limit,
        };

        auth.validate()?;

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            server_port,
            auth,
        })
    }
}

impl AuthConfig {
    /// Rejects settings that would make expiry times meaningless or
    /// unrepresentable. Each error names the variable that sets the field.
    pub fn validate(&self) -> Result<()> {
        in_range("REMEMBER_ME_DAYS", self.remember_me_days, 1..=3650)?;
        in_range("SESSION_TTL_SECONDS", self.session_ttl_seconds, 1..=31_536_000)?;
        in_range("BCRYPT_COST", self.bcrypt_cost, 4..=31)?;
        in_range(
            "LOCKOUT_MAX_FAILED_ATTEMPTS",
            self.lockout.max_failed_attempts,
            1..=1000,
        )?;
        in_range(
            "LOCKOUT_WINDOW_MINUTES",
            self.lockout.window_minutes,
            1..=MINUTES_PER_YEAR,
        )?;
        in_range(
            "LOCKOUT_DURATION_MINUTES",
            self.lockout.lockout_minutes,
            1..=MINUTES_PER_YEAR,
        )?;
        ensure!(
            self.login_rate_limit.max_requests >= 1,
            "LOGIN_RATE_LIMIT must be at least 1"
        );
        in_range(
            "LOGIN_RATE_WINDOW_SECONDS",
            self.login_rate_limit.window_seconds,
            1..=MAX_RATE_WINDOW_SECONDS,
        )?;
        Ok(())
    }
}

fn in_range<T>(name: &str, value: T, range: RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + Display,
{
    ensure!(
        range.contains(&value),
        "{name} must be between {} and {}, got {value}",
        range.start(),
        range.end()
    );
    Ok(())
}

/// Parses an optional environment variable, falling back to `default` when unset.
fn var_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} must be a valid value")),
        Err(_) => Ok(default),
    }
}
