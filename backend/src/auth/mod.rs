//! Authentication module for password logins, remember-me tokens and sessions.
//!
//! This module provides the authenticator with its lockout policy, the
//! storage traits it depends on, the cookie codec, and the HTTP handlers and
//! middleware built on top of them.

pub mod cookies;
pub mod credentials;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod remember_me;
pub mod routes;
pub mod service;
pub mod store;
