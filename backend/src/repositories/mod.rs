//! Data access layer.
//!
//! One repository per table, each wrapping the shared SQLite pool and
//! implementing the matching collaborator trait from `crate::auth::store`.

pub mod account_lockout_repository;
pub mod login_attempt_repository;
pub mod remember_me_token_repository;
pub mod session_repository;
pub mod user_repository;
