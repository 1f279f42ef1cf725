//! Module for user account API endpoints.
//!
//! This module handles account registration, the only way user rows are
//! created.

pub mod handlers;
pub mod routes;
