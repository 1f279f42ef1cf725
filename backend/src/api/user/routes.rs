//! Defines the HTTP routes for user account management.

use super::handlers::register;
use axum::{Router, routing::post};

pub fn user_router() -> Router {
    Router::new().route("/registration", post(register))
}
