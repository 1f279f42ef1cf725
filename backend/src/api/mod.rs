//! Central module for organizing the application's API endpoints.
//!
//! This module acts as a top-level container for the API domains and
//! assembles them, together with the authentication routes, into the main
//! router.

pub mod common;
pub mod user;

use crate::api::common::ApiResponse;
use crate::auth::middleware::request_context;
use crate::state::AppState;
use axum::{Extension, Router, middleware, response::Json, routing::get};

/// Builds the full application router around `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .merge(crate::auth::routes::auth_router())
        .merge(user::routes::user_router())
        .layer(middleware::from_fn(request_context))
        .layer(Extension(state))
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "E-Learning Auth Backend",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to the E-Learning API",
    ))
}
