//! Defines the HTTP routes specifically for authentication.
//!
//! These routes handle login, logout and the current-user lookup. They are
//! designed to be merged into the main Axum router, inside the layers that
//! provide `AppState` and the `RequestContext`.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{
    Router,
    handler::Handler,
    middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route(
            "/login",
            get(login_page).post(login.layer(middleware::from_fn(login_rate_limit))),
        )
        .route("/logout", post(logout).get(logout))
        .route("/me", get(me).layer(middleware::from_fn(session_auth)))
}
