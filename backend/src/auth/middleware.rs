//! Middleware for protecting authenticated routes and capturing request facts.
//!
//! `request_context` runs on every route and records the client origin and
//! transport security once. `session_auth` guards routes that need a live
//! session, and `login_rate_limit` caps password attempts per origin.

use crate::api::common::ApiResponse;
use crate::auth::cookies::{SESSION_COOKIE_NAME, read_cookie};
use crate::auth::models::RequestContext;
use crate::auth::rate_limit::RateLimitDecision;
use crate::state::AppState;
use crate::utils::network::{UNKNOWN_ORIGIN, client_ip, is_secure};
use axum::{
    Extension, Json,
    extract::{ConnectInfo, Request},
    http::{StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

/// Attaches a `RequestContext` to the request extensions.
pub async fn request_context(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let trust_proxy_headers = state.authenticator.config().trust_proxy_headers;
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let context = RequestContext {
        client_ip: client_ip(request.headers(), peer, trust_proxy_headers),
        secure: is_secure(request.uri(), request.headers(), trust_proxy_headers),
    };
    request.extensions_mut().insert(context);

    next.run(request).await
}

/// Session authentication middleware
pub async fn session_auth(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let session_id =
        read_cookie(request.headers(), SESSION_COOKIE_NAME).ok_or(StatusCode::UNAUTHORIZED)?;

    match state.authenticator.current_session(&session_id).await {
        Ok(Some(session)) => {
            // Add the session to request extensions for use in handlers
            request.extensions_mut().insert(session);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!("Session lookup failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Per-origin rate limit for password logins.
pub async fn login_rate_limit(
    Extension(state): Extension<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<RequestContext>()
        .map(|context| context.client_ip.clone())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string());

    match state.login_rate_limiter.check(&key, state.clock.now()).await {
        RateLimitDecision::Allowed => next.run(request).await,
        RateLimitDecision::Limited {
            retry_after_seconds,
        } => {
            tracing::warn!("Login rate limit exceeded for {}", key);
            let body = ApiResponse::<()>::error(
                "Too many login attempts. Please try again later.",
                "rate_limited",
                None,
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, retry_after_seconds.to_string())],
                Json(body),
            )
                .into_response()
        }
    }
}
