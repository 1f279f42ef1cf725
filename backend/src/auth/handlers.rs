//! Handler functions for authentication-related API endpoints.
//!
//! These functions read the authentication cookies, hand the request to the
//! `SessionAuthenticator` and translate its outcome into HTTP responses and
//! `Set-Cookie` headers.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::auth::cookies::{
    REMEMBER_ME_COOKIE_NAME, SESSION_COOKIE_NAME, clear_cookie, read_cookie, remember_me_cookie,
    session_cookie,
};
use crate::auth::models::*;
use crate::auth::service::{AuthOutcome, AuthenticatedSession};
use crate::database::models::Session;
use crate::errors::{AuthRejection, ServiceError};
use crate::state::AppState;
use axum::{
    extract::{Extension, Json},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json as ResponseJson, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;

/// `Set-Cookie` headers for a freshly established session.
fn auth_cookies(
    auth: &AuthenticatedSession,
    context: &RequestContext,
    now: DateTime<Utc>,
) -> Result<HeaderMap, (StatusCode, String)> {
    let cookie_error = |e: axum::http::header::InvalidHeaderValue| {
        service_error_to_http(ServiceError::internal_error(format!(
            "Invalid cookie value: {}",
            e
        )))
    };

    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        session_cookie(&auth.session.id, context.secure).map_err(cookie_error)?,
    );
    if let Some(credential) = &auth.remember_me {
        headers.append(
            SET_COOKIE,
            remember_me_cookie(credential, now, context.secure).map_err(cookie_error)?,
        );
    }

    Ok(headers)
}

fn rejection_response(reason: AuthRejection) -> Response {
    let body = ApiResponse::<()>::error(reason.to_string(), reason.error_type(), None);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Checks for an existing login before showing the login form.
///
/// A live session or a valid remember-me cookie short-circuits to the
/// dashboard; anything else asks the client to log in.
#[axum::debug_handler]
pub async fn login_page(
    Extension(state): Extension<AppState>,
    Extension(context): Extension<RequestContext>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let dashboard = state.authenticator.config().main_dashboard_page.clone();
    let session_id = read_cookie(&headers, SESSION_COOKIE_NAME);

    if let Some(id) = session_id.as_deref() {
        let current = state
            .authenticator
            .current_session(id)
            .await
            .map_err(service_error_to_http)?;
        if current.is_some() {
            let body = LoginPageResponse {
                authenticated: true,
                redirect_to: Some(dashboard),
            };
            return Ok(Json(ApiResponse::success(body, "Already logged in")).into_response());
        }
    }

    let mut response_headers = HeaderMap::new();
    let mut message = AuthRejection::TokenInvalid;
    if let Some(cookie) = read_cookie(&headers, REMEMBER_ME_COOKIE_NAME) {
        let outcome = state
            .authenticator
            .authenticate_by_cookie(&cookie, &context, session_id.as_deref())
            .await
            .map_err(service_error_to_http)?;

        match outcome {
            AuthOutcome::Authenticated(auth) => {
                let cookies = auth_cookies(&auth, &context, state.clock.now())?;
                let body = LoginPageResponse {
                    authenticated: true,
                    redirect_to: Some(dashboard),
                };
                return Ok((
                    cookies,
                    Json(ApiResponse::success(body, "Logged in with remember-me")),
                )
                    .into_response());
            }
            AuthOutcome::Rejected(AuthRejection::TokenInvalid) => {
                // Stop the browser from presenting a dead token again.
                if let Ok(cleared) = clear_cookie(REMEMBER_ME_COOKIE_NAME, context.secure) {
                    response_headers.append(SET_COOKIE, cleared);
                }
            }
            // The token stays valid for when the lockout ends.
            AuthOutcome::Rejected(reason) => message = reason,
        }
    }

    let body = LoginPageResponse {
        authenticated: false,
        redirect_to: None,
    };
    Ok((
        response_headers,
        Json(ApiResponse::success(body, message.to_string())),
    )
        .into_response())
}

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    Extension(context): Extension<RequestContext>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, (StatusCode, String)> {
    let prior_session = read_cookie(&headers, SESSION_COOKIE_NAME);

    let outcome = state
        .authenticator
        .authenticate(&payload, &context, prior_session.as_deref())
        .await
        .map_err(service_error_to_http)?;

    match outcome {
        AuthOutcome::Authenticated(auth) => {
            let cookies = auth_cookies(&auth, &context, state.clock.now())?;
            let body = LoginResponse {
                redirect_to: state.authenticator.config().main_dashboard_page.clone(),
                user: UserInfo::from(&auth.user),
                remember_me: auth.remember_me.is_some(),
            };
            Ok((cookies, Json(ApiResponse::success(body, "Login successful"))).into_response())
        }
        AuthOutcome::Rejected(reason) => Ok(rejection_response(reason)),
    }
}

/// Handle user logout request
///
/// Always succeeds: the cookies are cleared even if the server-side cleanup
/// fails.
#[axum::debug_handler]
pub async fn logout(
    Extension(state): Extension<AppState>,
    Extension(context): Extension<RequestContext>,
    headers: HeaderMap,
) -> Response {
    let session_id = read_cookie(&headers, SESSION_COOKIE_NAME);
    let remember_me = read_cookie(&headers, REMEMBER_ME_COOKIE_NAME);

    if let Err(e) = state
        .authenticator
        .logout(session_id.as_deref(), remember_me.as_deref())
        .await
    {
        tracing::error!("Logout cleanup failed: {}", e);
    }

    let mut response_headers = HeaderMap::new();
    if let Ok(cleared) = clear_cookie(SESSION_COOKIE_NAME, context.secure) {
        response_headers.append(SET_COOKIE, cleared);
    }
    if remember_me.is_some() {
        if let Ok(cleared) = clear_cookie(REMEMBER_ME_COOKIE_NAME, context.secure) {
            response_headers.append(SET_COOKIE, cleared);
        }
    }

    (
        response_headers,
        Json(ApiResponse::success(
            json!({ "redirect_to": "/login" }),
            "Logged out successfully",
        )),
    )
        .into_response()
}

/// Returns the user bound to the current session.
#[axum::debug_handler]
pub async fn me(
    Extension(state): Extension<AppState>,
    Extension(session): Extension<Session>,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, (StatusCode, String)> {
    let user = state
        .authenticator
        .session_user(&session)
        .await
        .map_err(service_error_to_http)?
        .ok_or_else(|| {
            service_error_to_http(ServiceError::not_found(
                "User",
                session.user_id.to_string(),
            ))
        })?;

    Ok(ResponseJson(ApiResponse::ok(UserInfo::from(&user))))
}
