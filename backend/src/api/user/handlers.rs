//! Handler functions for user account API endpoints.
//!
//! These functions process registration requests, hand them to the
//! `UserService` and return the created account.

use crate::api::common::{
    ApiResponse, error_body, service_error_to_http, validation_error_response,
};
use crate::auth::models::UserInfo;
use crate::database::models::CreateNewUser;
use crate::errors::ServiceError;
use crate::services::user_service::DUPLICATE_ACCOUNT_MESSAGE;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
};
use validator::Validate;

/// Registers a new student or teacher account.
#[axum::debug_handler]
pub async fn register(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateNewUser>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), (StatusCode, String)> {
    if let Err(errors) = payload.validate() {
        return Err(validation_error_response(&errors));
    }

    tracing::info!("Registering user: {}", payload.username);

    let user = state.users.register(payload).await.map_err(|e| match e {
        ServiceError::AlreadyExists { .. } => {
            let error_response =
                ApiResponse::<()>::error(DUPLICATE_ACCOUNT_MESSAGE, "already_exists", None);
            (StatusCode::CONFLICT, error_body(&error_response))
        }
        other => service_error_to_http(other),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            UserInfo::from(&user),
            "Registration successful. Please log in.",
        )),
    ))
}
