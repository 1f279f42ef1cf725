//! Data structures for authentication-related entities.
//!
//! This module defines the request and response payloads of the login
//! endpoints and the per-request context the middleware attaches.

use crate::database::models::User;
use serde::{Deserialize, Serialize};

/// Login request payload.
///
/// Fields are optional so that a missing username or password is handled as
/// an ordinary credential rejection rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default, alias = "remember-me")]
    pub remember_me: bool,
}

impl LoginRequest {
    /// Username, treating an empty string as absent.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|value| !value.is_empty())
    }

    /// Password, treating an empty string as absent.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|value| !value.is_empty())
    }
}

/// Successful login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub redirect_to: String,
    pub user: UserInfo,
    pub remember_me: bool,
}

/// Result of probing an existing session or remember-me cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginPageResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

/// User information returned to authenticated clients
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_teacher: bool,
    pub is_student: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            is_teacher: user.is_teacher,
            is_student: user.is_student,
        }
    }
}

/// Client facts captured once per request by `middleware::request_context`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Client IP address, or `"unknown"`.
    pub client_ip: String,
    /// Whether the request arrived over TLS; decides the `Secure` cookie flag.
    pub secure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_treats_empty_as_missing() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"username": "", "password": "secret"}"#).unwrap();
        assert_eq!(request.username(), None);
        assert_eq!(request.password(), Some("secret"));
        assert!(!request.remember_me);
    }

    #[test]
    fn test_login_request_accepts_form_style_flag() {
        let request: LoginRequest = serde_json::from_str(
            r#"{"username": "alice", "password": "pw", "remember-me": true}"#,
        )
        .unwrap();
        assert!(request.remember_me);

        let empty: LoginRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.username(), None);
        assert_eq!(empty.password(), None);
    }
}
