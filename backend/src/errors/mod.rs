//! Global application error types.
//!
//! `ServiceError` carries faults that should abort a request (bad input,
//! missing entities, storage failures). Authentication rejections are not
//! faults: they are ordinary outcomes and are modelled by `AuthRejection`.

use thiserror::Error;

/// Generic service error that can be used across all entities
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("{entity} already exists: {identifier}")]
    AlreadyExists { entity: String, identifier: String },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn already_exists(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Why an authentication attempt did not produce a session.
///
/// The display text is what the client sees. Unknown usernames, wrong
/// passwords and missing credentials all collapse into `InvalidCredentials`
/// so the response never reveals whether a username exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Your account is locked. Please try again later or contact support.")]
    AccountLocked,

    /// Remember-me token not accepted; callers fall through to the login page.
    #[error("Please log in to continue.")]
    TokenInvalid,
}

impl AuthRejection {
    /// Machine-readable identifier used in API error payloads.
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthRejection::InvalidCredentials => "invalid_credentials",
            AuthRejection::AccountLocked => "account_locked",
            AuthRejection::TokenInvalid => "token_invalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            AuthRejection::InvalidCredentials.to_string(),
            "Invalid username or password."
        );
        assert_eq!(
            AuthRejection::AccountLocked.to_string(),
            "Your account is locked. Please try again later or contact support."
        );
        assert_eq!(AuthRejection::AccountLocked.error_type(), "account_locked");
    }

    #[test]
    fn test_anyhow_converts_to_database_error() {
        let error: ServiceError = anyhow::anyhow!("disk I/O error").into();
        assert!(matches!(error, ServiceError::Database { .. }));
    }
}
