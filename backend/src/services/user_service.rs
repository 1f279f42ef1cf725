//! User business logic service.
//!
//! Registration is the only producer of user rows; the authenticator only
//! ever reads them.

use crate::auth::credentials::CredentialVerifier;
use crate::database::models::{CreateNewUser, CreateUser, RegistrationType, User};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use crate::utils::clock::Clock;
use std::sync::Arc;

pub const DUPLICATE_ACCOUNT_MESSAGE: &str = "An account already exists for that email or username.";

pub struct UserService {
    repo: UserRepository,
    verifier: Arc<dyn CredentialVerifier>,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `repo` - User repository
    /// * `verifier` - Hashes the submitted password before it is stored
    /// * `clock` - Source of the creation timestamp
    pub fn new(
        repo: UserRepository,
        verifier: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            verifier,
            clock,
        }
    }

    /// Registers a new student or teacher account.
    ///
    /// Field-level checks (presence, e-mail shape) run in the HTTP handler
    /// before this is called; only the rules that need context live here.
    ///
    /// # Arguments
    /// * `create_user` - Registration payload
    ///
    /// # Returns
    /// The newly created User with all fields populated
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Blank names or username
    /// - Business rule violations (teachers need an `.edu` address)
    /// - Duplicate username or email
    pub async fn register(&self, create_user: CreateNewUser) -> ServiceResult<User> {
        self.validate_business_rules(&create_user)?;

        if self.repo.username_exists(&create_user.username).await?
            || self.repo.email_exists(&create_user.email).await?
        {
            return Err(ServiceError::already_exists(
                "User",
                &create_user.username,
            ));
        }

        let password_hash = self.verifier.hash_secret(&create_user.password)?;
        let is_teacher = create_user.registration_type == RegistrationType::Teacher;

        let data = CreateUser {
            first_name: create_user.first_name.trim().to_string(),
            last_name: create_user.last_name.trim().to_string(),
            email: create_user.email,
            username: create_user.username,
            password_hash,
            is_teacher,
            is_student: !is_teacher,
            // Teachers are listed publicly, students are not.
            is_public: is_teacher,
            created_at: self.clock.now(),
        };

        let user = self.repo.create_user(data).await?;
        tracing::info!("Registered user {} ({:?})", user.id, create_user.registration_type);
        Ok(user)
    }

    /// Business validation rules.
    fn validate_business_rules(&self, create_user: &CreateNewUser) -> ServiceResult<()> {
        if create_user.first_name.trim().is_empty() {
            return Err(ServiceError::validation("Missing first name value."));
        }
        if create_user.last_name.trim().is_empty() {
            return Err(ServiceError::validation("Missing last name value."));
        }
        if create_user.username.trim().is_empty() {
            return Err(ServiceError::validation("Missing username value."));
        }

        if create_user.registration_type == RegistrationType::Teacher
            && !create_user.email.to_ascii_lowercase().ends_with(".edu")
        {
            return Err(ServiceError::validation(
                "Teachers must register with an .edu email address.",
            ));
        }

        Ok(())
    }
}
