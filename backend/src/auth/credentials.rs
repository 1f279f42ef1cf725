//! Password hashing and verification.

use crate::errors::{ServiceError, ServiceResult};
use bcrypt::{hash, verify};

/// Opaque hash/verify capability used for stored passwords.
pub trait CredentialVerifier: Send + Sync {
    fn hash_secret(&self, plain: &str) -> ServiceResult<String>;

    fn verify_secret(&self, plain: &str, stored_hash: &str) -> ServiceResult<bool>;
}

/// bcrypt-backed verifier.
#[derive(Debug, Clone, Copy)]
pub struct BcryptVerifier {
    cost: u32,
}

impl BcryptVerifier {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl CredentialVerifier for BcryptVerifier {
    fn hash_secret(&self, plain: &str) -> ServiceResult<String> {
        hash(plain, self.cost)
            .map_err(|e| ServiceError::internal_error(format!("Password hashing failed: {}", e)))
    }

    /// A malformed stored hash is a data fault, not a wrong password.
    fn verify_secret(&self, plain: &str, stored_hash: &str) -> ServiceResult<bool> {
        verify(plain, stored_hash).map_err(|e| {
            ServiceError::internal_error(format!("Password verification failed: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let verifier = BcryptVerifier::new(4);
        let stored = verifier.hash_secret("correct horse").unwrap();

        assert_ne!(stored, "correct horse");
        assert!(verifier.verify_secret("correct horse", &stored).unwrap());
        assert!(!verifier.verify_secret("battery staple", &stored).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let verifier = BcryptVerifier::new(4);
        assert!(verifier.verify_secret("anything", "not-a-bcrypt-hash").is_err());
    }
}
