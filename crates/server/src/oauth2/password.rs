//! Argon2id hashes for client secrets and user passwords.
//!
//! [`SecretHash`] is the stored PHC string. Hashing and checking are slow on
//! purpose, so the async entry points run them on the blocking pool.

use crate::error::OAuthError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// A stored Argon2id hash in PHC format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretHash(String);

impl SecretHash {
    /// Hash `secret` with a fresh salt on the calling thread.
    pub fn compute(secret: &str) -> Result<Self, OAuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|phc| Self(phc.to_string()))
            .map_err(|e| OAuthError::PasswordHash(e.to_string()))
    }

    /// Whether `secret` hashes to this value. A malformed stored hash never
    /// matches.
    pub fn matches(&self, secret: &str) -> bool {
        PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok()
        })
    }

    pub async fn compute_blocking(secret: String) -> Result<Self, OAuthError> {
        tokio::task::spawn_blocking(move || Self::compute(&secret))
            .await
            .map_err(|e| OAuthError::PasswordHash(e.to_string()))?
    }

    pub async fn matches_blocking(self, secret: String) -> Result<bool, OAuthError> {
        tokio::task::spawn_blocking(move || self.matches(&secret))
            .await
            .map_err(|e| OAuthError::PasswordHash(e.to_string()))
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SecretHash {
    fn from(stored: String) -> Self {
        Self(stored)
    }
}

impl AsRef<str> for SecretHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_argon2id() {
        let first = SecretHash::compute("s3cr3t").expect("hash");
        let second = SecretHash::compute("s3cr3t").expect("hash");

        assert!(first.as_ref().starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(first.matches("s3cr3t"));
        assert!(second.matches("s3cr3t"));
        assert!(!first.matches("S3CR3T"));
    }

    #[test]
    fn test_malformed_stored_hash_never_matches() {
        for stored in ["", "plaintext", "$argon2id$broken"] {
            assert!(!SecretHash::from(stored.to_string()).matches(""));
            assert!(!SecretHash::from(stored.to_string()).matches(stored));
        }
    }

    #[tokio::test]
    async fn test_blocking_pool_round() {
        let hash = SecretHash::compute_blocking("hunter22".into())
            .await
            .expect("hash");
        assert!(hash.clone().matches_blocking("hunter22".into()).await.expect("verify"));
        assert!(!hash.matches_blocking("hunter23".into()).await.expect("verify"));
    }
}
