//! Password hashing using Argon2id
//!
//! ```rust
//! use devcamper_api::auth::PasswordHasher;
//! use devcamper_api::config::AuthConfig;
//!
//! let hasher = PasswordHasher::new(&AuthConfig {
//!     argon2_memory_kib: 1024,
//!     argon2_iterations: 1,
//!     ..AuthConfig::default()
//! })
//! .unwrap();
//!
//! let hash = hasher.hash("123456").unwrap();
//! assert!(hasher.verify("123456", &hash).unwrap());
//! assert!(!hasher.verify("654321", &hash).unwrap());
//! ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::config::AuthConfig;
use crate::error::{Error, Result};

/// Password hasher using Argon2id
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    min_password_length: usize,
}

impl PasswordHasher {
    /// Create a hasher from the auth configuration
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| Error::Internal(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(Self {
            params,
            min_password_length: config.min_password_length,
        })
    }

    /// Minimum accepted password length
    pub fn min_password_length(&self) -> usize {
        self.min_password_length
    }

    /// Hash a password into a PHC string
    ///
    /// Fails with a validation error when the password is shorter than the
    /// configured minimum.
    pub fn hash(&self, password: &str) -> Result<String> {
        if password.chars().count() < self.min_password_length {
            return Err(Error::ValidationError(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a PHC hash in constant time
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Internal(format!("Invalid password hash format: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Internal(format!("Password verification failed: {e}"))),
        }
    }

    /// Whether a stored value is already an Argon2 hash
    pub fn is_hash(value: &str) -> bool {
        PasswordHash::new(value).is_ok_and(|parsed| parsed.algorithm.as_str().starts_with("argon2"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&AuthConfig {
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
            ..AuthConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("123456").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(PasswordHasher::is_hash(&hash));
        assert!(hasher.verify("123456", &hash).unwrap());
        assert!(!hasher.verify("1234567", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        assert_ne!(hasher.hash("123456").unwrap(), hasher.hash("123456").unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        let err = hasher().hash("12345").unwrap_err();
        assert!(matches!(err, Error::ValidationError(_)));
        assert!(!PasswordHasher::is_hash("123456"));
    }
}
