//! Password hashing service.

use argon2::password_hash::{
    PasswordHash as PhcString, PasswordHasher as _, PasswordVerifier,
    SaltString,
};
use argon2::{Argon2, Params, Version};
use rand::rngs::OsRng;
use validator::{ValidationError, ValidationErrors};

use crate::account::PasswordHash;
use crate::config::Argon2 as ArgonConfig;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("argon2 error: {0}")]
    Argon2(String),
}

/// One-way, salted password hashing.
///
/// Injected wherever a plaintext password enters an
/// [`Account`](crate::account::Account).
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` with a fresh salt.
    fn hash(&self, password: &str) -> Result<PasswordHash>;

    /// Verify `password` against a stored hash.
    fn verify(
        &self,
        password: &str,
        hash: &PasswordHash,
    ) -> std::result::Result<(), ValidationErrors>;
}

/// Password manager that uses Argon2id and PHC string format for hashing and
/// verification.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Create a new [`Argon2Hasher`].
    pub fn new(config: Option<ArgonConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let params = Params::new(
            config.memory_cost,
            config.iterations,
            config.parallelism,
            Some(config.hash_length),
        )
        .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
    }

    fn invalid_password() -> ValidationErrors {
        crate::error::field_error(
            "password",
            ValidationError::new("invalid_password")
                .with_message("Invalid password.".into()),
        )
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<PasswordHash> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| CryptoError::Argon2(e.to_string()))?;

        PasswordHash::parse(hash.to_string())
            .map_err(|_| CryptoError::Argon2("malformed PHC string".into()))
    }

    fn verify(
        &self,
        password: &str,
        hash: &PasswordHash,
    ) -> std::result::Result<(), ValidationErrors> {
        let parsed = PhcString::new(hash.as_str())
            .map_err(|_| Self::invalid_password())?;

        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| Self::invalid_password())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Cheap parameters, hashing with defaults is too slow for unit tests.
    pub(crate) fn hasher() -> Argon2Hasher {
        Argon2Hasher::new(Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_is_salted_phc() {
        let hasher = hasher();

        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();

        assert!(first.as_str().starts_with("$argon2id$v=19$"));
        assert_ne!(first.as_str(), "secret");
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify() {
        let hasher = hasher();
        let hash = hasher.hash("secret").unwrap();

        assert!(hasher.verify("secret", &hash).is_ok());
        let errors = hasher.verify("Secret", &hash).unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_empty_password_is_hashed() {
        let hasher = hasher();
        let hash = hasher.hash("").unwrap();

        assert!(hasher.verify("", &hash).is_ok());
    }

    #[test]
    fn test_invalid_params() {
        let config = ArgonConfig {
            parallelism: 0,
            ..Default::default()
        };

        assert!(matches!(
            Argon2Hasher::new(Some(config)),
            Err(CryptoError::Argon2(_))
        ));
    }
}
