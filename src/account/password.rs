//! Password logic.

use std::sync::LazyLock;

use regex_lite::Regex;
use validator::ValidationError;

static PHC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\$([a-z0-9-]{1,32})(?:\$v=(\d+))?(?:\$([^$]+))?\$([^$]+)\$([^$]+)$",
    )
    .unwrap()
});

/// A hashed password stored in the database.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Converts a [`String`] into a valid [`PasswordHash`].
    ///
    /// # Errors
    ///
    /// Returns `Err` unless the string is an Argon2 hash in PHC format, which
    /// also rejects plaintext.
    pub fn parse(
        phc_string: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let phc_string = phc_string.into();
        let is_argon2 = PHC_RE
            .captures(&phc_string)
            .and_then(|caps| caps.get(1))
            .is_some_and(|id| id.as_str().starts_with("argon2"));

        if !is_argon2 {
            return Err(ValidationError::new("invalid_hash")
                .with_message("Password is not an Argon2 PHC hash.".into()));
        }

        Ok(Self(phc_string))
    }

    /// Returns the same string as a string slice `&str`.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHash")
            .field("phc_string", &"[REDACTED]")
            .finish()
    }
}
