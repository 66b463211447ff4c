//! Username logic management.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{4,15}$").unwrap());

/// Value object of a valid login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Converts a string into a valid [`Username`].
    ///
    /// The input is lowercased first, so `"Gator42"` is stored as
    /// `"gator42"`.
    ///
    /// # Errors
    ///
    /// Returns `Err` unless the lowercased string is 4 to 15 ASCII letters or
    /// digits.
    pub fn parse(username: impl AsRef<str>) -> Result<Self, ValidationError> {
        let username = username.as_ref().to_lowercase();

        if USERNAME_RE.is_match(&username) {
            Ok(Self(username))
        } else {
            Err(ValidationError::new("invalid_username")
                .with_message("Invalid username format.".into()))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
