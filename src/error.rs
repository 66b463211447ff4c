//! Error handler for gatorrush.

use sqlx::Error as SQLxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::crypto::CryptoError;

pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing account errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error occurred: {}", describe(.0))]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("migration failed: {0}")]
    Migrate(#[from] MigrateError),

    #[error("cannot read configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("missing `{0}` entry in configuration")]
    MissingConfig(&'static str),

    #[error("{field} is already taken")]
    Duplicate { field: String },

    #[error("level does not exist")]
    UnknownLevel,

    #[error("account not found")]
    NotFound,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    Disabled,

    #[error("account already has an identifier")]
    IdAlreadyAssigned,
}

impl Error {
    /// Returns `true` if `field` failed validation.
    pub fn is_invalid(&self, field: &str) -> bool {
        match self {
            Error::Validation(errors) => {
                errors.field_errors().contains_key(field)
            },
            _ => false,
        }
    }
}

/// Wrap a single [`ValidationError`] into [`ValidationErrors`] for `field`.
pub(crate) fn field_error(
    field: &'static str,
    error: ValidationError,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    errors
}

/// Flatten validation errors into `field: message` pairs.
fn describe(errors: &ValidationErrors) -> String {
    let mut issues = errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| match &issue.message {
                Some(message) => format!("{field}: {message}"),
                None => format!("{field}: {}", issue.code),
            })
        })
        .collect::<Vec<_>>();
    issues.sort();
    issues.join(", ")
}
