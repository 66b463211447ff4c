mod email;
mod password;
mod repository;
mod service;
mod username;

pub use email::*;
pub use password::*;
pub use repository::*;
pub use service::*;
pub use username::*;

use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::crypto::PasswordHasher;
use crate::error::{Error, Result, field_error};
use crate::progress::{Attempt, Level};

/// Identifier assigned by the storage layer on first save.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered player.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Account {
    id: Option<AccountId>,
    username: Username,
    email: EmailAddress,
    #[serde(skip)]
    password: PasswordHash,
    enabled: bool,
    level: Option<Level>,
    attempts: Vec<Attempt>,
    score: i32,
}

/// Whether an account may be used to sign in.
///
/// Expiry, lock and credential checks all collapse to the `enabled` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usability {
    enabled: bool,
}

impl Usability {
    #[inline]
    pub fn is_usable(&self) -> bool {
        self.enabled
    }
}

/// What the authentication collaborator reads from an [`Account`].
#[derive(Debug, Clone, Copy)]
pub struct AccountDetails<'a> {
    pub username: &'a Username,
    pub password: &'a PasswordHash,
    pub usability: Usability,
}

/// Stored columns of an [`Account`], used to rebuild it from storage.
#[derive(Debug, Clone)]
pub struct StoredAccount {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub enabled: bool,
    pub level: Option<Level>,
    pub score: i32,
}

impl StoredAccount {
    /// Columns to store for `account` under `id`.
    pub fn from_account(id: AccountId, account: &Account) -> Self {
        Self {
            id,
            username: account.username.to_string(),
            email: account.email.to_string(),
            password: account.password.as_str().to_owned(),
            enabled: account.enabled,
            level: account.level,
            score: account.score,
        }
    }
}

impl Account {
    /// Create a new [`Account`].
    ///
    /// Username and email are both validated before the password is hashed,
    /// so a failure leaves nothing behind and reports every invalid field.
    pub fn new(
        username: &str,
        email: &str,
        password: &str,
        hasher: &dyn PasswordHasher,
    ) -> Result<Self> {
        let mut errors = ValidationErrors::new();
        let username = Username::parse(username)
            .map_err(|err| errors.add("username", err))
            .ok();
        let email = EmailAddress::parse(email)
            .map_err(|err| errors.add("email", err))
            .ok();

        let (Some(username), Some(email)) = (username, email) else {
            return Err(Error::Validation(errors));
        };

        Ok(Self {
            id: None,
            username,
            email,
            password: hasher.hash(password)?,
            enabled: true,
            level: None,
            attempts: Vec::new(),
            score: 0,
        })
    }

    /// Rebuild an [`Account`] read from storage.
    ///
    /// Every stored value is parsed again; corrupted rows are rejected.
    pub fn restore(stored: StoredAccount, attempts: Vec<Attempt>) -> Result<Self> {
        let username = Username::parse(&stored.username)
            .map_err(|err| field_error("username", err))?;
        let email = EmailAddress::parse(&stored.email)
            .map_err(|err| field_error("email", err))?;
        let password = PasswordHash::parse(stored.password)
            .map_err(|err| field_error("password", err))?;

        Ok(Self {
            id: Some(stored.id),
            username,
            email,
            password,
            enabled: stored.enabled,
            level: stored.level,
            attempts,
            score: stored.score,
        })
    }

    pub fn id(&self) -> Option<AccountId> {
        self.id
    }

    /// Record the identifier handed out by storage.
    pub fn assign_id(&mut self, id: AccountId) -> Result<()> {
        if self.id.is_some() {
            return Err(Error::IdAlreadyAssigned);
        }

        self.id = Some(id);
        Ok(())
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn set_username(&mut self, username: &str) -> Result<()> {
        self.username = Username::parse(username)
            .map_err(|err| field_error("username", err))?;
        Ok(())
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn set_email(&mut self, email: &str) -> Result<()> {
        self.email = EmailAddress::parse(email)
            .map_err(|err| field_error("email", err))?;
        Ok(())
    }

    /// Stored hash. Never the plaintext.
    pub fn password(&self) -> &PasswordHash {
        &self.password
    }

    /// Hash `password` and replace the stored hash.
    ///
    /// Any password is accepted; only the hashing backend can fail.
    pub fn set_password(
        &mut self,
        password: &str,
        hasher: &dyn PasswordHasher,
    ) -> Result<()> {
        self.password = hasher.hash(password)?;
        Ok(())
    }

    /// Check a plaintext against the stored hash.
    pub fn verify_password(
        &self,
        password: &str,
        hasher: &dyn PasswordHasher,
    ) -> Result<()> {
        hasher.verify(password, &self.password)?;
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    pub fn usability(&self) -> Usability {
        Usability {
            enabled: self.enabled,
        }
    }

    pub fn details(&self) -> AccountDetails<'_> {
        AccountDetails {
            username: &self.username,
            password: &self.password,
            usability: self.usability(),
        }
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn set_level(&mut self, level: Option<Level>) -> &mut Self {
        self.level = level;
        self
    }

    /// Attempts loaded alongside the account, empty unless requested.
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn set_score(&mut self, score: i32) -> &mut Self {
        self.score = score;
        self
    }

    /// Keep the best of the current score and `score`.
    pub fn set_high_score(&mut self, score: i32) -> &mut Self {
        self.score = self.score.max(score);
        self
    }
}
