//! Account use cases on top of storage and hashing.

use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::account::{
    Account, AccountId, AccountRepository, Fetch, PasswordHash, Username,
};
use crate::crypto::PasswordHasher;
use crate::error::{Error, Result};
use crate::progress::LevelId;
use crate::telemetry::{
    ACCOUNTS_REGISTERED, AUTHENTICATION_FAILURES, HIGH_SCORES_IMPROVED,
};

/// Sign up request.
///
/// Fields are checked when the [`Account`] is built.
#[derive(Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Account manager.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    hasher: Arc<dyn PasswordHasher>,
    /// Hash checked when the username is unknown.
    decoy: Arc<OnceLock<Option<PasswordHash>>>,
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            repo,
            hasher,
            decoy: Arc::default(),
        }
    }

    /// Validate, hash and save a new account.
    pub async fn register(&self, registration: Registration) -> Result<Account> {
        let mut account = Account::new(
            &registration.username,
            &registration.email,
            &registration.password,
            self.hasher.as_ref(),
        )?;

        let id = self.repo.insert(&account).await?;
        account.assign_id(id)?;

        metrics::counter!(ACCOUNTS_REGISTERED).increment(1);
        tracing::info!(account_id = %id, username = %account.username(), "account registered");

        Ok(account)
    }

    /// Check credentials and return the matching usable account.
    ///
    /// Unknown usernames and wrong passwords return the same error after the
    /// same amount of hashing work.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Account> {
        let account = match Username::parse(username) {
            Ok(username) => {
                self.repo.find_by_username(&username, Fetch::Shallow).await?
            },
            Err(_) => None,
        };

        let verified = match &account {
            Some(account) => {
                account.verify_password(password, self.hasher.as_ref()).is_ok()
            },
            None => {
                self.verify_decoy(password);
                false
            },
        };

        let Some(account) = account.filter(|_| verified) else {
            metrics::counter!(AUTHENTICATION_FAILURES).increment(1);
            tracing::warn!(%username, "invalid credentials");
            return Err(Error::InvalidCredentials);
        };

        if !account.usability().is_usable() {
            metrics::counter!(AUTHENTICATION_FAILURES).increment(1);
            tracing::warn!(%username, "disabled account tried to sign in");
            return Err(Error::Disabled);
        }

        Ok(account)
    }

    /// Find an account using its `id`.
    pub async fn find(&self, id: AccountId, fetch: Fetch) -> Result<Account> {
        self.repo.find_by_id(id, fetch).await?.ok_or(Error::NotFound)
    }

    /// Record a challenge-mode score, keeping the best one.
    pub async fn submit_score(&self, id: AccountId, score: i32) -> Result<Account> {
        let update = self.repo.submit_high_score(id, score).await?;

        if update.improved() {
            metrics::counter!(HIGH_SCORES_IMPROVED).increment(1);
            tracing::debug!(
                account_id = %id,
                previous = update.previous,
                score = update.score,
                "high score improved"
            );
        }

        self.find(id, Fetch::Shallow).await
    }

    /// Overwrite the score, whatever its current value.
    pub async fn reset_score(&self, id: AccountId, score: i32) -> Result<Account> {
        self.repo.store_score(id, score).await?;
        self.find(id, Fetch::Shallow).await
    }

    /// Replace the password once the current one is confirmed.
    pub async fn change_password(
        &self,
        id: AccountId,
        current: &str,
        new: &str,
    ) -> Result<Account> {
        let hasher = self.hasher.as_ref();

        self.modify(id, |account| {
            account.verify_password(current, hasher)?;
            account.set_password(new, hasher)
        })
        .await
    }

    pub async fn change_email(&self, id: AccountId, email: &str) -> Result<Account> {
        self.modify(id, |account| account.set_email(email)).await
    }

    pub async fn rename(&self, id: AccountId, username: &str) -> Result<Account> {
        self.modify(id, |account| account.set_username(username)).await
    }

    pub async fn assign_level(
        &self,
        id: AccountId,
        level: Option<LevelId>,
    ) -> Result<Account> {
        self.modify(id, |account| {
            account.set_level(level.map(Into::into));
            Ok(())
        })
        .await
    }

    /// Enable or disable sign in.
    pub async fn set_enabled(&self, id: AccountId, enabled: bool) -> Result<Account> {
        let account = self
            .modify(id, |account| {
                account.set_enabled(enabled);
                Ok(())
            })
            .await?;

        tracing::info!(account_id = %id, enabled, "account usability changed");
        Ok(account)
    }

    /// Delete an account. Storage drops the attempts pointing to it.
    pub async fn delete(&self, id: AccountId) -> Result<()> {
        self.repo.delete(id).await?;

        tracing::info!(account_id = %id, "account deleted");
        Ok(())
    }

    /// Burn one verification on a throwaway hash.
    fn verify_decoy(&self, password: &str) {
        let decoy = self
            .decoy
            .get_or_init(|| self.hasher.hash("gatorrush").ok());

        if let Some(decoy) = decoy {
            let _ = self.hasher.verify(password, decoy);
        }
    }

    /// Load, mutate and save an account.
    ///
    /// The score is never written here.
    async fn modify<F>(&self, id: AccountId, mutate: F) -> Result<Account>
    where
        F: FnOnce(&mut Account) -> Result<()>,
    {
        let mut account = self.find(id, Fetch::Shallow).await?;
        mutate(&mut account)?;
        self.repo.update(&account).await?;

        Ok(account)
    }
}
