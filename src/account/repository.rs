//! Identity port between the account and the storage layer.

use crate::account::{Account, AccountId, EmailAddress, Username};
use crate::error::Result;

/// Which relationships to load with an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fetch {
    /// Account row only; attempts are left empty.
    #[default]
    Shallow,
    /// Account and the attempts pointing back to it.
    WithAttempts,
}

/// Outcome of an atomic high score submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    /// Score stored before the submission.
    pub previous: i32,
    /// Score stored after the submission.
    pub score: i32,
}

impl ScoreUpdate {
    #[inline]
    pub fn improved(&self) -> bool {
        self.score > self.previous
    }
}

/// Port for account persistence.
///
/// Implementations generate identifiers and enforce username and email
/// uniqueness, reporting conflicts as [`Error::Duplicate`].
///
/// [`Error::Duplicate`]: crate::error::Error::Duplicate
#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync {
    /// Save a new account and return its generated identifier.
    async fn insert(&self, account: &Account) -> Result<AccountId>;

    /// Overwrite a saved account, except its score.
    ///
    /// Scores only change through [`submit_high_score`] and [`store_score`],
    /// so a stale copy can never roll a score back.
    ///
    /// [`submit_high_score`]: AccountRepository::submit_high_score
    /// [`store_score`]: AccountRepository::store_score
    async fn update(&self, account: &Account) -> Result<()>;

    /// Keep the best of the stored score and `score` in a single write.
    async fn submit_high_score(
        &self,
        id: AccountId,
        score: i32,
    ) -> Result<ScoreUpdate>;

    /// Overwrite the stored score.
    async fn store_score(&self, id: AccountId, score: i32) -> Result<()>;

    async fn find_by_id(
        &self,
        id: AccountId,
        fetch: Fetch,
    ) -> Result<Option<Account>>;

    async fn find_by_username(
        &self,
        username: &Username,
        fetch: Fetch,
    ) -> Result<Option<Account>>;

    async fn find_by_email(
        &self,
        email: &EmailAddress,
        fetch: Fetch,
    ) -> Result<Option<Account>>;

    async fn delete(&self, id: AccountId) -> Result<()>;
}
