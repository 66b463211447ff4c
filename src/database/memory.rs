//! In-process account storage.

use std::collections::{BTreeMap, BTreeSet};

use tokio::sync::RwLock;

use crate::account::{
    Account, AccountId, AccountRepository, EmailAddress, Fetch, ScoreUpdate,
    StoredAccount, Username,
};
use crate::error::{Error, Result};
use crate::progress::{Attempt, AttemptId, LevelId};

/// Account repository kept in memory.
///
/// Applies the same uniqueness and level reference rules as PostgreSQL.
#[derive(Debug, Default)]
pub struct MemoryAccountRepository {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sequence: i64,
    accounts: BTreeMap<AccountId, StoredAccount>,
    levels: BTreeSet<LevelId>,
    attempts: Vec<Attempt>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// Reject `account` if another row already uses its username or email.
    fn check_unique(&self, account: &Account) -> Result<()> {
        let others = self
            .accounts
            .values()
            .filter(|stored| Some(stored.id) != account.id());

        for stored in others {
            if stored.username == account.username().as_str() {
                return Err(Error::Duplicate {
                    field: "username".into(),
                });
            }
            if stored.email == account.email().as_str() {
                return Err(Error::Duplicate {
                    field: "email".into(),
                });
            }
        }

        Ok(())
    }

    fn check_level(&self, account: &Account) -> Result<()> {
        match account.level() {
            Some(level) if !self.levels.contains(&level.id) => {
                Err(Error::UnknownLevel)
            },
            _ => Ok(()),
        }
    }

    fn stored_mut(&mut self, id: AccountId) -> Result<&mut StoredAccount> {
        self.accounts.get_mut(&id).ok_or(Error::NotFound)
    }

    fn load(&self, stored: &StoredAccount, fetch: Fetch) -> Result<Account> {
        let attempts = match fetch {
            Fetch::Shallow => Vec::new(),
            Fetch::WithAttempts => self
                .attempts
                .iter()
                .filter(|attempt| attempt.account == stored.id)
                .copied()
                .collect(),
        };

        Account::restore(stored.clone(), attempts)
    }

    fn find(
        &self,
        fetch: Fetch,
        predicate: impl Fn(&StoredAccount) -> bool,
    ) -> Result<Option<Account>> {
        self.accounts
            .values()
            .find(|stored| predicate(stored))
            .map(|stored| self.load(stored, fetch))
            .transpose()
    }
}

impl MemoryAccountRepository {
    /// Mint a level identifier accounts can point to.
    pub async fn add_level(&self) -> LevelId {
        let mut inner = self.inner.write().await;
        let id = LevelId(inner.next_id());
        inner.levels.insert(id);
        id
    }

    /// Record an attempt made by `account`.
    pub async fn add_attempt(&self, account: AccountId) -> Result<Attempt> {
        let mut inner = self.inner.write().await;
        if !inner.accounts.contains_key(&account) {
            return Err(Error::NotFound);
        }

        let attempt = Attempt {
            id: AttemptId(inner.next_id()),
            account,
        };
        inner.attempts.push(attempt);
        Ok(attempt)
    }
}

#[async_trait::async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn insert(&self, account: &Account) -> Result<AccountId> {
        if account.id().is_some() {
            return Err(Error::IdAlreadyAssigned);
        }

        let mut inner = self.inner.write().await;
        inner.check_unique(account)?;
        inner.check_level(account)?;

        let id = AccountId(inner.next_id());
        inner
            .accounts
            .insert(id, StoredAccount::from_account(id, account));

        Ok(id)
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let id = account.id().ok_or(Error::NotFound)?;

        let mut inner = self.inner.write().await;
        let score = inner.stored_mut(id)?.score;
        inner.check_unique(account)?;
        inner.check_level(account)?;
        inner.accounts.insert(
            id,
            StoredAccount {
                score,
                ..StoredAccount::from_account(id, account)
            },
        );

        Ok(())
    }

    async fn submit_high_score(
        &self,
        id: AccountId,
        score: i32,
    ) -> Result<ScoreUpdate> {
        let mut inner = self.inner.write().await;
        let stored = inner.stored_mut(id)?;
        let previous = stored.score;
        stored.score = previous.max(score);

        Ok(ScoreUpdate {
            previous,
            score: stored.score,
        })
    }

    async fn store_score(&self, id: AccountId, score: i32) -> Result<()> {
        self.inner.write().await.stored_mut(id)?.score = score;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: AccountId,
        fetch: Fetch,
    ) -> Result<Option<Account>> {
        let inner = self.inner.read().await;
        inner.find(fetch, |stored| stored.id == id)
    }

    async fn find_by_username(
        &self,
        username: &Username,
        fetch: Fetch,
    ) -> Result<Option<Account>> {
        let inner = self.inner.read().await;
        inner.find(fetch, |stored| stored.username == username.as_str())
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
        fetch: Fetch,
    ) -> Result<Option<Account>> {
        let inner = self.inner.read().await;
        inner.find(fetch, |stored| stored.email == email.as_str())
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.accounts.remove(&id).is_none() {
            return Err(Error::NotFound);
        }
        inner.attempts.retain(|attempt| attempt.account != id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::tests::hasher;

    fn account(username: &str, email: &str) -> Account {
        Account::new(username, email, "secret", &hasher()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_generates_ids() {
        let repo = MemoryAccountRepository::default();

        let first = repo.insert(&account("gator", "gator@ufl.edu")).await.unwrap();
        let second = repo.insert(&account("albert", "albert@ufl.edu")).await.unwrap();

        assert_ne!(first, second);
        let found = repo.find_by_id(second, Fetch::Shallow).await.unwrap().unwrap();
        assert_eq!(found.id(), Some(second));
        assert_eq!(found.username().as_str(), "albert");
    }

    #[tokio::test]
    async fn test_insert_rejects_saved_account() {
        let repo = MemoryAccountRepository::default();
        let mut saved = account("gator", "gator@ufl.edu");
        let id = repo.insert(&saved).await.unwrap();
        saved.assign_id(id).unwrap();

        assert!(matches!(
            repo.insert(&saved).await,
            Err(Error::IdAlreadyAssigned)
        ));
    }

    #[tokio::test]
    async fn test_uniqueness() {
        let repo = MemoryAccountRepository::default();
        repo.insert(&account("gator", "gator@ufl.edu")).await.unwrap();
        let id = repo.insert(&account("albert", "albert@ufl.edu")).await.unwrap();

        let err = repo
            .insert(&account("gator", "other@ufl.edu"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Duplicate { ref field } if field == "username"));

        let mut albert = repo.find_by_id(id, Fetch::Shallow).await.unwrap().unwrap();
        albert.set_email("gator@ufl.edu").unwrap();
        let err = repo.update(&albert).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate { ref field } if field == "email"));

        // Saving an account with its own values is not a conflict.
        albert.set_email("albert@ufl.edu").unwrap();
        repo.update(&albert).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_keeps_stored_score() {
        let repo = MemoryAccountRepository::default();
        let id = repo.insert(&account("gator", "gator@ufl.edu")).await.unwrap();
        let mut stale = repo.find_by_id(id, Fetch::Shallow).await.unwrap().unwrap();

        let update = repo.submit_high_score(id, 99).await.unwrap();
        assert_eq!(update, ScoreUpdate { previous: 0, score: 99 });
        assert!(update.improved());

        stale.set_username("albert").unwrap();
        stale.set_score(0);
        repo.update(&stale).await.unwrap();

        let stored = repo.find_by_id(id, Fetch::Shallow).await.unwrap().unwrap();
        assert_eq!(stored.username().as_str(), "albert");
        assert_eq!(stored.score(), 99);
    }

    #[tokio::test]
    async fn test_submit_high_score_keeps_best() {
        let repo = MemoryAccountRepository::default();
        let id = repo.insert(&account("gator", "gator@ufl.edu")).await.unwrap();

        repo.store_score(id, 10).await.unwrap();
        let update = repo.submit_high_score(id, 5).await.unwrap();
        assert_eq!(update, ScoreUpdate { previous: 10, score: 10 });
        assert!(!update.improved());

        repo.store_score(id, -1).await.unwrap();
        let stored = repo.find_by_id(id, Fetch::Shallow).await.unwrap().unwrap();
        assert_eq!(stored.score(), -1);

        assert!(matches!(
            repo.submit_high_score(AccountId(404), 1).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            repo.store_score(AccountId(404), 1).await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_level_must_exist() {
        let repo = MemoryAccountRepository::default();
        let id = repo.insert(&account("gator", "gator@ufl.edu")).await.unwrap();
        let mut gator = repo.find_by_id(id, Fetch::Shallow).await.unwrap().unwrap();

        gator.set_level(Some(LevelId(404).into()));
        assert!(matches!(repo.update(&gator).await, Err(Error::UnknownLevel)));

        let mut unsaved = account("albert", "albert@ufl.edu");
        unsaved.set_level(Some(LevelId(404).into()));
        assert!(matches!(repo.insert(&unsaved).await, Err(Error::UnknownLevel)));

        let level = repo.add_level().await;
        gator.set_level(Some(level.into()));
        repo.update(&gator).await.unwrap();
    }

    #[tokio::test]
    async fn test_find_by_username_and_email() {
        let repo = MemoryAccountRepository::default();
        let id = repo.insert(&account("gator", "gator@ufl.edu")).await.unwrap();

        let username = Username::parse("gator").unwrap();
        let email = EmailAddress::parse("GATOR@ufl.edu").unwrap();
        let by_name = repo.find_by_username(&username, Fetch::Shallow).await.unwrap();
        let by_email = repo.find_by_email(&email, Fetch::Shallow).await.unwrap();

        assert_eq!(by_name.and_then(|a| a.id()), Some(id));
        assert_eq!(by_email.and_then(|a| a.id()), Some(id));

        let unknown = Username::parse("nobody").unwrap();
        assert!(repo
            .find_by_username(&unknown, Fetch::Shallow)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_unknown() {
        let repo = MemoryAccountRepository::default();
        let unsaved = account("gator", "gator@ufl.edu");

        assert!(matches!(repo.update(&unsaved).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_attempts_are_fetched_on_demand() {
        let repo = MemoryAccountRepository::default();
        let gator = repo.insert(&account("gator", "gator@ufl.edu")).await.unwrap();
        let albert = repo.insert(&account("albert", "albert@ufl.edu")).await.unwrap();

        repo.add_attempt(gator).await.unwrap();
        repo.add_attempt(gator).await.unwrap();
        repo.add_attempt(albert).await.unwrap();
        assert!(matches!(
            repo.add_attempt(AccountId(404)).await,
            Err(Error::NotFound)
        ));

        let shallow = repo.find_by_id(gator, Fetch::Shallow).await.unwrap().unwrap();
        assert!(shallow.attempts().is_empty());

        let full = repo
            .find_by_id(gator, Fetch::WithAttempts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(full.attempts().len(), 2);
        assert!(full.attempts().iter().all(|a| a.account == gator));

        repo.delete(gator).await.unwrap();
        let full = repo
            .find_by_id(albert, Fetch::WithAttempts)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(full.attempts().len(), 1);
        assert!(repo.find_by_id(gator, Fetch::Shallow).await.unwrap().is_none());
    }
}
