//! PostgreSQL implementation for account repository.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgQueryResult;

use crate::account::{
    Account, AccountId, AccountRepository, EmailAddress, Fetch, ScoreUpdate,
    StoredAccount, Username,
};
use crate::error::{Error, Result};
use crate::progress::{Attempt, AttemptId, Level, LevelId};

const USERNAME_CONSTRAINT: &str = "accounts_username_key";
const EMAIL_CONSTRAINT: &str = "accounts_email_key";
const LEVEL_CONSTRAINT: &str = "accounts_level_id_fkey";

/// Account record as stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AccountRecord {
    id: i64,
    username: String,
    email: String,
    password: String,
    enabled: bool,
    level_id: Option<i64>,
    score: i32,
}

impl From<AccountRecord> for StoredAccount {
    fn from(record: AccountRecord) -> Self {
        Self {
            id: AccountId(record.id),
            username: record.username,
            email: record.email,
            password: record.password,
            enabled: record.enabled,
            level: record.level_id.map(|id| Level { id: LevelId(id) }),
            score: record.score,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Username,
    Email,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::Username => write!(f, "username"),
            Field::Email => write!(f, "email"),
        }
    }
}

fn get_by_field_query(field: Field) -> String {
    format!(
        r#"SELECT id, username, email, password, enabled, level_id, score
            FROM accounts
            WHERE {field} = $1"#
    )
}

/// Turn constraint violations into [`Error::Duplicate`] or
/// [`Error::UnknownLevel`].
fn conflict(err: sqlx::Error) -> Error {
    let constraint = match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            db.constraint()
        },
        _ => None,
    };

    match constraint {
        Some(USERNAME_CONSTRAINT) => Error::Duplicate {
            field: "username".into(),
        },
        Some(EMAIL_CONSTRAINT) => Error::Duplicate {
            field: "email".into(),
        },
        Some(LEVEL_CONSTRAINT) => Error::UnknownLevel,
        _ => err.into(),
    }
}

/// PostgreSQL account repository.
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new [`PgAccountRepository`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach relationships requested by `fetch` to a fetched row.
    async fn load(
        &self,
        record: Option<AccountRecord>,
        fetch: Fetch,
    ) -> Result<Option<Account>> {
        let Some(record) = record else {
            return Ok(None);
        };

        let attempts = match fetch {
            Fetch::Shallow => Vec::new(),
            Fetch::WithAttempts => self.attempts(AccountId(record.id)).await?,
        };

        Account::restore(record.into(), attempts).map(Some)
    }

    async fn attempts(&self, account: AccountId) -> Result<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, (i64,)>(
            r#"SELECT id FROM attempts WHERE account_id = $1 ORDER BY id"#,
        )
        .bind(account.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id,)| Attempt {
                id: AttemptId(id),
                account,
            })
            .collect())
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn insert(&self, account: &Account) -> Result<AccountId> {
        if account.id().is_some() {
            return Err(Error::IdAlreadyAssigned);
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO accounts (username, email, password, enabled, level_id, score)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id"#,
        )
        .bind(account.username().as_str())
        .bind(account.email().as_str())
        .bind(account.password().as_str())
        .bind(account.is_enabled())
        .bind(account.level().map(|level| level.id.0))
        .bind(account.score())
        .fetch_one(&self.pool)
        .await
        .map_err(conflict)?;

        Ok(AccountId(id))
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let id = account.id().ok_or(Error::NotFound)?;

        let result: PgQueryResult = sqlx::query(
            r#"UPDATE accounts
                SET username = $2, email = $3, password = $4, enabled = $5, level_id = $6
                WHERE id = $1"#,
        )
        .bind(id.0)
        .bind(account.username().as_str())
        .bind(account.email().as_str())
        .bind(account.password().as_str())
        .bind(account.is_enabled())
        .bind(account.level().map(|level| level.id.0))
        .execute(&self.pool)
        .await
        .map_err(conflict)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn submit_high_score(
        &self,
        id: AccountId,
        score: i32,
    ) -> Result<ScoreUpdate> {
        // The row lock taken by the CTE serializes concurrent submissions.
        let row = sqlx::query_as::<_, (i32, i32)>(
            r#"WITH previous AS (
                    SELECT id, score FROM accounts WHERE id = $1 FOR UPDATE
                )
                UPDATE accounts
                SET score = GREATEST(previous.score, $2)
                FROM previous
                WHERE accounts.id = previous.id
                RETURNING previous.score, accounts.score"#,
        )
        .bind(id.0)
        .bind(score)
        .fetch_optional(&self.pool)
        .await?;

        let (previous, score) = row.ok_or(Error::NotFound)?;
        Ok(ScoreUpdate { previous, score })
    }

    async fn store_score(&self, id: AccountId, score: i32) -> Result<()> {
        let result: PgQueryResult =
            sqlx::query(r#"UPDATE accounts SET score = $2 WHERE id = $1"#)
                .bind(id.0)
                .bind(score)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: AccountId,
        fetch: Fetch,
    ) -> Result<Option<Account>> {
        let query = get_by_field_query(Field::Id);
        let record = sqlx::query_as::<_, AccountRecord>(&query)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        self.load(record, fetch).await
    }

    async fn find_by_username(
        &self,
        username: &Username,
        fetch: Fetch,
    ) -> Result<Option<Account>> {
        let query = get_by_field_query(Field::Username);
        let record = sqlx::query_as::<_, AccountRecord>(&query)
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await?;

        self.load(record, fetch).await
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
        fetch: Fetch,
    ) -> Result<Option<Account>> {
        let query = get_by_field_query(Field::Email);
        let record = sqlx::query_as::<_, AccountRecord>(&query)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        self.load(record, fetch).await
    }

    async fn delete(&self, id: AccountId) -> Result<()> {
        let result: PgQueryResult =
            sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
                .bind(id.0)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}
