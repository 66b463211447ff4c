//! GatorRush player accounts.
//!
//! An [`Account`](account::Account) validates its username and email, keeps
//! only a salted hash of its password, and tracks its level, attempts and
//! high score. Storage and hashing are injected through
//! [`AccountRepository`](account::AccountRepository) and
//! [`PasswordHasher`](crypto::PasswordHasher).

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod account;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod progress;
pub mod telemetry;

use std::sync::Arc;

use account::AccountService;
use crypto::Argon2Hasher;

pub use error::{Error, Result};

/// Shared handles for an embedding application.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub accounts: AccountService,
}

/// Initialize the application state.
///
/// Reads the configuration, connects PostgreSQL and runs migrations.
pub async fn initialize_state(
    config: config::Configuration,
) -> Result<AppState> {
    let Some(postgres) = config.postgres.as_ref() else {
        // PostgreSQL is the only durable account storage.
        tracing::error!("missing `postgres` entry on configuration file");
        return Err(Error::MissingConfig("postgres"));
    };
    let db = database::Database::new(postgres).await?;

    // execute migrations scripts on start.
    db.migrate().await?;

    let hasher = Arc::new(Argon2Hasher::new(config.argon2.clone())?);
    let accounts = AccountService::new(Arc::new(db.accounts()), hasher);

    Ok(AppState {
        config: Arc::new(config),
        db,
        accounts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_requires_postgres() {
        let err = initialize_state(config::Configuration::default())
            .await
            .err()
            .unwrap();

        assert!(matches!(err, Error::MissingConfig("postgres")));
    }
}
