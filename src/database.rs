//! Storage backends for accounts.
mod memory;
mod postgres;

pub use memory::MemoryAccountRepository;
pub use postgres::PgAccountRepository;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Postgres;
use crate::error::Result;

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "gatorrush";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// PostgreSQL connection pool.
#[derive(Clone)]
pub struct Database {
    pub postgres: PgPool,
}

impl Database {
    /// Open a pool from the `postgres` configuration section.
    ///
    /// Missing credentials, database name and pool size use the `DEFAULT_*`
    /// values.
    pub async fn new(config: &Postgres) -> Result<Self> {
        let database =
            config.database.as_deref().unwrap_or(DEFAULT_DATABASE_NAME);

        let postgres = PgPoolOptions::new()
            .max_connections(config.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
            .connect(&connection_url(config))
            .await?;

        tracing::info!(address = %config.address, %database, "postgres connected");

        Ok(Self { postgres })
    }

    /// Execute migration scripts.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.postgres).await?;
        Ok(())
    }

    /// Account repository backed by this pool.
    pub fn accounts(&self) -> PgAccountRepository {
        PgAccountRepository::new(self.postgres.clone())
    }
}

fn connection_url(config: &Postgres) -> String {
    let credential = |value: &Option<String>| {
        value.as_deref().unwrap_or(DEFAULT_CREDENTIALS).to_owned()
    };

    format!(
        "postgres://{}:{}@{}/{}",
        credential(&config.username),
        credential(&config.password),
        config.address,
        config.database.as_deref().unwrap_or(DEFAULT_DATABASE_NAME),
    )
}
