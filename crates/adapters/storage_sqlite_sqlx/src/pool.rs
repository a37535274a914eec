//! Opening the `SQLite` database that holds the `records` table.
//!
//! The store keeps one JSON document per key, so a handful of connections is
//! plenty. An in-memory database lives only as long as one of its
//! connections, which is why memory pools never retire idle connections.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::StorageError;

/// Upper bound of pooled connections.
const MAX_CONNECTIONS: u32 = 4;
/// How long a writer waits on a locked database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the schedule records live.
pub struct Config {
    /// `SQLite` connection URL, e.g. `sqlite:scripthub.db?mode=rwc` or
    /// `sqlite::memory:`.
    pub database_url: String,
}

impl Config {
    /// Open the database, creating the file when missing, and bring the
    /// `records` table up to date.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] for a malformed URL, an unreachable file or a
    /// failing migration.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::open(&self.database_url).await
    }
}

/// Migrated connection pool handed to the record stores.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    async fn open(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        let mut pool_options = SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS);
        if is_memory(database_url) {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(memory = is_memory(database_url), "database ready");

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn is_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
