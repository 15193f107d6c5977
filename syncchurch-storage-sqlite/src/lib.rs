//! SQLite storage backend for the SyncChurch login guard
//!
//! Provides a durable [`syncchurch_core::KeyValueStore`] so that failed login
//! counters and the stored session survive restarts.
//!
//! # Example
//!
//! ```rust,no_run
//! use syncchurch_storage_sqlite::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = SqliteStorage::connect("sqlite://syncchurch.db?mode=rwc").await?;
//!     storage.migrate().await?;
//!     let store = storage.store();
//!     Ok(())
//! }
//! ```
pub mod migrations;
mod store;

use sqlx::SqlitePool;
use syncchurch_core::{Error, error::StorageError};

pub use store::SqliteKeyValueStore;

use migrations::{MIGRATIONS, SqliteMigrationManager};

/// Handle on a SQLite database holding the login guard's state.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a connection pool for `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(database_url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            StorageError::Connection(e.to_string())
        })?;

        Ok(Self::new(pool))
    }

    /// Create or upgrade the schema.
    pub async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager
            .initialize()
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        manager
            .up(MIGRATIONS)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    /// A key-value store over this database.
    pub fn store(&self) -> SqliteKeyValueStore {
        SqliteKeyValueStore::new(self.pool.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
