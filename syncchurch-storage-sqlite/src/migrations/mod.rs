use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A schema change, applied once and recorded by version.
pub struct Migration {
    /// Unique version number for ordering migrations
    pub version: i64,
    /// Human readable name of the migration
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "CreateKeyValueTable",
    up: r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (unixepoch())
        );"#,
    down: "DROP TABLE IF EXISTS kv_store",
}];

pub struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn table_name(&self) -> &str {
        "_syncchurch_migrations"
    }

    /// Initialize migration tracking table
    pub async fn initialize(&self) -> Result<(), MigrationError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (unixepoch())
            );"#,
            self.table_name()
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Apply pending migrations, each in its own transaction.
    pub async fn up(&self, migrations: &[Migration]) -> Result<(), MigrationError> {
        for migration in migrations {
            if self.is_applied(migration.version).await? {
                continue;
            }

            tracing::info!(
                "Applying migration {} ({})",
                migration.name,
                migration.version
            );

            let mut tx = self.pool.begin().await?;
            sqlx::query(migration.up).execute(&mut *tx).await?;
            sqlx::query(&format!(
                "INSERT INTO {} (version, name, applied_at) VALUES (?, ?, ?)",
                self.table_name()
            ))
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    /// Roll back applied migrations, newest first.
    pub async fn down(&self, migrations: &[Migration]) -> Result<(), MigrationError> {
        for migration in migrations.iter().rev() {
            if !self.is_applied(migration.version).await? {
                continue;
            }

            tracing::info!(
                "Rolling back migration {} ({})",
                migration.name,
                migration.version
            );

            let mut tx = self.pool.begin().await?;
            sqlx::query(migration.down).execute(&mut *tx).await?;
            sqlx::query(&format!(
                "DELETE FROM {} WHERE version = ?",
                self.table_name()
            ))
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;
        }

        Ok(())
    }

    /// Check if specific migration was applied
    pub async fn is_applied(&self, version: i64) -> Result<bool, MigrationError> {
        let applied: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE version = ?)",
            self.table_name()
        ))
        .bind(version)
        .fetch_one(&self.pool)
        .await?;

        Ok(applied)
    }
}
