//! SQLite implementation of the key-value store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use syncchurch_core::{Error, KeyValueStore, error::StorageError};

/// Durable [`KeyValueStore`] kept in the `kv_store` table.
///
/// Every call goes straight to the database; there is no cache in front of it,
/// so several processes sharing one database file see each other's writes.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %key, "Failed to read key");
                StorageError::Database("Failed to read key".to_string())
            })?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %key, "Failed to write key");
            StorageError::Database("Failed to write key".to_string())
        })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %key, "Failed to delete key");
                StorageError::Database("Failed to delete key".to_string())
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStorage;

    async fn setup_store() -> SqliteKeyValueStore {
        let storage = SqliteStorage::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        storage.migrate().await.expect("Failed to run migrations");
        storage.store()
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = setup_store().await;
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_get_and_overwrite() {
        let store = setup_store().await;

        store.set("loginAttempts_a@example.com", "one").await.unwrap();
        assert_eq!(
            store.get("loginAttempts_a@example.com").await.unwrap().as_deref(),
            Some("one")
        );

        store.set("loginAttempts_a@example.com", "two").await.unwrap();
        assert_eq!(
            store.get("loginAttempts_a@example.com").await.unwrap().as_deref(),
            Some("two")
        );

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = setup_store().await;
        store.set("token", "abc").await.unwrap();
        store.set("user", "{}").await.unwrap();

        store.delete("token").await.unwrap();
        assert!(store.get("token").await.unwrap().is_none());
        assert_eq!(store.get("user").await.unwrap().as_deref(), Some("{}"));

        // Deleting a missing key is fine
        store.delete("token").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_are_case_sensitive() {
        let store = setup_store().await;
        store.set("loginAttempts_A@example.com", "1").await.unwrap();

        assert!(store.get("loginAttempts_a@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_table_is_a_storage_error() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = SqliteKeyValueStore::new(pool);

        let result = store.get("anything").await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }
}
