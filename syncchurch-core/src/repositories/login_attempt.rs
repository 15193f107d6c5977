//! Attempt ledger: per-email failed login counters.
//!
//! Each email with at least one failure since its last reset has one entry in the
//! [`KeyValueStore`], stored as `{"attempts": n, "timestamp": ms}` under
//! `<prefix><email>`. Emails without an entry read as zero attempts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    clock::{Clock, SystemClock},
    error::StorageError,
    storage::{AttemptRecord, KeyValueStore},
};

/// Repository for failed login attempt records.
///
/// The ledger is the only component that writes attempt records. It does not know
/// anything about thresholds or lockout windows; that is [`crate::services::LockoutService`]'s job.
#[async_trait]
pub trait AttemptLedger: Send + Sync + 'static {
    /// Get the record for `email`, or a zero record if none exists.
    async fn get(&self, email: &str) -> Result<AttemptRecord, Error>;

    /// Store `attempts` for `email` with the current time as the last failure,
    /// overwriting any previous record.
    async fn set(&self, email: &str, attempts: u32) -> Result<AttemptRecord, Error>;

    /// Remove the record for `email` entirely.
    async fn clear(&self, email: &str) -> Result<(), Error>;
}

/// On-disk shape of an attempt record.
#[derive(Debug, Serialize, Deserialize)]
struct StoredAttempts {
    attempts: u32,
    timestamp: i64,
}

/// [`AttemptLedger`] backed by a [`KeyValueStore`].
pub struct KeyValueAttemptLedger<S: KeyValueStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    key_prefix: String,
}

impl<S: KeyValueStore> KeyValueAttemptLedger<S> {
    /// Create a ledger using `key_prefix` for its storage keys and the system clock.
    pub fn new(store: Arc<S>, key_prefix: impl Into<String>) -> Self {
        Self::with_clock(store, key_prefix, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, key_prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            key_prefix: key_prefix.into(),
        }
    }

    /// The storage key holding the record for `email`.
    pub fn key_for(&self, email: &str) -> String {
        format!("{}{}", self.key_prefix, email)
    }

    fn decode(email: &str, raw: &str) -> AttemptRecord {
        match serde_json::from_str::<StoredAttempts>(raw) {
            Ok(stored) => AttemptRecord {
                attempts: stored.attempts,
                last_failure_at: DateTime::from_timestamp_millis(stored.timestamp),
            },
            Err(e) => {
                tracing::warn!(
                    email = %email,
                    error = %e,
                    "Ignoring unreadable login attempt record"
                );
                AttemptRecord::default()
            }
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> AttemptLedger for KeyValueAttemptLedger<S> {
    async fn get(&self, email: &str) -> Result<AttemptRecord, Error> {
        let raw = self.store.get(&self.key_for(email)).await?;
        Ok(raw
            .map(|raw| Self::decode(email, &raw))
            .unwrap_or_default())
    }

    async fn set(&self, email: &str, attempts: u32) -> Result<AttemptRecord, Error> {
        let now = self.clock.now();
        let stored = StoredAttempts {
            attempts,
            timestamp: now.timestamp_millis(),
        };
        let value = serde_json::to_string(&stored).map_err(StorageError::from)?;
        self.store.set(&self.key_for(email), &value).await?;

        Ok(AttemptRecord::new(attempts, now))
    }

    async fn clear(&self, email: &str) -> Result<(), Error> {
        self.store.delete(&self.key_for(email)).await
    }
}
