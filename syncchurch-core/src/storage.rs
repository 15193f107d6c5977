//! Persistent key-value storage and the lockout data model.
//!
//! Everything the login guard persists (failed attempt counters, the session token and
//! the user profile) lives in a single string key-value namespace behind [`KeyValueStore`].
//! Backends only have to provide `get`, `set` and `delete`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::Error;

/// String key-value store shared by every component of the login guard.
///
/// Writes must be durable by the time the returned future resolves; the lockout
/// policy re-reads the store on every check and keeps no cache of its own.
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// In-memory [`KeyValueStore`].
///
/// Contents are lost when the process exits. Useful for tests and for short-lived
/// tools that do not need the lockout state to survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Failed login attempts recorded for one email address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Consecutive failures since the last success or lockout expiry.
    pub attempts: u32,
    /// When the most recent counted failure happened. `None` before any failure.
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn new(attempts: u32, last_failure_at: DateTime<Utc>) -> Self {
        Self {
            attempts,
            last_failure_at: Some(last_failure_at),
        }
    }

    /// Time elapsed since the last failure, or `None` if there never was one.
    pub fn elapsed_since_failure(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_failure_at.map(|at| now - at)
    }
}

/// What to do when the attempt ledger cannot be read or written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFailurePolicy {
    /// Treat the account as unlocked and skip recording attempts.
    FailOpen,
    /// Refuse the login attempt.
    #[default]
    FailClosed,
}

/// Configuration for login lockout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// When false, nothing is recorded and every account reports unlocked.
    pub enabled: bool,
    /// Number of consecutive failures that locks an account.
    pub max_attempts: u32,
    /// How long a lockout lasts, measured from the last failure.
    #[serde(with = "duration_millis")]
    pub lockout_duration: Duration,
    /// Prefix of the storage key holding each email's attempt record.
    pub key_prefix: String,
    pub storage_failure: StorageFailurePolicy,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 50,
            lockout_duration: Duration::hours(24),
            key_prefix: "loginAttempts_".to_string(),
            storage_failure: StorageFailurePolicy::default(),
        }
    }
}

impl LockoutConfig {
    /// A configuration with lockout turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_lockout_duration(mut self, lockout_duration: Duration) -> Self {
        self.lockout_duration = lockout_duration;
        self
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    pub fn with_storage_failure(mut self, policy: StorageFailurePolicy) -> Self {
        self.storage_failure = policy;
        self
    }

    /// End of a lockout whose last failure was at `at`, saturating at the latest
    /// instant chrono can represent.
    pub fn lockout_ends_at(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at.checked_add_signed(self.lockout_duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Snapshot of an email's lockout state at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutStatus {
    pub email: String,
    pub failed_attempts: u32,
    pub is_locked: bool,
    /// When the current lockout ends. Only set while locked.
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    pub fn unlocked(email: &str) -> Self {
        Self {
            email: email.to_string(),
            failed_attempts: 0,
            is_locked: false,
            locked_until: None,
        }
    }
}

mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_milliseconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::milliseconds)
    }
}
