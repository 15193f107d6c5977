//! Login lockout policy.
//!
//! An email is locked once it has accumulated `max_attempts` consecutive failed
//! logins, and stays locked until `lockout_duration` has passed since the last of
//! them. Expiry is lazy: nothing runs in the background, and a stale lockout is
//! only cleared the next time [`LockoutService::is_locked`] looks at it.
//!
//! # Example
//!
//! ```rust,ignore
//! use syncchurch_core::services::LockoutService;
//! use syncchurch_core::storage::LockoutConfig;
//!
//! let lockout = LockoutService::new(ledger, LockoutConfig::default());
//!
//! // Check before contacting the backend
//! if lockout.is_locked("user@example.com", Utc::now()).await? {
//!     let wait = lockout.remaining_lockout_time("user@example.com", Utc::now()).await?;
//!     // Refuse locally
//! }
//!
//! // After the backend rejected the credentials
//! let attempts = lockout.record_failure("user@example.com").await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    Error,
    events::{Event, EventBus, UnlockReason},
    repositories::AttemptLedger,
    storage::{AttemptRecord, LockoutConfig, LockoutStatus},
};

/// Service deciding whether an email may attempt to log in.
///
/// The service holds no state of its own: every call re-reads the ledger.
/// Recording a failure is a read followed by a write, so two processes sharing a
/// store can lose an increment if they record a failure for the same email at
/// the same moment.
pub struct LockoutService<L: AttemptLedger> {
    ledger: Arc<L>,
    config: LockoutConfig,
    events: Option<EventBus>,
}

impl<L: AttemptLedger> LockoutService<L> {
    pub fn new(ledger: Arc<L>, config: LockoutConfig) -> Self {
        Self {
            ledger,
            config,
            events: None,
        }
    }

    /// Emit [`Event::AccountUnlocked`] on `events` when a lockout expires or is lifted.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Whether `email` is locked out at `now`.
    ///
    /// If the email reached the threshold but the lockout window has fully elapsed,
    /// its record is cleared and `false` is returned.
    pub async fn is_locked(&self, email: &str, now: DateTime<Utc>) -> Result<bool, Error> {
        if !self.config.enabled {
            return Ok(false);
        }

        let record = self.ledger.get(email).await?;
        if record.attempts < self.config.max_attempts {
            return Ok(false);
        }

        if self.has_expired(&record, now) {
            tracing::debug!(email = %email, "Lockout window elapsed, clearing attempts");
            self.ledger.clear(email).await?;
            self.publish_unlock(email, UnlockReason::LockoutExpired, now)
                .await;
            return Ok(false);
        }

        Ok(true)
    }

    /// Attempts left before `email` locks. Does not clear expired lockouts.
    pub async fn remaining_attempts(&self, email: &str) -> Result<u32, Error> {
        if !self.config.enabled {
            return Ok(self.config.max_attempts);
        }

        let record = self.ledger.get(email).await?;
        Ok(self.config.max_attempts.saturating_sub(record.attempts))
    }

    /// Time left until the lockout window for `email` closes, measured from its
    /// last failure. Zero when there is no record or the window has passed.
    pub async fn remaining_lockout_time(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Duration, Error> {
        if !self.config.enabled {
            return Ok(Duration::zero());
        }

        let record = self.ledger.get(email).await?;
        Ok(self.remaining_for(&record, now))
    }

    /// Count one failed login for `email` and return the new number of failures.
    ///
    /// Callers must only use this when the backend actually rejected the
    /// credentials, never for connectivity failures.
    pub async fn record_failure(&self, email: &str) -> Result<u32, Error> {
        if !self.config.enabled {
            return Ok(0);
        }

        let current = self.ledger.get(email).await?;
        let attempts = current.attempts.saturating_add(1);
        self.ledger.set(email, attempts).await?;

        tracing::debug!(email = %email, attempts, "Recorded failed login attempt");
        Ok(attempts)
    }

    /// Reset `email` after a successful login.
    pub async fn record_success(&self, email: &str, now: DateTime<Utc>) -> Result<(), Error> {
        let previous = self.ledger.get(email).await?;
        self.ledger.clear(email).await?;

        if previous.attempts > 0 {
            self.publish_unlock(email, UnlockReason::LoginSucceeded, now)
                .await;
        }

        Ok(())
    }

    /// Full lockout state of `email` at `now`, applying lazy expiry first.
    pub async fn lockout_status(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::unlocked(email));
        }

        let is_locked = self.is_locked(email, now).await?;
        let record = self.ledger.get(email).await?;
        let locked_until = if is_locked {
            record
                .last_failure_at
                .map(|at| self.config.lockout_ends_at(at))
        } else {
            None
        };

        Ok(LockoutStatus {
            email: email.to_string(),
            failed_attempts: record.attempts,
            is_locked,
            locked_until,
        })
    }

    /// Clear all attempts for `email` regardless of state (administrative unlock).
    ///
    /// Returns `true` if the email was locked at `now`.
    pub async fn unlock(&self, email: &str, now: DateTime<Utc>) -> Result<bool, Error> {
        let was_locked = self.is_locked(email, now).await?;
        self.ledger.clear(email).await?;

        if was_locked {
            tracing::info!(email = %email, "Account unlocked by administrator");
            self.publish_unlock(email, UnlockReason::AdminAction, now)
                .await;
        }

        Ok(was_locked)
    }

    fn has_expired(&self, record: &AttemptRecord, now: DateTime<Utc>) -> bool {
        record
            .elapsed_since_failure(now)
            .is_none_or(|elapsed| elapsed >= self.config.lockout_duration)
    }

    fn remaining_for(&self, record: &AttemptRecord, now: DateTime<Utc>) -> Duration {
        match record.elapsed_since_failure(now) {
            Some(elapsed) => self
                .config
                .lockout_duration
                .checked_sub(&elapsed)
                .unwrap_or(Duration::MAX)
                .max(Duration::zero()),
            None => Duration::zero(),
        }
    }

    async fn publish_unlock(&self, email: &str, reason: UnlockReason, now: DateTime<Utc>) {
        if let Some(events) = &self.events {
            events
                .publish(Event::AccountUnlocked {
                    email: email.to_string(),
                    reason,
                    timestamp: now,
                })
                .await;
        }
    }
}
