use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{User, error::EventError};

/// Reason why an account was unlocked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnlockReason {
    /// A successful login reset the counter
    LoginSucceeded,
    /// Lockout period expired and was noticed on the next check
    LockoutExpired,
    /// Administrator manually unlocked the account
    AdminAction,
}

/// Security events emitted by the login flow
///
/// Events are informational. A failing handler never changes the outcome of the
/// login that produced the event.
#[derive(Debug, Clone)]
pub enum Event {
    /// A login succeeded and a session was stored.
    LoginSucceeded {
        user: User,
        timestamp: DateTime<Utc>,
    },

    /// The backend rejected a login attempt.
    LoginFailed {
        /// The email address that was attempted
        email: String,
        /// Consecutive failures recorded for the email, including this one
        failed_attempts: u32,
        /// Attempts left before the account locks
        remaining_attempts: u32,
        timestamp: DateTime<Utc>,
    },

    /// An email reached the failure threshold.
    ///
    /// This is a security-critical event that should trigger alerts.
    AccountLocked {
        email: String,
        failed_attempts: u32,
        /// When the lockout will expire
        locked_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// The failure counter for an email was reset.
    AccountUnlocked {
        email: String,
        reason: UnlockReason,
        timestamp: DateTime<Utc>,
    },

    /// The stored session was cleared.
    LoggedOut {
        user: Option<User>,
        timestamp: DateTime<Utc>,
    },
}

/// A trait for handling events emitted by the event bus
///
/// # Examples
///
/// ```
/// # use syncchurch_core::events::{Event, EventHandler};
/// # use syncchurch_core::error::EventError;
/// # use async_trait::async_trait;
/// struct AuditLog;
///
/// #[async_trait]
/// impl EventHandler for AuditLog {
///     async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
///         println!("{event:?}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers
    ///
    /// Stops at the first handler error and returns it.
    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }

    /// Emit an event, logging instead of returning a handler error.
    pub(crate) async fn publish(&self, event: Event) {
        if let Err(e) = self.emit(&event).await {
            tracing::warn!(error = %e, ?event, "Event handler failed");
        }
    }
}
