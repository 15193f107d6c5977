//! # SyncChurch
//!
//! Login guard for the SyncChurch administrative front-end. It sits between the login
//! form and the remote authentication backend and keeps a per-email ledger of failed
//! attempts, refusing further submissions for an email once it has failed too often.
//!
//! The lockout is a client-side courtesy throttle. It slows down casual guessing from
//! one installation; it is not a security boundary, and the backend is expected to
//! enforce its own limits.
//!
//! ## Storage Support
//!
//! - In-memory (tests, throwaway sessions)
//! - SQLite (feature `sqlite`, enabled by default)
//!
//! ## Example
//!
//! ```rust,no_run
//! use syncchurch::{SyncChurchBuilder, error::AuthError, Error};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let syncchurch = SyncChurchBuilder::new()
//!         .with_sqlite("sqlite://syncchurch.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     match syncchurch.login("admin@example.com", "Password1").await {
//!         Ok(user) => println!("Logged in as {}", user.email),
//!         Err(Error::Auth(AuthError::AccountLocked { minutes })) => {
//!             println!("Locked, try again in {minutes} minutes")
//!         }
//!         Err(e) => println!("{e}"),
//!     }
//!
//!     Ok(())
//! }
//! ```
mod builder;

use std::sync::Arc;

use chrono::Duration;
use syncchurch_core::{KeyValueAttemptLedger, LoginService, SessionStore};

pub use builder::{
    BackendSource, CustomBackend, HttpBackend, NoStorage, SyncChurchBuilder,
    SyncChurchBuilderError, WithStorage,
};

/// Re-export core types from syncchurch_core
pub use syncchurch_core::{
    AuthBackend, BackendError, Clock, Credentials, Error, Event, EventBus, EventHandler,
    InMemoryStore, KeyValueStore, LockoutConfig, LockoutStatus, LoginResponse, ManualClock,
    Rejection, StorageFailurePolicy, SystemClock, UnlockReason, User, error, validation,
};

/// Re-export the HTTP backend
pub use syncchurch_client::{ClientConfig, DEFAULT_BASE_URL, HttpAuthBackend};

/// Re-export storage backends
///
/// These storage implementations are available when the corresponding feature is enabled.
#[cfg(feature = "sqlite")]
pub use syncchurch_storage_sqlite::{SqliteKeyValueStore, SqliteStorage};

type Login<S, B> = LoginService<KeyValueAttemptLedger<S>, B, S>;

/// Login guard wired to a store and an authentication backend.
///
/// Usually created through [`SyncChurchBuilder`]; [`SyncChurch::new`] wires the defaults
/// directly.
pub struct SyncChurch<S: KeyValueStore, B: AuthBackend = HttpAuthBackend> {
    store: Arc<S>,
    login: Login<S, B>,
    events: EventBus,
}

impl<S: KeyValueStore, B: AuthBackend> SyncChurch<S, B> {
    /// Create an instance with the default lockout configuration and the system clock.
    pub fn new(store: Arc<S>, backend: Arc<B>) -> Self {
        Self::from_builder(
            store,
            backend,
            LockoutConfig::default(),
            EventBus::default(),
            Arc::new(SystemClock),
        )
    }

    pub(crate) fn from_builder(
        store: Arc<S>,
        backend: Arc<B>,
        config: LockoutConfig,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = Arc::new(KeyValueAttemptLedger::with_clock(
            store.clone(),
            config.key_prefix.clone(),
            clock.clone(),
        ));
        let lockout = Arc::new(
            syncchurch_core::LockoutService::new(ledger, config).with_event_bus(events.clone()),
        );
        let sessions = Arc::new(SessionStore::new(store.clone()));
        let login = LoginService::new(lockout, backend, sessions)
            .with_clock(clock)
            .with_event_bus(events.clone());

        Self {
            store,
            login,
            events,
        }
    }

    /// Log in with email and password.
    ///
    /// On success the token and user profile are stored and the email's failed
    /// attempts are cleared. See [`LoginService::login`] for the error cases.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        self.login.login(email, password).await
    }

    /// Log out and clear the stored session.
    pub async fn logout(&self) -> Result<(), Error> {
        self.login.logout().await
    }

    /// Failed attempts left for `email` before it locks.
    pub async fn remaining_attempts(&self, email: &str) -> Result<u32, Error> {
        self.login.remaining_attempts(email).await
    }

    /// Time left on `email`'s lockout, zero when it is not locked.
    pub async fn lockout_time_remaining(&self, email: &str) -> Result<Duration, Error> {
        self.login.lockout_time_remaining(email).await
    }

    pub async fn lockout_status(&self, email: &str) -> Result<LockoutStatus, Error> {
        self.login.lockout_status(email).await
    }

    /// Lift any lockout on `email` and forget its failed attempts.
    ///
    /// Returns whether the email was locked.
    pub async fn unlock(&self, email: &str) -> Result<bool, Error> {
        self.login.unlock(email).await
    }

    pub async fn current_user(&self) -> Result<Option<User>, Error> {
        self.login.current_user().await
    }

    pub async fn token(&self) -> Result<Option<String>, Error> {
        self.login.token().await
    }

    pub async fn is_authenticated(&self) -> Result<bool, Error> {
        self.login.sessions().is_authenticated().await
    }

    pub fn lockout_config(&self) -> &LockoutConfig {
        self.login.lockout().config()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

#[cfg(feature = "sqlite")]
impl<B: AuthBackend> SyncChurch<SqliteKeyValueStore, B> {
    /// Run migrations for the SQLite store
    pub async fn migrate(&self) -> Result<(), Error> {
        SqliteStorage::new(self.store.pool().clone()).migrate().await
    }

    /// Health check for the SQLite store
    pub async fn health_check(&self) -> Result<(), Error> {
        SqliteStorage::new(self.store.pool().clone())
            .health_check()
            .await
    }
}
