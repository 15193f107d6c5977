//! Builder pattern for constructing SyncChurch instances
//!
//! This module provides a type-safe builder for creating [`SyncChurch`] instances with
//! compile-time validation of storage configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use syncchurch::SyncChurchBuilder;
//! use chrono::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let syncchurch = SyncChurchBuilder::new()
//!         .with_sqlite("sqlite://syncchurch.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .with_max_attempts(5)
//!         .with_lockout_duration(Duration::minutes(15))
//!         .build()
//!         .await?;
//!
//!     let user = syncchurch.login("admin@example.com", "Password1").await?;
//!     println!("Welcome back, {}", user.full_name);
//!
//!     Ok(())
//! }
//! ```

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::Duration;
use syncchurch_client::{ClientConfig, HttpAuthBackend};
use syncchurch_core::{
    AuthBackend, Clock, EventBus, InMemoryStore, KeyValueStore, LockoutConfig,
    StorageFailurePolicy, SystemClock,
};

use crate::SyncChurch;

/// Longest lockout the builder accepts, in days.
const MAX_LOCKOUT_DAYS: i64 = 3_650;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a SyncChurch instance.
#[derive(Debug, thiserror::Error)]
pub enum SyncChurchBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
///
/// This is the initial state of [`SyncChurchBuilder`].
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<S: KeyValueStore> {
    store: Arc<S>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<crate::SqliteStorage>,
}

/// The HTTP backend, built from a [`ClientConfig`] when the builder finishes.
pub struct HttpBackend {
    config: ClientConfig,
}

/// A caller-supplied [`AuthBackend`].
pub struct CustomBackend<B: AuthBackend> {
    backend: Arc<B>,
}

/// Turns the backend state of the builder into a ready backend.
pub trait BackendSource {
    type Backend: AuthBackend;

    fn into_backend(self) -> Result<Arc<Self::Backend>, SyncChurchBuilderError>;
}

impl BackendSource for HttpBackend {
    type Backend = HttpAuthBackend;

    fn into_backend(self) -> Result<Arc<HttpAuthBackend>, SyncChurchBuilderError> {
        if self.config.base_url.is_empty() {
            return Err(SyncChurchBuilderError::InvalidConfiguration(
                "API base URL must not be empty".to_string(),
            ));
        }

        HttpAuthBackend::new(self.config)
            .map(Arc::new)
            .map_err(|e| SyncChurchBuilderError::InvalidConfiguration(e.to_string()))
    }
}

impl<B: AuthBackend> BackendSource for CustomBackend<B> {
    type Backend = B;

    fn into_backend(self) -> Result<Arc<B>, SyncChurchBuilderError> {
        Ok(self.backend)
    }
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`SyncChurch`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<S>`]: Storage configured, ready to build
///
/// The second parameter tracks the authentication backend: [`HttpBackend`] until
/// [`with_backend`](SyncChurchBuilder::with_backend) swaps in a [`CustomBackend`].
pub struct SyncChurchBuilder<Storage, Backend = HttpBackend> {
    storage: Storage,
    backend: Backend,
    lockout_config: LockoutConfig,
    events: EventBus,
    clock: Arc<dyn Clock>,
    #[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
    apply_migrations: bool,
}

impl Default for SyncChurchBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncChurchBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lockout: enabled, 50 attempts, 24 hour lockout, fail closed
    /// - Backend: HTTP against [`syncchurch_client::DEFAULT_BASE_URL`]
    /// - Clock: system time
    /// - Apply migrations: false
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            backend: HttpBackend {
                config: ClientConfig::default(),
            },
            lockout_config: LockoutConfig::default(),
            events: EventBus::default(),
            clock: Arc::new(SystemClock),
            apply_migrations: false,
        }
    }
}

// ============================================================================
// Storage Configuration Methods (NoStorage -> WithStorage)
// ============================================================================

impl<Backend> SyncChurchBuilder<NoStorage, Backend> {
    /// Use any [`KeyValueStore`] as storage.
    pub fn with_store<S: KeyValueStore>(
        self,
        store: Arc<S>,
    ) -> SyncChurchBuilder<WithStorage<S>, Backend> {
        self.with_storage(WithStorage {
            store,
            #[cfg(feature = "sqlite")]
            sqlite: None,
        })
    }

    /// Keep everything in memory. Nothing survives the process.
    pub fn with_memory_store(self) -> SyncChurchBuilder<WithStorage<InMemoryStore>, Backend> {
        self.with_store(Arc::new(InMemoryStore::new()))
    }

    fn with_storage<S: KeyValueStore>(
        self,
        storage: WithStorage<S>,
    ) -> SyncChurchBuilder<WithStorage<S>, Backend> {
        SyncChurchBuilder {
            storage,
            backend: self.backend,
            lockout_config: self.lockout_config,
            events: self.events,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
        }
    }
}

#[cfg(feature = "sqlite")]
impl<Backend> SyncChurchBuilder<NoStorage, Backend> {
    /// Configure SQLite storage by connecting to the given URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite::memory:" or "sqlite://path/to/db.sqlite")
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<
        SyncChurchBuilder<WithStorage<crate::SqliteKeyValueStore>, Backend>,
        SyncChurchBuilderError,
    > {
        let storage = crate::SqliteStorage::connect(url)
            .await
            .map_err(|e| SyncChurchBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_sqlite_storage(storage))
    }

    /// Configure SQLite storage with an existing connection pool.
    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> SyncChurchBuilder<WithStorage<crate::SqliteKeyValueStore>, Backend> {
        self.with_sqlite_storage(crate::SqliteStorage::new(pool))
    }

    fn with_sqlite_storage(
        self,
        storage: crate::SqliteStorage,
    ) -> SyncChurchBuilder<WithStorage<crate::SqliteKeyValueStore>, Backend> {
        self.with_storage(WithStorage {
            store: Arc::new(storage.store()),
            sqlite: Some(storage),
        })
    }
}

// ============================================================================
// Backend Configuration Methods
// ============================================================================

impl<Storage> SyncChurchBuilder<Storage, HttpBackend> {
    /// Point the HTTP backend at another server.
    ///
    /// Default: [`syncchurch_client::DEFAULT_BASE_URL`]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.backend.config = self.backend.config.with_base_url(url);
        self
    }

    /// Upper bound on each request to the backend.
    ///
    /// Default: 30 seconds
    pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
        self.backend.config = self.backend.config.with_timeout(timeout);
        self
    }

    pub fn with_client_config(mut self, config: ClientConfig) -> Self {
        self.backend.config = config;
        self
    }
}

impl<Storage, Backend> SyncChurchBuilder<Storage, Backend> {
    /// Replace the HTTP backend with any [`AuthBackend`].
    pub fn with_backend<B: AuthBackend>(
        self,
        backend: Arc<B>,
    ) -> SyncChurchBuilder<Storage, CustomBackend<B>> {
        SyncChurchBuilder {
            storage: self.storage,
            backend: CustomBackend { backend },
            lockout_config: self.lockout_config,
            events: self.events,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
        }
    }

    // ========================================================================
    // Lockout Configuration
    // ========================================================================

    /// Replace the whole lockout configuration.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use syncchurch::{LockoutConfig, SyncChurchBuilder};
    /// use chrono::Duration;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let syncchurch = SyncChurchBuilder::new()
    ///     .with_memory_store()
    ///     .with_lockout_config(
    ///         LockoutConfig::default()
    ///             .with_max_attempts(3)
    ///             .with_lockout_duration(Duration::minutes(30)),
    ///     )
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    /// Failed attempts allowed before an email is locked out.
    ///
    /// Default: 50
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.lockout_config.max_attempts = max_attempts;
        self
    }

    /// How long a lockout lasts, counted from the last failure.
    ///
    /// Default: 24 hours. [`build`](Self::build) rejects anything above ten years.
    pub fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_config.lockout_duration = duration;
        self
    }

    /// What to do when the attempt ledger cannot be read or written.
    ///
    /// Default: [`StorageFailurePolicy::FailClosed`]
    pub fn with_storage_failure_policy(mut self, policy: StorageFailurePolicy) -> Self {
        self.lockout_config.storage_failure = policy;
        self
    }

    /// Turn the lockout off entirely. Nothing is recorded and every email reports
    /// all of its attempts left.
    pub fn without_lockout(mut self) -> Self {
        self.lockout_config.enabled = false;
        self
    }

    // ========================================================================
    // Runtime Configuration
    // ========================================================================

    /// Bus that receives login, lockout and logout events.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Source of the current time. Tests use [`syncchurch_core::ManualClock`].
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<S: KeyValueStore, Backend> SyncChurchBuilder<WithStorage<S>, Backend> {
    /// Set whether to automatically apply database migrations during build.
    ///
    /// Default: false
    ///
    /// Only stores with a schema are affected; the in-memory store ignores it.
    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }
}

impl<S: KeyValueStore, Backend: BackendSource> SyncChurchBuilder<WithStorage<S>, Backend> {
    /// Build the SyncChurch instance.
    ///
    /// If `apply_migrations(true)` was called, migrations are applied before returning.
    pub async fn build(self) -> Result<SyncChurch<S, Backend::Backend>, SyncChurchBuilderError> {
        if self.lockout_config.enabled && self.lockout_config.max_attempts == 0 {
            return Err(SyncChurchBuilderError::InvalidConfiguration(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.lockout_config.lockout_duration <= Duration::zero() {
            return Err(SyncChurchBuilderError::InvalidConfiguration(
                "lockout_duration must be positive".to_string(),
            ));
        }
        if self.lockout_config.lockout_duration > Duration::days(MAX_LOCKOUT_DAYS) {
            return Err(SyncChurchBuilderError::InvalidConfiguration(format!(
                "lockout_duration must not exceed {MAX_LOCKOUT_DAYS} days"
            )));
        }

        #[cfg(feature = "sqlite")]
        if self.apply_migrations {
            if let Some(sqlite) = &self.storage.sqlite {
                sqlite
                    .migrate()
                    .await
                    .map_err(|e| SyncChurchBuilderError::Migration(e.to_string()))?;
            }
        }

        let backend = self.backend.into_backend()?;

        Ok(SyncChurch::from_builder(
            self.storage.store,
            backend,
            self.lockout_config,
            self.events,
            self.clock,
        ))
    }
}
