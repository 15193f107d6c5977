//! Login orchestration.
//!
//! A submission goes through, in order: input validation, a local lockout check,
//! the credential exchange with the [`AuthBackend`], and then bookkeeping on the
//! attempt ledger. Only an answer from the backend that rejects the credentials
//! counts as a failed attempt; a backend that cannot be reached leaves the ledger
//! untouched.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    AuthBackend, BackendError, Credentials, Error, Rejection, User,
    clock::{Clock, SystemClock},
    error::AuthError,
    events::{Event, EventBus},
    repositories::AttemptLedger,
    services::LockoutService,
    session::SessionStore,
    storage::{KeyValueStore, LockoutStatus, StorageFailurePolicy},
    validation::{validate_email, validate_password},
};

/// Service running login and logout for the administrative front-end.
pub struct LoginService<L: AttemptLedger, B: AuthBackend, S: KeyValueStore> {
    lockout: Arc<LockoutService<L>>,
    backend: Arc<B>,
    sessions: Arc<SessionStore<S>>,
    clock: Arc<dyn Clock>,
    events: EventBus,
}

impl<L: AttemptLedger, B: AuthBackend, S: KeyValueStore> LoginService<L, B, S> {
    pub fn new(
        lockout: Arc<LockoutService<L>>,
        backend: Arc<B>,
        sessions: Arc<SessionStore<S>>,
    ) -> Self {
        Self {
            lockout,
            backend,
            sessions,
            clock: Arc::new(SystemClock),
            events: EventBus::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn lockout(&self) -> &LockoutService<L> {
        &self.lockout
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for malformed input; nothing else is touched.
    /// - [`AuthError::AccountLocked`] when the email is locked out; the backend is not contacted.
    /// - [`AuthError::InvalidCredentials`], [`AuthError::Forbidden`] or [`AuthError::Rejected`]
    ///   when the backend rejects the credentials; one failed attempt is recorded. A 401
    ///   also forgets the stored user profile.
    /// - [`AuthError::TooManyAttempts`] when that rejection used up the last attempt.
    /// - [`Error::Transport`] when the backend cannot be reached; no attempt is recorded.
    /// - [`Error::Storage`] when the ledger is unavailable and the policy is fail-closed.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        validate_email(email)?;
        validate_password(password)?;

        let now = self.clock.now();
        let locked = self.on_storage_failure(self.lockout.is_locked(email, now).await, false)?;
        if locked {
            let remaining = self.on_storage_failure(
                self.lockout.remaining_lockout_time(email, now).await,
                Duration::zero(),
            )?;
            let minutes = minutes_rounded_up(remaining);
            tracing::warn!(email = %email, minutes, "Login refused, account is locked");
            return Err(AuthError::AccountLocked { minutes }.into());
        }

        let credentials = Credentials::new(email, password);
        match self.backend.log_in(&credentials).await {
            Ok(response) => {
                self.on_storage_failure(self.lockout.record_success(email, now).await, ())?;
                self.sessions.save(&response).await?;

                tracing::info!(email = %email, user_id = response.user.id, "User logged in");
                self.events
                    .publish(Event::LoginSucceeded {
                        user: response.user.clone(),
                        timestamp: self.clock.now(),
                    })
                    .await;

                Ok(response.user)
            }
            Err(e) if e.counts_as_attempt() => Err(self.handle_rejection(email, e).await?),
            Err(e) => {
                tracing::warn!(email = %email, error = %e, "Authentication backend unreachable");
                Err(e.into())
            }
        }
    }

    /// Log out: tell the backend, then clear the stored session.
    ///
    /// The local session is cleared even if the backend call fails.
    pub async fn logout(&self) -> Result<(), Error> {
        let token = self.sessions.token().await?;
        let user = self.sessions.user().await?;

        if let Err(e) = self.backend.log_out(token.as_deref()).await {
            tracing::warn!(error = %e, "Backend logout failed, clearing local session anyway");
        }

        self.sessions.clear().await?;
        tracing::info!(user_id = user.as_ref().map(|u| u.id), "User logged out");
        self.events
            .publish(Event::LoggedOut {
                user,
                timestamp: self.clock.now(),
            })
            .await;

        Ok(())
    }

    /// Attempts left for `email` before it locks.
    pub async fn remaining_attempts(&self, email: &str) -> Result<u32, Error> {
        self.lockout.remaining_attempts(email).await
    }

    /// Time left on `email`'s lockout window.
    pub async fn lockout_time_remaining(&self, email: &str) -> Result<Duration, Error> {
        self.lockout
            .remaining_lockout_time(email, self.clock.now())
            .await
    }

    pub async fn lockout_status(&self, email: &str) -> Result<LockoutStatus, Error> {
        self.lockout.lockout_status(email, self.clock.now()).await
    }

    /// Lift any lockout on `email`. Returns whether it was locked.
    pub async fn unlock(&self, email: &str) -> Result<bool, Error> {
        self.lockout.unlock(email, self.clock.now()).await
    }

    /// The user stored by the last successful login, if any.
    pub async fn current_user(&self) -> Result<Option<User>, Error> {
        self.sessions.user().await
    }

    pub async fn token(&self) -> Result<Option<String>, Error> {
        self.sessions.token().await
    }

    async fn handle_rejection(&self, email: &str, rejection: BackendError) -> Result<Error, Error> {
        if matches!(rejection, BackendError::Rejected(Rejection::InvalidCredentials)) {
            // A 401 means whoever is stored is no longer trusted
            if let Err(e) = self.sessions.clear_user().await {
                tracing::warn!(error = %e, "Could not clear stored user after rejected login");
            }
        }

        let attempts = self.on_storage_failure(self.lockout.record_failure(email).await, 0)?;
        let config = self.lockout.config();
        let now = self.clock.now();

        if config.enabled && attempts >= config.max_attempts {
            tracing::warn!(
                email = %email,
                attempts,
                "Account locked after too many failed login attempts"
            );
            self.events
                .publish(Event::AccountLocked {
                    email: email.to_string(),
                    failed_attempts: attempts,
                    locked_until: config.lockout_ends_at(now),
                    timestamp: now,
                })
                .await;
            return Ok(AuthError::TooManyAttempts.into());
        }

        let remaining_attempts = config.max_attempts.saturating_sub(attempts);
        tracing::warn!(
            email = %email,
            attempts,
            remaining_attempts,
            ?rejection,
            "Login rejected by backend"
        );
        self.events
            .publish(Event::LoginFailed {
                email: email.to_string(),
                failed_attempts: attempts,
                remaining_attempts,
                timestamp: now,
            })
            .await;

        Ok(rejection.into())
    }

    /// Apply the configured [`StorageFailurePolicy`] to a ledger result.
    fn on_storage_failure<T>(&self, result: Result<T, Error>, fallback: T) -> Result<T, Error> {
        match result {
            Err(Error::Storage(e))
                if self.lockout.config().storage_failure == StorageFailurePolicy::FailOpen =>
            {
                tracing::warn!(error = %e, "Attempt ledger unavailable, continuing without it");
                Ok(fallback)
            }
            Err(Error::Storage(e)) => {
                tracing::error!(error = %e, "Attempt ledger unavailable, refusing login");
                Err(Error::Storage(e))
            }
            other => other,
        }
    }
}

/// Whole minutes, rounded up, for user-facing lockout messages.
fn minutes_rounded_up(duration: Duration) -> i64 {
    let millis = duration.num_milliseconds().max(0);
    millis.saturating_add(59_999) / 60_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::GENERIC_REJECTION,
        clock::ManualClock,
        error::{EventError, StorageError, TransportError},
        events::EventHandler,
        repositories::KeyValueAttemptLedger,
        storage::{InMemoryStore, LockoutConfig},
    };
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EMAIL: &str = "admin@example.com";
    const PASSWORD: &str = "Password1";

    fn test_user() -> User {
        User {
            id: 42,
            email: EMAIL.to_string(),
            full_name: "Church Admin".to_string(),
            role: "ADMIN".to_string(),
            active: true,
            church_id: Some(1),
        }
    }

    fn success() -> Result<crate::LoginResponse, BackendError> {
        Ok(crate::LoginResponse {
            user: test_user(),
            token: "tok_abc".to_string(),
        })
    }

    fn rejected(rejection: Rejection) -> Result<crate::LoginResponse, BackendError> {
        Err(BackendError::Rejected(rejection))
    }

    fn unreachable() -> Result<crate::LoginResponse, BackendError> {
        Err(BackendError::Transport(TransportError::Unreachable(
            "connection refused".to_string(),
        )))
    }

    /// Backend that answers from a script and counts calls.
    #[derive(Default)]
    struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<crate::LoginResponse, BackendError>>>,
        log_in_calls: AtomicUsize,
        log_out_tokens: Mutex<Vec<Option<String>>>,
        fail_log_out: bool,
    }

    impl ScriptedBackend {
        fn push(&self, response: Result<crate::LoginResponse, BackendError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn calls(&self) -> usize {
            self.log_in_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthBackend for ScriptedBackend {
        async fn log_in(
            &self,
            _credentials: &Credentials,
        ) -> Result<crate::LoginResponse, BackendError> {
            self.log_in_calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }

        async fn log_out(&self, token: Option<&str>) -> Result<(), BackendError> {
            self.log_out_tokens
                .lock()
                .unwrap()
                .push(token.map(str::to_string));
            if self.fail_log_out {
                return Err(TransportError::Unreachable("offline".to_string()).into());
            }
            Ok(())
        }
    }

    type TestLogin = LoginService<KeyValueAttemptLedger<InMemoryStore>, ScriptedBackend, InMemoryStore>;

    struct Harness {
        clock: Arc<ManualClock>,
        store: Arc<InMemoryStore>,
        backend: Arc<ScriptedBackend>,
        service: TestLogin,
    }

    impl Harness {
        fn new(config: LockoutConfig) -> Self {
            Self::with_backend(config, ScriptedBackend::default())
        }

        fn with_backend(config: LockoutConfig, backend: ScriptedBackend) -> Self {
            let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
            let store = Arc::new(InMemoryStore::new());
            let ledger = Arc::new(KeyValueAttemptLedger::with_clock(
                store.clone(),
                config.key_prefix.clone(),
                clock.clone(),
            ));
            let backend = Arc::new(backend);
            let service = LoginService::new(
                Arc::new(LockoutService::new(ledger, config)),
                backend.clone(),
                Arc::new(SessionStore::new(store.clone())),
            )
            .with_clock(clock.clone());

            Self {
                clock,
                store,
                backend,
                service,
            }
        }
    }

    fn three_attempts() -> LockoutConfig {
        LockoutConfig::default()
            .with_max_attempts(3)
            .with_lockout_duration(Duration::minutes(30))
    }

    #[tokio::test]
    async fn test_successful_login_stores_session() {
        let h = Harness::new(three_attempts());
        h.backend.push(success());

        let user = h.service.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(user, test_user());
        assert_eq!(h.service.current_user().await.unwrap(), Some(test_user()));
        assert_eq!(h.service.token().await.unwrap().as_deref(), Some("tok_abc"));
    }

    #[tokio::test]
    async fn test_successful_login_resets_attempts() {
        let h = Harness::new(three_attempts());
        h.backend.push(rejected(Rejection::InvalidCredentials));
        h.backend.push(rejected(Rejection::InvalidCredentials));
        h.backend.push(success());

        assert!(h.service.login(EMAIL, PASSWORD).await.is_err());
        assert!(h.service.login(EMAIL, PASSWORD).await.is_err());
        assert_eq!(h.service.remaining_attempts(EMAIL).await.unwrap(), 1);

        h.service.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(h.service.remaining_attempts(EMAIL).await.unwrap(), 3);
        assert!(h.store.get("loginAttempts_admin@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_credentials_count_as_attempt() {
        let h = Harness::new(three_attempts());
        h.backend.push(rejected(Rejection::InvalidCredentials));

        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        assert_eq!(h.service.remaining_attempts(EMAIL).await.unwrap(), 2);
        assert!(h.service.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_rejections_count_as_attempts() {
        let h = Harness::new(LockoutConfig::default().with_max_attempts(5));
        h.backend.push(rejected(Rejection::Forbidden));
        h.backend.push(rejected(Rejection::Other {
            status: 500,
            message: Some("Service degraded".to_string()),
        }));
        h.backend.push(rejected(Rejection::Other {
            status: 422,
            message: None,
        }));

        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Forbidden)));

        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Rejected(ref m)) if m == "Service degraded"));

        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Rejected(ref m)) if m == GENERIC_REJECTION));

        assert_eq!(h.service.remaining_attempts(EMAIL).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_count() {
        let h = Harness::new(three_attempts());
        h.backend.push(unreachable());

        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(err.is_transport_error());
        assert_eq!(h.service.remaining_attempts(EMAIL).await.unwrap(), 3);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_last_attempt_reports_too_many_attempts() {
        let h = Harness::new(three_attempts());
        for _ in 0..3 {
            h.backend.push(rejected(Rejection::InvalidCredentials));
        }

        for _ in 0..2 {
            let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
            assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        }

        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::TooManyAttempts)));
        assert_eq!(h.service.remaining_attempts(EMAIL).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_locked_account_is_refused_without_backend_call() {
        let h = Harness::new(three_attempts());
        for _ in 0..3 {
            h.backend.push(rejected(Rejection::InvalidCredentials));
        }
        for _ in 0..3 {
            let _ = h.service.login(EMAIL, PASSWORD).await;
        }
        assert_eq!(h.backend.calls(), 3);

        h.clock.advance(Duration::minutes(10) + Duration::seconds(1));
        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        // 19m59s left, reported as 20 minutes
        assert!(matches!(
            err,
            Error::Auth(AuthError::AccountLocked { minutes: 20 })
        ));
        assert_eq!(h.backend.calls(), 3);
    }

    #[tokio::test]
    async fn test_lockout_expires() {
        let h = Harness::new(three_attempts());
        for _ in 0..3 {
            h.backend.push(rejected(Rejection::InvalidCredentials));
        }
        for _ in 0..3 {
            let _ = h.service.login(EMAIL, PASSWORD).await;
        }

        h.clock.advance(Duration::minutes(30));
        assert_eq!(
            h.service.lockout_time_remaining(EMAIL).await.unwrap(),
            Duration::zero()
        );

        h.backend.push(success());
        h.service.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(h.backend.calls(), 4);
    }

    #[tokio::test]
    async fn test_validation_happens_before_anything_else() {
        let h = Harness::new(three_attempts());

        let err = h.service.login("not-an-email", PASSWORD).await.unwrap_err();
        assert!(err.is_validation_error());

        let err = h.service.login(EMAIL, "short").await.unwrap_err();
        assert!(err.is_validation_error());

        assert_eq!(h.backend.calls(), 0);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_session_even_if_backend_fails() {
        let backend = ScriptedBackend {
            fail_log_out: true,
            ..Default::default()
        };
        let h = Harness::with_backend(three_attempts(), backend);
        h.backend.push(success());
        h.service.login(EMAIL, PASSWORD).await.unwrap();

        h.service.logout().await.unwrap();
        assert!(h.service.current_user().await.unwrap().is_none());
        assert!(h.service.token().await.unwrap().is_none());
        assert_eq!(
            *h.backend.log_out_tokens.lock().unwrap(),
            vec![Some("tok_abc".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unlock_lifts_lockout() {
        let h = Harness::new(three_attempts());
        for _ in 0..3 {
            h.backend.push(rejected(Rejection::InvalidCredentials));
        }
        for _ in 0..3 {
            let _ = h.service.login(EMAIL, PASSWORD).await;
        }
        assert!(h.service.lockout_status(EMAIL).await.unwrap().is_locked);

        assert!(h.service.unlock(EMAIL).await.unwrap());
        assert!(!h.service.lockout_status(EMAIL).await.unwrap().is_locked);
    }

    #[test]
    fn test_minutes_rounded_up() {
        assert_eq!(minutes_rounded_up(Duration::zero()), 0);
        assert_eq!(minutes_rounded_up(Duration::milliseconds(1)), 1);
        assert_eq!(minutes_rounded_up(Duration::minutes(1)), 1);
        assert_eq!(minutes_rounded_up(Duration::minutes(1) + Duration::milliseconds(1)), 2);
        assert_eq!(minutes_rounded_up(Duration::hours(24)), 1440);
        assert_eq!(minutes_rounded_up(Duration::milliseconds(-5)), 0);
        assert_eq!(minutes_rounded_up(Duration::MAX), i64::MAX / 60_000);
    }

    #[tokio::test]
    async fn test_unbounded_lockout_duration_locks_without_overflow() {
        let h = Harness::new(
            LockoutConfig::default()
                .with_max_attempts(1)
                .with_lockout_duration(Duration::MAX),
        );
        let log = Arc::new(LockedUntil::default());
        let events = EventBus::new();
        events.register(log.clone()).await;
        let service = LoginService::new(
            h.service.lockout.clone(),
            h.backend.clone(),
            h.service.sessions.clone(),
        )
        .with_clock(h.clock.clone())
        .with_event_bus(events);
        h.backend.push(rejected(Rejection::InvalidCredentials));

        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::TooManyAttempts)));
        assert_eq!(
            *log.until.lock().unwrap(),
            vec![DateTime::<Utc>::MAX_UTC]
        );

        h.clock.advance(Duration::days(365));
        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AccountLocked { .. })));
        assert_eq!(
            service.lockout_status(EMAIL).await.unwrap().locked_until,
            Some(DateTime::<Utc>::MAX_UTC)
        );
        assert_eq!(h.backend.calls(), 1);
    }

    #[derive(Default)]
    struct LockedUntil {
        until: Mutex<Vec<DateTime<Utc>>>,
    }

    #[async_trait]
    impl EventHandler for LockedUntil {
        async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
            if let Event::AccountLocked { locked_until, .. } = event {
                self.until.lock().unwrap().push(*locked_until);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_invalid_credentials_forget_stored_user() {
        let h = Harness::new(three_attempts());
        h.backend.push(success());
        h.backend.push(rejected(Rejection::Forbidden));
        h.backend.push(rejected(Rejection::InvalidCredentials));

        h.service.login(EMAIL, PASSWORD).await.unwrap();

        // Only a 401 drops the stored profile
        let _ = h.service.login(EMAIL, PASSWORD).await;
        assert_eq!(h.service.current_user().await.unwrap(), Some(test_user()));

        let err = h.service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));
        assert!(h.service.current_user().await.unwrap().is_none());
        assert_eq!(h.service.token().await.unwrap().as_deref(), Some("tok_abc"));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_stored_user() {
        let h = Harness::new(three_attempts());
        h.backend.push(success());
        h.backend.push(unreachable());

        h.service.login(EMAIL, PASSWORD).await.unwrap();
        let _ = h.service.login(EMAIL, PASSWORD).await;
        assert_eq!(h.service.current_user().await.unwrap(), Some(test_user()));
    }

    /// Store whose every operation fails.
    struct UnavailableStore;

    #[async_trait]
    impl KeyValueStore for UnavailableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, Error> {
            Err(StorageError::Connection("storage unavailable".to_string()).into())
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), Error> {
            Err(StorageError::Connection("storage unavailable".to_string()).into())
        }

        async fn delete(&self, _key: &str) -> Result<(), Error> {
            Err(StorageError::Connection("storage unavailable".to_string()).into())
        }
    }

    fn with_unavailable_ledger(
        policy: StorageFailurePolicy,
    ) -> (
        Arc<ScriptedBackend>,
        LoginService<KeyValueAttemptLedger<UnavailableStore>, ScriptedBackend, InMemoryStore>,
    ) {
        let ledger = Arc::new(KeyValueAttemptLedger::new(
            Arc::new(UnavailableStore),
            "loginAttempts_",
        ));
        let config = three_attempts().with_storage_failure(policy);
        let backend = Arc::new(ScriptedBackend::default());
        let service = LoginService::new(
            Arc::new(LockoutService::new(ledger, config)),
            backend.clone(),
            Arc::new(SessionStore::new(Arc::new(InMemoryStore::new()))),
        );
        (backend, service)
    }

    #[tokio::test]
    async fn test_fail_closed_refuses_login_when_ledger_unavailable() {
        let (backend, service) = with_unavailable_ledger(StorageFailurePolicy::FailClosed);

        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(err.is_storage_error());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_fail_open_allows_login_when_ledger_unavailable() {
        let (backend, service) = with_unavailable_ledger(StorageFailurePolicy::FailOpen);
        backend.push(rejected(Rejection::InvalidCredentials));
        backend.push(success());

        let err = service.login(EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials)));

        let user = service.login(EMAIL, PASSWORD).await.unwrap();
        assert_eq!(user.id, 42);
    }

    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for EventLog {
        async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
            let name = match event {
                Event::LoginSucceeded { .. } => "login_succeeded",
                Event::LoginFailed { .. } => "login_failed",
                Event::AccountLocked { .. } => "account_locked",
                Event::AccountUnlocked { .. } => "account_unlocked",
                Event::LoggedOut { .. } => "logged_out",
            };
            self.events.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_follow_login_flow() {
        let h = Harness::new(LockoutConfig::default().with_max_attempts(2));
        let log = Arc::new(EventLog {
            events: Mutex::new(Vec::new()),
        });
        let events = EventBus::new();
        events.register(log.clone()).await;
        let service = LoginService::new(
            h.service.lockout.clone(),
            h.backend.clone(),
            h.service.sessions.clone(),
        )
        .with_clock(h.clock.clone())
        .with_event_bus(events);

        h.backend.push(rejected(Rejection::InvalidCredentials));
        h.backend.push(unreachable());
        h.backend.push(rejected(Rejection::InvalidCredentials));
        for _ in 0..3 {
            let _ = service.login(EMAIL, PASSWORD).await;
        }
        service.unlock(EMAIL).await.unwrap();
        h.backend.push(success());
        service.login(EMAIL, PASSWORD).await.unwrap();
        service.logout().await.unwrap();

        assert_eq!(
            *log.events.lock().unwrap(),
            vec!["login_failed", "account_locked", "login_succeeded", "logged_out"]
        );
    }
}
