use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Error, User,
    error::{AuthError, TransportError},
};

/// Shown when the backend rejects a login without saying why.
pub(crate) const GENERIC_REJECTION: &str = "Login failed. Please try again.";

/// The credentials submitted by the login form.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Successful log-in payload issued by the authentication backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(default)]
    pub token: String,
}

/// How the backend rejected a log-in request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The backend answered 401: wrong email or password.
    InvalidCredentials,
    /// The backend answered 403.
    Forbidden,
    /// Any other non-success answer, with the backend's message if it sent one.
    Other { status: u16, message: Option<String> },
}

impl Rejection {
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => Rejection::InvalidCredentials,
            403 => Rejection::Forbidden,
            _ => Rejection::Other { status, message },
        }
    }
}

impl From<Rejection> for AuthError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidCredentials => AuthError::InvalidCredentials,
            Rejection::Forbidden => AuthError::Forbidden,
            Rejection::Other { message, .. } => {
                AuthError::Rejected(message.unwrap_or_else(|| GENERIC_REJECTION.to_string()))
            }
        }
    }
}

/// Failure of a call to the authentication backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend was reached and answered with a rejection.
    #[error("rejected by backend: {0:?}")]
    Rejected(Rejection),
    /// The backend could not be reached, or its answer could not be understood.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BackendError {
    /// Whether this failure is evidence of a guessing attempt.
    ///
    /// Only answers from the backend count. Connectivity problems never do.
    pub fn counts_as_attempt(&self) -> bool {
        matches!(self, BackendError::Rejected(_))
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(rejection) => AuthError::from(rejection).into(),
            BackendError::Transport(e) => e.into(),
        }
    }
}

/// The remote authentication service.
///
/// Implementations must classify failures correctly: the lockout counter is only
/// incremented for [`BackendError::Rejected`].
#[async_trait]
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchange credentials for a session token and user profile.
    async fn log_in(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError>;

    /// End the session identified by `token` on the backend.
    async fn log_out(&self, token: Option<&str>) -> Result<(), BackendError>;
}
