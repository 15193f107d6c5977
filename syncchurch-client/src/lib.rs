//! HTTP client for the SyncChurch authentication backend.
//!
//! [`HttpAuthBackend`] implements [`AuthBackend`] on top of `reqwest` and is
//! responsible for the one distinction the lockout policy depends on: whether the
//! backend answered and rejected the credentials, or could not be reached at all.
//!
//! | Outcome                                 | Result                                      |
//! | --------------------------------------- | ------------------------------------------- |
//! | 2xx with a valid body                   | `Ok(LoginResponse)`                         |
//! | 401                                     | `Rejected(InvalidCredentials)`              |
//! | 403                                     | `Rejected(Forbidden)`                       |
//! | any other status                        | `Rejected(Other { status, message })`       |
//! | connection error, timeout               | `Transport(Unreachable)`                    |
//! | 2xx with a body that cannot be decoded  | `Transport(InvalidResponse)`                |
//!
//! # Example
//!
//! ```rust,no_run
//! use syncchurch_client::{ClientConfig, HttpAuthBackend};
//!
//! let backend = HttpAuthBackend::new(
//!     ClientConfig::default().with_base_url("https://api.example.org"),
//! )
//! .expect("client should build");
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use syncchurch_core::{
    AuthBackend, BackendError, Credentials, LoginResponse, Rejection, error::TransportError,
};

pub const DEFAULT_BASE_URL: &str = "https://api-dev-syncchurch.up.railway.app";

const LOG_IN_PATH: &str = "/authentication/log-in";
const LOG_OUT_PATH: &str = "/api/authentication/log-out";

/// Configuration for [`HttpAuthBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing slash.
    pub base_url: String,
    /// Upper bound on a whole request, connection included.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Error body sent by the backend on rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct LogInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// [`AuthBackend`] talking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpAuthBackend {
    pub fn new(config: ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::ClientBuilder::new()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Turn a non-success response into a rejection, keeping the backend's message.
    async fn rejection(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
            .and_then(|body| body.message);

        BackendError::Rejected(Rejection::from_status(status, message))
    }
}

fn unreachable(e: reqwest::Error) -> BackendError {
    tracing::warn!(error = %e, "Request to authentication backend failed");
    TransportError::Unreachable(e.to_string()).into()
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn log_in(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError> {
        let response = self
            .http
            .post(self.url(LOG_IN_PATH))
            .json(&LogInRequest {
                email: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .map_err(unreachable)?;

        if !response.status().is_success() {
            let rejection = Self::rejection(response).await;
            tracing::debug!(?rejection, "Backend rejected log-in");
            return Err(rejection);
        }

        response.json::<LoginResponse>().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to decode log-in response");
            TransportError::InvalidResponse(e.to_string()).into()
        })
    }

    async fn log_out(&self, token: Option<&str>) -> Result<(), BackendError> {
        let mut request = self.http.post(self.url(LOG_OUT_PATH));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(unreachable)?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        Ok(())
    }
}
