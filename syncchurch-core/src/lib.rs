//! Core functionality for the SyncChurch login guard
//!
//! This crate contains the pieces that sit between the login form and the remote
//! authentication backend:
//!
//! - [`KeyValueStore`]: the persistent string store everything else is built on
//! - [`repositories::AttemptLedger`]: per-email failed attempt counter with the time of the last failure
//! - [`services::LockoutService`]: decides whether an email is currently locked out
//! - [`services::LoginService`]: runs a login submission against an [`AuthBackend`]
//! - [`session::SessionStore`]: the token and user profile kept after a successful login
//!
//! Storage backends implement [`KeyValueStore`] and HTTP clients implement [`AuthBackend`];
//! neither needs to know anything about lockout rules.
pub mod auth;
pub mod clock;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod session;
pub mod storage;
pub mod user;
pub mod validation;

pub use auth::{AuthBackend, BackendError, Credentials, LoginResponse, Rejection};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Error;
pub use events::{Event, EventBus, EventHandler, UnlockReason};
pub use repositories::{AttemptLedger, KeyValueAttemptLedger};
pub use services::{LockoutService, LoginService};
pub use session::SessionStore;
pub use storage::{
    AttemptRecord, InMemoryStore, KeyValueStore, LockoutConfig, LockoutStatus,
    StorageFailurePolicy,
};
pub use user::User;
