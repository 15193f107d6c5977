//! The locally stored session.
//!
//! After a successful login the backend's token is kept under `token` and the user
//! profile, as JSON, under `user`. Both live in the same [`KeyValueStore`] as the
//! attempt ledger.

use std::sync::Arc;

use crate::{Error, LoginResponse, User, error::StorageError, storage::KeyValueStore};

const TOKEN_KEY: &str = "token";
const USER_KEY: &str = "user";

pub struct SessionStore<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Persist the token and user from a successful login.
    ///
    /// An empty token is not stored, and any previous token is left in place.
    pub async fn save(&self, response: &LoginResponse) -> Result<(), Error> {
        if !response.token.is_empty() {
            self.store.set(TOKEN_KEY, &response.token).await?;
        }
        self.set_user(&response.user).await
    }

    /// Replace the stored user profile.
    pub async fn set_user(&self, user: &User) -> Result<(), Error> {
        let value = serde_json::to_string(user).map_err(StorageError::from)?;
        self.store.set(USER_KEY, &value).await
    }

    /// The stored user, if any. An unreadable profile reads as no user.
    pub async fn user(&self) -> Result<Option<User>, Error> {
        let Some(raw) = self.store.get(USER_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable stored user");
                Ok(None)
            }
        }
    }

    pub async fn token(&self) -> Result<Option<String>, Error> {
        self.store.get(TOKEN_KEY).await
    }

    pub async fn is_authenticated(&self) -> Result<bool, Error> {
        Ok(self.user().await?.is_some())
    }

    /// Forget the stored user profile but keep the token.
    pub async fn clear_user(&self) -> Result<(), Error> {
        self.store.delete(USER_KEY).await
    }

    /// Remove the token and user.
    pub async fn clear(&self) -> Result<(), Error> {
        self.store.delete(USER_KEY).await?;
        self.store.delete(TOKEN_KEY).await
    }
}
