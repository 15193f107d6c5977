//! The authenticated user's profile
//!
//! The profile is issued by the authentication backend on login and kept in the
//! session store until logout.
//!
//! | Field       | Type          | Description                                  |
//! | ----------- | ------------- | -------------------------------------------- |
//! | `id`        | `i64`         | Backend identifier of the user.              |
//! | `email`     | `String`      | Email address used to log in.                |
//! | `full_name` | `String`      | Display name.                                |
//! | `role`      | `String`      | Role assigned by the backend (e.g. `ADMIN`). |
//! | `active`    | `bool`        | Whether the account is active.               |
//! | `church_id` | `Option<i64>` | Church the user belongs to, if any.          |
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub active: bool,
    pub church_id: Option<i64>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn belongs_to_church(&self, church_id: i64) -> bool {
        self.church_id == Some(church_id)
    }
}
