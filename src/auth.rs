//! Session/auth collaborator backed by shared storage.
//!
//! SYSTEM CONTEXT
//! ==============
//! Sign-in writes the current-user record and bearer token into shared
//! storage; `logout` removes both. Removing the current-user record is what
//! other tabs observe as a peer logout. Token issuance stays server-owned:
//! this store only holds what the server returned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StorageKeys;
use crate::error::IdleError;
use crate::storage::SharedStorage;

/// Signed-in user as returned by the sign-in endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub token: String,
    pub expires_at: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// What the idle controller needs from the auth layer.
pub trait SessionAuth: Send + Sync {
    fn is_logged_in(&self) -> bool;
    fn logout(&self);
}

/// Route changes requested by the controller.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Navigator that only logs; for hosts without a router.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!(%route, "navigate");
    }
}

#[derive(Clone)]
pub struct AuthStore {
    storage: Arc<dyn SharedStorage>,
    keys: StorageKeys,
}

impl AuthStore {
    #[must_use]
    pub fn new(storage: Arc<dyn SharedStorage>, keys: StorageKeys) -> Self {
        Self { storage, keys }
    }

    /// Persist a successful sign-in.
    pub fn sign_in(&self, user: &User) -> Result<(), IdleError> {
        let raw = serde_json::to_string(user)?;
        self.storage.set(&self.keys.token, &user.token);
        self.storage.set(&self.keys.current_user, &raw);
        info!(user_id = %user.user_id, "signed in");
        Ok(())
    }

    /// Current user record, if any.
    pub fn current_user(&self) -> Result<Option<User>, IdleError> {
        self.storage
            .get(&self.keys.current_user)
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(IdleError::from)
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.storage.get(&self.keys.token)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.current_user(), Ok(Some(user)) if user.is_admin)
    }
}

impl SessionAuth for AuthStore {
    fn is_logged_in(&self) -> bool {
        self.storage.get(&self.keys.current_user).is_some()
    }

    fn logout(&self) {
        self.storage.remove(&self.keys.token);
        self.storage.remove(&self.keys.current_user);
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
