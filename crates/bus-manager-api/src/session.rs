//! Session store
//!
//! One in-memory [`Session`] holds the (token, user) pair for the current
//! login. It is created once at process start, shared through a single
//! [`SharedSession`] handle, and explicitly cleared on logout or when the
//! server answers 401. Durability is the app shell's job: it loads the
//! session from `eframe::Storage` on startup and writes it back on save,
//! using [`Session::from_json`] / [`Session::to_json`].

use crate::types::User;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// The persisted (token, user) pair identifying the logged-in actor.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
}

/// Shared handle passed to everything that needs authentication state.
pub type SharedSession = Arc<RwLock<Session>>;

/// Wrap a session in the shared handle.
pub fn shared(session: Session) -> SharedSession {
    Arc::new(RwLock::new(session))
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_user(&mut self, user: User) {
        self.user = Some(user);
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// True iff a token is present. The user record alone does not count.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Forget the token and user. Idempotent.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }

    /// Restore a session from its persisted form. A missing or corrupt blob
    /// yields a fresh, unauthenticated session rather than an error.
    pub fn from_json(json: Option<&str>) -> Self {
        match json {
            Some(json) if !json.is_empty() => serde_json::from_str(json).unwrap_or_else(|err| {
                tracing::warn!("discarding unreadable persisted session: {err}");
                Self::new()
            }),
            _ => Self::new(),
        }
    }

    /// Serialize for persistence.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
