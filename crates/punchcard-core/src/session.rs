//! Session identity and its persistence seam.
//!
//! The session is a single explicit value threaded through the gateway,
//! channel, and dispatcher as a constructor dependency. Components never
//! re-read identity material ad hoc from ambient storage; only the session
//! context reads and writes the [`SessionStore`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identity and credential material for one signed-in user.
///
/// Invariant: when `token` is absent, `credential_secret` must be present
/// for authenticated calls to succeed. The core never enforces this
/// locally; a request missing both still goes out unauthenticated and the
/// server's response surfaces the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Backend identifier of the signed-in user.
    pub user_id: i64,
    /// Login name.
    pub username: String,
    /// Secret half of the encoded-credential pair, when that scheme is in use.
    pub credential_secret: Option<String>,
    /// Bearer token, when the deployment issues one.
    pub token: Option<String>,
    /// Last balance persisted alongside the identity, used to seed the
    /// balance engine before the profile fetch lands.
    pub cached_balance: Option<i64>,
}

impl Session {
    /// Create a session with identity only; credentials attach via the
    /// `with_*` helpers.
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            credential_secret: None,
            token: None,
            cached_balance: None,
        }
    }

    /// Attach a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach the secret half of the encoded-credential pair.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.credential_secret = Some(secret.into());
        self
    }

    /// Attach a cached balance carried over from the previous run.
    pub fn with_cached_balance(mut self, balance: i64) -> Self {
        self.cached_balance = Some(balance);
        self
    }
}

/// Shared view of the current session.
///
/// The session context owns the lifecycle (set at sign-in, cleared at
/// logout); the gateway and dispatcher receive a clone of this handle at
/// construction and read through it, so identity is threaded once rather
/// than re-read ad hoc at call sites.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SharedSession {
    /// Create an empty handle with no signed-in user.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle already holding `session`.
    pub fn with_session(session: Session) -> Self {
        let handle = Self::new();
        handle.set(session);
        handle
    }

    /// Replace the current session.
    pub fn set(&self, session: Session) {
        *self.inner.write() = Some(session);
    }

    /// Drop the current session.
    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    /// Snapshot of the current session, if one is active.
    pub fn get(&self) -> Option<Session> {
        self.inner.read().clone()
    }

    /// Identifier of the signed-in user, if any.
    pub fn user_id(&self) -> Option<i64> {
        self.inner.read().as_ref().map(|s| s.user_id)
    }
}

/// Persistence seam for the session.
///
/// Implemented by whatever key-value area the host environment provides.
/// The client only ever stores the whole session, loads it back, and clears
/// it on logout.
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any.
    fn load(&self) -> Option<Session>;

    /// Persist the session, replacing any previous one.
    fn save(&self, session: &Session);

    /// Remove all persisted session material.
    fn clear(&self);
}

/// In-memory session store.
///
/// The default store for tests and for hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.inner.read().clone()
    }

    fn save(&self, session: &Session) {
        *self.inner.write() = Some(session.clone());
    }

    fn clear(&self) {
        *self.inner.write() = None;
    }
}
