//! In-memory login sessions
//!
//! A session is created on login and referenced by an opaque random token
//! stored in the `UMLSESSION` cookie. Only the SHA-256 digest of the token is
//! kept as the map key. Sessions expire after a period of inactivity.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::FromRequestParts, http::request::Parts};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::api::ApiError;
use crate::core::db::models::ADMIN_ROLE_ID;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "UMLSESSION";

/// Identity bound to a session, available to every authenticated handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    #[serde(rename = "id_usuario")]
    pub user_id: i32,
    #[serde(rename = "id_rol")]
    pub role_id: i32,
    #[serde(rename = "nombre_usuario")]
    pub username: String,
    #[serde(rename = "nombre_rol")]
    pub role_name: String,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role_id == ADMIN_ROLE_ID
    }
}

/// Extracts the caller inserted into request extensions by the auth gate.
/// Outside the gate this rejects with `sesion_no_iniciada`.
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user: SessionUser,
    last_seen: Instant,
}

/// Concurrent session map shared by all request handlers
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions expire after `ttl` of inactivity
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Generate a random session token (64 hex chars)
    pub fn generate_token() -> String {
        let bytes: [u8; 32] = rand::random();
        hex::encode(bytes)
    }

    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Start a session and return the raw token for the cookie
    pub fn create(&self, user: SessionUser) -> String {
        let token = Self::generate_token();
        tracing::debug!("Session created for user {}", user.user_id);
        self.sessions.insert(
            Self::hash_token(&token),
            SessionEntry {
                user,
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// Resolve a token, refreshing its idle timer. Expired sessions are dropped.
    pub fn get(&self, token: &str) -> Option<SessionUser> {
        let key = Self::hash_token(token);

        {
            let mut entry = self.sessions.get_mut(&key)?;
            if entry.last_seen.elapsed() < self.ttl {
                entry.last_seen = Instant::now();
                return Some(entry.user.clone());
            }
        }

        self.sessions
            .remove_if(&key, |_, entry| entry.last_seen.elapsed() >= self.ttl);
        tracing::debug!("Session expired");
        None
    }

    /// Destroy a session. Returns whether it existed.
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(&Self::hash_token(token)).is_some()
    }

    /// Drop every session idle longer than the TTL, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, entry| entry.last_seen.elapsed() < self.ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
