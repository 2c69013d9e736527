// crates/book-review-core/src/runtime/sessions.rs
// ============================================================================
// Module: In-Memory Session Store
// Description: Process-local session registry with random opaque tokens.
// Purpose: Bind browser sessions to user identifiers outside the database.
// Dependencies: base64, rand, crate::interfaces
// ============================================================================

//! ## Overview
//! Sessions live only for the life of the process, matching the browser
//! session cookie they are paired with. Tokens are 32 bytes from the OS RNG,
//! encoded as URL-safe base64 without padding so they can travel in a cookie
//! value unchanged.
//!
//! The registry is bounded. A session idle longer than
//! [`SessionLimits::idle_timeout`] is dropped when it is next presented and
//! swept whenever a session is created. When the registry is full, creating a
//! session evicts the least recently seen one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::core::SessionToken;
use crate::core::UserId;
use crate::interfaces::SessionError;
use crate::interfaces::SessionStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of random bytes in a session token.
pub const SESSION_TOKEN_BYTES: usize = 32;
/// Default idle lifetime of a session.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Bounds on the session registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions not presented for this long are discarded.
    pub idle_timeout: Duration,
    /// Maximum number of live sessions; at least one is always kept.
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

// ============================================================================
// SECTION: Token Generation
// ============================================================================

/// Generates a fresh opaque session token.
#[must_use]
pub fn generate_session_token() -> SessionToken {
    let mut bytes = [0_u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SessionToken::new(URL_SAFE_NO_PAD.encode(bytes))
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Live session record.
#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    /// Bound user.
    user_id: UserId,
    /// Last time the session was created or presented.
    last_seen: Instant,
}

/// Token to session map.
type SessionMap = BTreeMap<String, SessionEntry>;

/// In-memory session registry.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    /// Token to session map protected by a mutex.
    sessions: Arc<Mutex<SessionMap>>,
    /// Idle lifetime and capacity.
    limits: SessionLimits,
}

impl InMemorySessionStore {
    /// Creates an empty session store with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty session store with the given limits.
    #[must_use]
    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::default(),
            limits,
        }
    }

    /// Returns the number of sessions held, including idle ones not yet swept.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the registry lock is poisoned.
    pub fn len(&self) -> Result<usize, SessionError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when no sessions are held.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the registry lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, SessionError> {
        Ok(self.lock()?.is_empty())
    }

    /// Acquires the registry lock.
    fn lock(&self) -> Result<MutexGuard<'_, SessionMap>, SessionError> {
        self.sessions
            .lock()
            .map_err(|_| SessionError::Store("session store mutex poisoned".to_string()))
    }

    /// Returns true when `entry` has been idle past the timeout at `now`.
    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) >= self.limits.idle_timeout
    }

    /// Creates a session as of `now`.
    fn create_at(&self, user_id: UserId, now: Instant) -> Result<SessionToken, SessionError> {
        let mut guard = self.lock()?;
        guard.retain(|_, entry| !self.is_expired(entry, now));
        let capacity = self.limits.max_sessions.max(1);
        while guard.len() >= capacity {
            let Some(oldest) = guard
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(token, _)| token.clone())
            else {
                break;
            };
            guard.remove(&oldest);
        }
        let mut token = generate_session_token();
        while guard.contains_key(token.as_str()) {
            token = generate_session_token();
        }
        guard.insert(
            token.as_str().to_string(),
            SessionEntry {
                user_id,
                last_seen: now,
            },
        );
        Ok(token)
    }

    /// Resolves a token as of `now`, refreshing or dropping its entry.
    fn resolve_at(
        &self,
        token: &SessionToken,
        now: Instant,
    ) -> Result<Option<UserId>, SessionError> {
        let mut guard = self.lock()?;
        let Some(entry) = guard.get_mut(token.as_str()) else {
            return Ok(None);
        };
        if self.is_expired(entry, now) {
            guard.remove(token.as_str());
            return Ok(None);
        }
        entry.last_seen = now;
        Ok(Some(entry.user_id))
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, user_id: UserId) -> Result<SessionToken, SessionError> {
        self.create_at(user_id, Instant::now())
    }

    fn resolve(&self, token: &SessionToken) -> Result<Option<UserId>, SessionError> {
        self.resolve_at(token, Instant::now())
    }

    fn destroy(&self, token: &SessionToken) -> Result<(), SessionError> {
        self.lock()?.remove(token.as_str());
        Ok(())
    }

    fn destroy_user(&self, user_id: UserId) -> Result<(), SessionError> {
        self.lock()?.retain(|_, entry| entry.user_id != user_id);
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
