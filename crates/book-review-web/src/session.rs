// crates/book-review-web/src/session.rs
// ============================================================================
// Module: Session Cookies
// Description: Read and write the opaque session token cookie.
// Purpose: Keep the browser's view of a session to a single HttpOnly token.
// Dependencies: axum, book-review-config, book-review-core
// ============================================================================

//! ## Overview
//! The browser holds only the token minted by the session store. Cookies are
//! browser-session scoped (no `Max-Age`), `HttpOnly`, `SameSite=Lax`, and
//! `Path=/`; `Secure` is added when configured. Values that cannot be a
//! token are ignored rather than forwarded to the store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::header::COOKIE;
use axum::http::header::InvalidHeaderValue;
use book_review_config::SessionConfig;
use book_review_core::SessionToken;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Longest cookie value accepted as a token.
const MAX_TOKEN_LENGTH: usize = 128;

// ============================================================================
// SECTION: Cookie Settings
// ============================================================================

/// Session cookie naming and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    /// Cookie name.
    name: String,
    /// Whether to add the `Secure` attribute.
    secure: bool,
}

impl CookieSettings {
    /// Creates settings from a cookie name and `Secure` flag.
    #[must_use]
    pub fn new(name: impl Into<String>, secure: bool) -> Self {
        Self {
            name: name.into(),
            secure,
        }
    }

    /// Creates settings from validated session configuration.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.cookie_name.clone(), config.secure_cookie)
    }

    /// Extracts the session token from request cookies, if present.
    #[must_use]
    pub fn read_token(&self, headers: &HeaderMap) -> Option<SessionToken> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim())
            .filter(|value| is_token_value(value))
            .map(SessionToken::new)
    }

    /// Builds the `Set-Cookie` value that stores `token`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderValue`] when the name or token is not header-safe.
    pub fn issue(&self, token: &SessionToken) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax{}",
            self.name,
            token.as_str(),
            self.secure_suffix()
        ))
    }

    /// Builds the `Set-Cookie` value that removes the session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHeaderValue`] when the name is not header-safe.
    pub fn clear(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
            self.name,
            self.secure_suffix()
        ))
    }

    /// Returns the `Secure` attribute when enabled.
    const fn secure_suffix(&self) -> &'static str {
        if self.secure { "; Secure" } else { "" }
    }
}

/// Returns true when `value` could be a URL-safe base64 token.
fn is_token_value(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_TOKEN_LENGTH
        && value.bytes().all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

// ============================================================================
// SECTION: Tests
// ============================================================================
