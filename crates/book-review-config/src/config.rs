// crates/book-review-config/src/config.rs
// ============================================================================
// Module: Book Review Configuration
// Description: Configuration loading and validation for Book Review.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: book-review-core, book-review-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `BOOK_REVIEW_CONFIG`, then
//! `book-review.toml` in the working directory. Only the last one may be
//! absent, in which case every section takes its defaults.
//!
//! Two settings fall back to the environment when the file leaves them out:
//! `database.path` reads `DATABASE_URL` (an optional `sqlite://` prefix is
//! stripped) and `ratings.api_key` reads `API_KEY`. Validation runs after the
//! fallbacks, so a missing database path or API key fails the load.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use book_review_core::SessionLimits;
use book_review_store_sqlite::SqliteStoreConfig;
use book_review_store_sqlite::SqliteStoreMode;
use book_review_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "book-review.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "BOOK_REVIEW_CONFIG";
/// Environment variable holding the database location.
pub const DATABASE_URL_ENV_VAR: &str = "DATABASE_URL";
/// Environment variable holding the ratings API key.
pub const API_KEY_ENV_VAR: &str = "API_KEY";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address for the HTTP server.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default maximum request body size in bytes.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Default session cookie name.
pub(crate) const DEFAULT_COOKIE_NAME: &str = "book_review_session";
/// Maximum session cookie name length.
pub(crate) const MAX_COOKIE_NAME_LENGTH: usize = 64;
/// Default session idle timeout in seconds.
pub(crate) const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 24 * 60 * 60;
/// Minimum session idle timeout in seconds.
pub(crate) const MIN_SESSION_IDLE_TIMEOUT_SECS: u64 = 60;
/// Maximum session idle timeout in seconds.
pub(crate) const MAX_SESSION_IDLE_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;
/// Default cap on live sessions.
pub(crate) const DEFAULT_MAX_SESSIONS: usize = 10_000;
/// Upper bound for `session.max_sessions`.
pub(crate) const MAX_MAX_SESSIONS: usize = 1_000_000;
/// Default busy timeout for `SQLite` connections (ms).
pub(crate) const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default external ratings endpoint.
pub(crate) const DEFAULT_RATINGS_ENDPOINT: &str =
    "https://www.goodreads.com/book/review_counts.json";
/// Default ratings request timeout (ms).
pub(crate) const DEFAULT_RATINGS_TIMEOUT_MS: u64 = 2_000;
/// Minimum ratings request timeout (ms).
pub(crate) const MIN_RATINGS_TIMEOUT_MS: u64 = 100;
/// Maximum ratings request timeout (ms).
pub(crate) const MAX_RATINGS_TIMEOUT_MS: u64 = 30_000;
/// Default maximum ratings response size in bytes.
pub(crate) const DEFAULT_RATINGS_MAX_RESPONSE_BYTES: usize = 64 * 1024;
/// Maximum allowed ratings response size in bytes.
pub(crate) const MAX_RATINGS_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Maximum API key length.
pub(crate) const MAX_API_KEY_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Book Review configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookReviewConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// External ratings configuration.
    #[serde(default)]
    pub ratings: RatingsConfig,
}

impl BookReviewConfig {
    /// Loads configuration from disk, applies environment fallbacks, and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, required) = resolve_path(path)?;
        validate_path(&resolved)?;
        let mut config = if !required && !resolved.exists() {
            Self::default()
        } else {
            let bytes = fs::read(&resolved).map_err(|err| {
                ConfigError::Io(format!("{}: {err}", resolved.display()))
            })?;
            if bytes.len() > MAX_CONFIG_FILE_SIZE {
                return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
            }
            let content = std::str::from_utf8(&bytes)
                .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
            Self::parse(content)?
        };
        config.apply_fallbacks(|name| env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parses TOML without applying fallbacks or validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Fills unset values from `lookup`, which maps variable names to values.
    pub fn apply_fallbacks<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.database.path.is_none() {
            self.database.path = lookup(DATABASE_URL_ENV_VAR)
                .map(|value| strip_sqlite_scheme(value.trim()).to_string())
                .filter(|value| !value.is_empty());
        }
        if self.ratings.api_key.is_none() {
            self.ratings.api_key = lookup(API_KEY_ENV_VAR)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.session.validate()?;
        self.database.validate()?;
        self.ratings.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.bind_addr()?;
        self.audit.validate()
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional audit log path (JSON lines); stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie carrying the session token.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the cookie `Secure`.
    #[serde(default)]
    pub secure_cookie: bool,
    /// Seconds a session may go unused before it is discarded.
    #[serde(default = "default_session_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Maximum live sessions; the least recently used is evicted beyond it.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure_cookie: false,
            idle_timeout_secs: default_session_idle_timeout_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl SessionConfig {
    /// Returns the session registry limits.
    #[must_use]
    pub const fn limits(&self) -> SessionLimits {
        SessionLimits {
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            max_sessions: self.max_sessions,
        }
    }

    /// Validates session configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let name = self.cookie_name.as_str();
        if name.is_empty() || name.len() > MAX_COOKIE_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "session.cookie_name must be 1-{MAX_COOKIE_NAME_LENGTH} characters"
            )));
        }
        if !name.bytes().all(is_cookie_token_byte) {
            return Err(ConfigError::Invalid(
                "session.cookie_name contains characters not allowed in a cookie name"
                    .to_string(),
            ));
        }
        if !(MIN_SESSION_IDLE_TIMEOUT_SECS..=MAX_SESSION_IDLE_TIMEOUT_SECS)
            .contains(&self.idle_timeout_secs)
        {
            return Err(ConfigError::Invalid(format!(
                "session.idle_timeout_secs must be between {MIN_SESSION_IDLE_TIMEOUT_SECS} and \
                 {MAX_SESSION_IDLE_TIMEOUT_SECS}"
            )));
        }
        if self.max_sessions == 0 || self.max_sessions > MAX_MAX_SESSIONS {
            return Err(ConfigError::Invalid(format!(
                "session.max_sessions must be between 1 and {MAX_MAX_SESSIONS}"
            )));
        }
        Ok(())
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file.
    #[serde(default)]
    pub path: Option<String>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl DatabaseConfig {
    /// Builds the `SQLite` store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no database path is configured.
    pub fn store_config(&self) -> Result<SqliteStoreConfig, ConfigError> {
        let path = self.path.as_deref().map(str::trim).filter(|path| !path.is_empty()).ok_or_else(
            || {
                ConfigError::Invalid(format!(
                    "database.path must be set (or provide {DATABASE_URL_ENV_VAR})"
                ))
            },
        )?;
        Ok(SqliteStoreConfig {
            path: PathBuf::from(path),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        })
    }

    /// Validates database configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let store = self.store_config()?;
        let raw = store.path.to_string_lossy();
        if raw.contains("://") {
            return Err(ConfigError::Invalid(format!(
                "database.path must be a sqlite file path, got {raw}"
            )));
        }
        validate_path_string("database.path", &raw)?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// External ratings configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingsConfig {
    /// Enable external rating lookups.
    #[serde(default = "default_ratings_enabled")]
    pub enabled: bool,
    /// Ratings endpoint URL.
    #[serde(default = "default_ratings_endpoint")]
    pub endpoint: String,
    /// API key sent with each lookup.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_ratings_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response body size in bytes.
    #[serde(default = "default_ratings_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Allow cleartext http endpoints.
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            enabled: default_ratings_enabled(),
            endpoint: default_ratings_endpoint(),
            api_key: None,
            timeout_ms: default_ratings_timeout_ms(),
            max_response_bytes: default_ratings_max_response_bytes(),
            allow_http: false,
        }
    }
}

impl RatingsConfig {
    /// Validates ratings configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        let endpoint = Url::parse(self.endpoint.trim())
            .map_err(|err| ConfigError::Invalid(format!("ratings.endpoint is invalid: {err}")))?;
        match endpoint.scheme() {
            "https" => {}
            "http" if self.allow_http => {}
            "http" => {
                return Err(ConfigError::Invalid(
                    "ratings.endpoint uses http:// without allow_http".to_string(),
                ));
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "ratings.endpoint has unsupported scheme: {other}"
                )));
            }
        }
        if !(MIN_RATINGS_TIMEOUT_MS..=MAX_RATINGS_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "ratings.timeout_ms must be between {MIN_RATINGS_TIMEOUT_MS} and \
                 {MAX_RATINGS_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RATINGS_MAX_RESPONSE_BYTES
        {
            return Err(ConfigError::Invalid(format!(
                "ratings.max_response_bytes must be between 1 and {MAX_RATINGS_MAX_RESPONSE_BYTES}"
            )));
        }
        let key = self.api_key.as_deref().map(str::trim).unwrap_or_default();
        if key.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "ratings.api_key must be set when ratings are enabled (or provide \
                 {API_KEY_ENV_VAR})"
            )));
        }
        if key.len() > MAX_API_KEY_LENGTH {
            return Err(ConfigError::Invalid("ratings.api_key exceeds max length".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag is true when the file must exist.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Strips an optional `sqlite://` scheme from a database URL.
fn strip_sqlite_scheme(value: &str) -> &str {
    value.strip_prefix("sqlite://").unwrap_or(value)
}

/// Returns true for bytes allowed in an RFC 6265 cookie name.
const fn is_cookie_token_byte(byte: u8) -> bool {
    byte.is_ascii_graphic()
        && !matches!(
            byte,
            b'(' | b')'
                | b'<'
                | b'>'
                | b'@'
                | b','
                | b';'
                | b':'
                | b'\\'
                | b'"'
                | b'/'
                | b'['
                | b']'
                | b'?'
                | b'='
                | b'{'
                | b'}'
        )
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

/// Default session idle timeout.
const fn default_session_idle_timeout_secs() -> u64 {
    DEFAULT_SESSION_IDLE_TIMEOUT_SECS
}

/// Default session cap.
const fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

/// Default session cookie name.
fn default_cookie_name() -> String {
    DEFAULT_COOKIE_NAME.to_string()
}

/// Default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Ratings lookups are on unless disabled.
const fn default_ratings_enabled() -> bool {
    true
}

/// Default ratings endpoint.
fn default_ratings_endpoint() -> String {
    DEFAULT_RATINGS_ENDPOINT.to_string()
}

/// Default ratings timeout.
const fn default_ratings_timeout_ms() -> u64 {
    DEFAULT_RATINGS_TIMEOUT_MS
}

/// Default ratings response size limit.
const fn default_ratings_max_response_bytes() -> usize {
    DEFAULT_RATINGS_MAX_RESPONSE_BYTES
}

// ============================================================================
// SECTION: Tests
// ============================================================================
