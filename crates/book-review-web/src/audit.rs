// crates/book-review-web/src/audit.rs
// ============================================================================
// Module: Web Audit Logging
// Description: Structured audit events for authentication and requests.
// Purpose: Emit redacted JSON-line audit records without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Three event families are recorded: `auth` for session lifecycle actions,
//! `request` for every handled route, and `store_error` for backend failures
//! that are hidden from users. Events never carry usernames, passwords, or
//! session tokens; users are identified by numeric id only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use book_review_core::UserId;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authentication actions that produce audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthAction {
    /// Account registration.
    Register,
    /// Credential login.
    Login,
    /// Session logout.
    Logout,
    /// Password change.
    ChangePassword,
}

/// Outcome label shared by all audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Operation completed.
    Success,
    /// Operation was rejected or failed.
    Failure,
}

/// Authentication audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Action attempted.
    pub action: AuthAction,
    /// Action outcome.
    pub outcome: AuditOutcome,
    /// User id when known.
    pub user_id: Option<i64>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
}

/// Request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// HTTP method.
    pub method: String,
    /// Route pattern, not the concrete path.
    pub route: &'static str,
    /// Response status code.
    pub status: u16,
    /// Request outcome.
    pub outcome: AuditOutcome,
    /// Handler duration in milliseconds.
    pub duration_ms: u128,
}

/// Internal failure audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct StoreErrorAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Route pattern that observed the failure.
    pub route: &'static str,
    /// Backend error message.
    pub message: String,
}

impl AuthAuditEvent {
    /// Creates a new auth event with a consistent timestamp.
    #[must_use]
    pub fn new(
        action: AuthAction,
        user_id: Option<UserId>,
        error_kind: Option<&'static str>,
    ) -> Self {
        let outcome =
            if error_kind.is_none() { AuditOutcome::Success } else { AuditOutcome::Failure };
        Self {
            event: "auth",
            timestamp_ms: now_ms(),
            action,
            outcome,
            user_id: user_id.map(UserId::get),
            error_kind,
        }
    }
}

impl RequestAuditEvent {
    /// Creates a new request event with a consistent timestamp.
    #[must_use]
    pub fn new(method: &str, route: &'static str, status: u16, duration_ms: u128) -> Self {
        let outcome = if status < 400 { AuditOutcome::Success } else { AuditOutcome::Failure };
        Self {
            event: "request",
            timestamp_ms: now_ms(),
            method: method.to_string(),
            route,
            status,
            outcome,
            duration_ms,
        }
    }
}

impl StoreErrorAuditEvent {
    /// Creates a new store error event with a consistent timestamp.
    #[must_use]
    pub fn new(route: &'static str, message: impl Into<String>) -> Self {
        Self {
            event: "store_error",
            timestamp_ms: now_ms(),
            route,
            message: message.into(),
        }
    }
}

/// Milliseconds since the Unix epoch, zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for web events.
pub trait AuditSink: Send + Sync {
    /// Record an authentication event.
    fn record_auth(&self, event: &AuthAuditEvent);

    /// Record a request event.
    fn record_request(&self, _event: &RequestAuditEvent) {}

    /// Record an internal failure event.
    fn record_store_error(&self, _event: &StoreErrorAuditEvent) {}
}

/// Writes one serialized event followed by a newline.
fn write_line<T: Serialize>(writer: &mut impl Write, event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(writer, "{payload}");
        let _ = writer.flush();
    }
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        write_line(&mut io::stderr(), event);
    }

    fn record_request(&self, event: &RequestAuditEvent) {
        write_line(&mut io::stderr(), event);
    }

    fn record_store_error(&self, event: &StoreErrorAuditEvent) {
        write_line(&mut io::stderr(), event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Writes one event under the file lock.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(mut file) = self.file.lock() {
            write_line(&mut *file, event);
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_auth(&self, event: &AuthAuditEvent) {
        self.append(event);
    }

    fn record_request(&self, event: &RequestAuditEvent) {
        self.append(event);
    }

    fn record_store_error(&self, event: &StoreErrorAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_auth(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
