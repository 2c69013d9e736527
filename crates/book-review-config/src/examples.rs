// crates/book-review-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Book Review configuration. The example parses and
//! validates as-is so it can be copied into place and edited.

/// Returns a canonical example `book-review.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:8080"
max_body_bytes = 65536

[server.audit]
enabled = true
# path = "book-review-audit.jsonl"

[session]
cookie_name = "book_review_session"
secure_cookie = false
# Sessions unused this long are discarded.
idle_timeout_secs = 86400
# Beyond this many live sessions the least recently used is evicted.
max_sessions = 10000

[database]
# Falls back to DATABASE_URL when unset; a sqlite:// prefix is accepted.
path = "book-review.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[ratings]
enabled = true
endpoint = "https://www.goodreads.com/book/review_counts.json"
# Falls back to API_KEY when unset.
api_key = "replace-me"
timeout_ms = 2000
max_response_bytes = 65536
allow_http = false
"#,
    )
}
