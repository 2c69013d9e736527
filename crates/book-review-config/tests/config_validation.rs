//! Config validation tests for book-review-config.
// crates/book-review-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate defaults, fallbacks, and fail-closed checks.
// Purpose: Ensure invalid configuration is rejected before startup.
// =============================================================================

use std::time::Duration;

use book_review_config::BookReviewConfig;
use book_review_config::config_toml_example;
use book_review_store_sqlite::SqliteStoreMode;
use book_review_store_sqlite::SqliteSyncMode;

mod common;

use common::assert_invalid;
use common::config_from_toml;
use common::minimal_config;

type TestResult = Result<(), String>;

#[test]
fn defaults_apply_to_empty_sections() -> TestResult {
    let config = minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config.server.bind != "127.0.0.1:8080" {
        return Err(format!("unexpected bind {}", config.server.bind));
    }
    if config.server.max_body_bytes != 64 * 1024 {
        return Err("unexpected max_body_bytes".to_string());
    }
    if config.session.cookie_name != "book_review_session" || config.session.secure_cookie {
        return Err("unexpected session defaults".to_string());
    }
    if !config.ratings.enabled || config.ratings.timeout_ms != 2_000 || config.ratings.allow_http {
        return Err("unexpected ratings defaults".to_string());
    }
    if config.database.journal_mode != SqliteStoreMode::Wal
        || config.database.sync_mode != SqliteSyncMode::Full
    {
        return Err("unexpected database defaults".to_string());
    }
    Ok(())
}

#[test]
fn example_config_validates() -> TestResult {
    let config = config_from_toml(&config_toml_example()).map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn database_path_is_required() -> TestResult {
    let mut config = config_from_toml("[ratings]\nenabled = false").map_err(|err| err.to_string())?;
    config.apply_fallbacks(|_| None);
    assert_invalid(config.validate(), "database.path must be set")
}

#[test]
fn database_url_fallback_strips_sqlite_scheme() -> TestResult {
    let mut config = config_from_toml("[ratings]\nenabled = false").map_err(|err| err.to_string())?;
    config.apply_fallbacks(|name| {
        (name == "DATABASE_URL").then(|| "sqlite:///var/lib/book-review/books.db".to_string())
    });
    config.validate().map_err(|err| err.to_string())?;
    let store = config.database.store_config().map_err(|err| err.to_string())?;
    if store.path.to_string_lossy() != "/var/lib/book-review/books.db" {
        return Err(format!("unexpected path {}", store.path.display()));
    }
    Ok(())
}

#[test]
fn explicit_values_win_over_fallbacks() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.apply_fallbacks(|name| Some(format!("from-env-{name}")));
    if config.database.path.as_deref() != Some("books.db") {
        return Err("database.path was overridden".to_string());
    }
    if config.ratings.api_key.as_deref() != Some("test-key") {
        return Err("ratings.api_key was overridden".to_string());
    }
    Ok(())
}

#[test]
fn non_sqlite_database_url_is_rejected() -> TestResult {
    let mut config = config_from_toml("[ratings]\nenabled = false").map_err(|err| err.to_string())?;
    config.apply_fallbacks(|name| {
        (name == "DATABASE_URL").then(|| "postgres://db.example.com/books".to_string())
    });
    assert_invalid(config.validate(), "must be a sqlite file path")
}

#[test]
fn api_key_required_only_when_ratings_enabled() -> TestResult {
    let mut enabled = config_from_toml("[database]\npath = \"books.db\"").map_err(|err| err.to_string())?;
    enabled.apply_fallbacks(|_| None);
    assert_invalid(enabled.validate(), "ratings.api_key must be set")?;

    let mut disabled = config_from_toml("[database]\npath = \"books.db\"\n[ratings]\nenabled = false")
        .map_err(|err| err.to_string())?;
    disabled.apply_fallbacks(|_| None);
    disabled.validate().map_err(|err| err.to_string())
}

#[test]
fn api_key_falls_back_to_environment() -> TestResult {
    let mut config = config_from_toml("[database]\npath = \"books.db\"").map_err(|err| err.to_string())?;
    config.apply_fallbacks(|name| (name == "API_KEY").then(|| " key-123 ".to_string()));
    if config.ratings.api_key.as_deref() != Some("key-123") {
        return Err("api key fallback not applied".to_string());
    }
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn ratings_timeout_must_be_bounded() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.ratings.timeout_ms = 0;
    assert_invalid(config.validate(), "ratings.timeout_ms")?;
    config.ratings.timeout_ms = 30_001;
    assert_invalid(config.validate(), "ratings.timeout_ms")?;
    config.ratings.timeout_ms = 30_000;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn ratings_endpoint_requires_https_unless_allowed() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.ratings.endpoint = "http://127.0.0.1:9000/ratings".to_string();
    assert_invalid(config.validate(), "without allow_http")?;
    config.ratings.allow_http = true;
    config.validate().map_err(|err| err.to_string())?;
    config.ratings.endpoint = "ftp://ratings.example.com".to_string();
    assert_invalid(config.validate(), "unsupported scheme")?;
    config.ratings.endpoint = "not a url".to_string();
    assert_invalid(config.validate(), "ratings.endpoint is invalid")
}

#[test]
fn server_limits_are_checked() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.server.max_body_bytes = 0;
    assert_invalid(config.validate(), "max_body_bytes")?;
    config.server.max_body_bytes = 1024;
    config.server.bind = "localhost".to_string();
    assert_invalid(config.validate(), "invalid bind address")
}

#[test]
fn cookie_name_must_be_a_token() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    config.session.cookie_name = "bad name".to_string();
    assert_invalid(config.validate(), "session.cookie_name")?;
    config.session.cookie_name = String::new();
    assert_invalid(config.validate(), "session.cookie_name")?;
    config.session.cookie_name = "sid".to_string();
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn session_limits_are_bounded() -> TestResult {
    let mut config = minimal_config().map_err(|err| err.to_string())?;
    let limits = config.session.limits();
    if limits.idle_timeout != Duration::from_secs(86_400) || limits.max_sessions != 10_000 {
        return Err(format!(
            "unexpected session limits {}s/{}",
            limits.idle_timeout.as_secs(),
            limits.max_sessions
        ));
    }
    config.session.idle_timeout_secs = 59;
    assert_invalid(config.validate(), "session.idle_timeout_secs")?;
    config.session.idle_timeout_secs = 31 * 24 * 60 * 60;
    assert_invalid(config.validate(), "session.idle_timeout_secs")?;
    config.session.idle_timeout_secs = 600;
    config.session.max_sessions = 0;
    assert_invalid(config.validate(), "session.max_sessions")?;
    config.session.max_sessions = 2_000_000;
    assert_invalid(config.validate(), "session.max_sessions")?;
    config.session.max_sessions = 50;
    config.validate().map_err(|err| err.to_string())?;
    let limits = config.session.limits();
    if limits.idle_timeout != Duration::from_secs(600) || limits.max_sessions != 50 {
        return Err(format!(
            "limits did not follow config: {}s/{}",
            limits.idle_timeout.as_secs(),
            limits.max_sessions
        ));
    }
    Ok(())
}

#[test]
fn unknown_journal_mode_fails_to_parse() -> TestResult {
    match BookReviewConfig::parse("[database]\npath = \"x.db\"\njournal_mode = \"memory\"") {
        Err(err) if err.to_string().contains("config parse error") => Ok(()),
        Err(err) => Err(format!("unexpected error {err}")),
        Ok(_) => Err("expected parse failure".to_string()),
    }
}
