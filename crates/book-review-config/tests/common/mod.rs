// crates/book-review-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for book-review-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use book_review_config::BookReviewConfig;
use book_review_config::ConfigError;

/// Parses a TOML string into a `BookReviewConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<BookReviewConfig, ConfigError> {
    BookReviewConfig::parse(toml_str)
}

/// Returns a config that validates without any environment input.
pub fn minimal_config() -> Result<BookReviewConfig, ConfigError> {
    config_from_toml(
        r#"
[database]
path = "books.db"

[ratings]
api_key = "test-key"
"#,
    )
}

/// Asserts that `result` is an error whose message contains `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
