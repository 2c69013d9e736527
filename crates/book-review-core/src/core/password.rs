// crates/book-review-core/src/core/password.rs
// ============================================================================
// Module: Password Hashing
// Description: Salted argon2 password hashing and verification.
// Purpose: Keep plaintext passwords out of storage and comparisons.
// Dependencies: argon2
// ============================================================================

//! ## Overview
//! Passwords are hashed with argon2id using a fresh random salt and stored in
//! PHC string form. Verification parses the stored hash, so a corrupt value
//! fails closed instead of matching.
//!
//! [`verify_dummy`] burns the same work as a real verification so a login for
//! an unknown username takes roughly as long as one with a wrong password.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;

use argon2::Argon2;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Password hashing failures.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Hasher rejected the input or parameters.
    #[error("password hashing failed: {0}")]
    Hash(String),
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Hashes a password with a random salt.
///
/// # Errors
///
/// Returns [`PasswordError::Hash`] when argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

/// Returns true when `password` matches the stored `hash`.
#[must_use]
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

/// Runs a verification against a fixed hash and discards the result.
pub fn verify_dummy(password: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    let dummy = DUMMY.get_or_init(|| hash_password("book-review-dummy").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(hash, password);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
