// crates/book-review-config/src/lib.rs
// ============================================================================
// Module: Book Review Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for book-review.toml semantics.
// Dependencies: book-review-store-sqlite, serde, toml, url
// ============================================================================

//! ## Overview
//! `book-review-config` defines the configuration model for the Book Review
//! server and catalog loader. It provides strict, fail-closed validation,
//! environment fallbacks for the database location and ratings API key, and
//! a canonical example file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
