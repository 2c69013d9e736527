// crates/book-review-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Book Store
// Description: Durable BookStore backend using SQLite.
// Purpose: Persist users, books, and reviews with relational constraints.
// Dependencies: book-review-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`BookStore`] implementation over the
//! `users`, `books`, and `reviews` tables. Uniqueness of usernames, isbns,
//! and (user, book) review pairs is enforced by the schema, and every
//! operation runs in its own transaction.
//!
//! [`BookStore`]: book_review_core::BookStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SCHEMA_VERSION;
pub use store::SqliteBookStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
