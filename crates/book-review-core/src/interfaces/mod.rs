// crates/book-review-core/src/interfaces/mod.rs
// ============================================================================
// Module: Book Review Interfaces
// Description: Backend-agnostic interfaces for storage, sessions, and ratings.
// Purpose: Define the contract surfaces used by the review service.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the review service integrates with its backends
//! without embedding backend-specific details. Implementations must fail
//! closed: a read that cannot be completed is an error, never an empty result.
//!
//! All interfaces are synchronous. Async callers move work onto a blocking
//! pool before calling them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::Book;
use crate::core::BookWithReviews;
use crate::core::BookWithStats;
use crate::core::ExternalRating;
use crate::core::Isbn;
use crate::core::NewReview;
use crate::core::SessionToken;
use crate::core::UserId;
use crate::core::UserRecord;

// ============================================================================
// SECTION: Book Store
// ============================================================================

/// Book store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("book store io error: {0}")]
    Io(String),
    /// Database engine reported an error.
    #[error("book store db error: {0}")]
    Db(String),
    /// Stored data is corrupted or fails integrity checks.
    #[error("book store corruption: {0}")]
    Corrupt(String),
    /// Stored schema version is incompatible.
    #[error("book store version mismatch: {0}")]
    VersionMismatch(String),
    /// Caller supplied invalid data.
    #[error("book store invalid data: {0}")]
    Invalid(String),
    /// A uniqueness constraint rejected the write.
    #[error("book store conflict: {0}")]
    Conflict(String),
    /// A referenced row does not exist.
    #[error("book store missing row: {0}")]
    NotFound(String),
}

/// Persistence for users, books, and reviews.
pub trait BookStore: Send + Sync {
    /// Inserts a user and returns its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the username is taken.
    fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError>;

    /// Looks up a user by exact username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Looks up a user by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn user_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Replaces the password hash of an existing user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the user does not exist.
    fn update_password_hash(&self, user_id: UserId, password_hash: &str)
    -> Result<(), StoreError>;

    /// Returns books whose isbn, title, or author contains `query` once both
    /// are lower-cased with Unicode rules. The query is matched literally.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn search_books(&self, query: &str) -> Result<Vec<Book>, StoreError>;

    /// Loads a book and all of its reviews.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn book_with_reviews(&self, isbn: &Isbn) -> Result<Option<BookWithReviews>, StoreError>;

    /// Loads a book and its review aggregates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn book_stats(&self, isbn: &Isbn) -> Result<Option<BookWithStats>, StoreError>;

    /// Inserts a review, enforcing one review per user and book.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the user already reviewed the
    /// book and [`StoreError::NotFound`] when the book or user is missing.
    fn insert_review(&self, review: &NewReview) -> Result<(), StoreError>;

    /// Inserts a batch of books atomically and returns the number inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any row is rejected; nothing is written.
    fn insert_books(&self, books: &[Book]) -> Result<usize, StoreError>;
}

// ============================================================================
// SECTION: Session Store
// ============================================================================

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session backend reported an error.
    #[error("session store error: {0}")]
    Store(String),
}

/// Server-side session registry keyed by opaque tokens.
pub trait SessionStore: Send + Sync {
    /// Creates a session bound to `user_id` and returns its token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the session cannot be recorded.
    fn create(&self, user_id: UserId) -> Result<SessionToken, SessionError>;

    /// Resolves a token to its bound user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    fn resolve(&self, token: &SessionToken) -> Result<Option<UserId>, SessionError>;

    /// Destroys a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    fn destroy(&self, token: &SessionToken) -> Result<(), SessionError>;

    /// Destroys every session bound to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the backend fails.
    fn destroy_user(&self, user_id: UserId) -> Result<(), SessionError>;
}

// ============================================================================
// SECTION: Rating Source
// ============================================================================

/// External rating lookup errors.
#[derive(Debug, Error)]
pub enum RatingError {
    /// Request could not be sent or completed.
    #[error("rating request failed: {0}")]
    Request(String),
    /// Service answered with a non-success status.
    #[error("rating service returned status {0}")]
    Status(u16),
    /// Response body was oversized or did not carry the expected fields.
    #[error("rating response malformed: {0}")]
    Malformed(String),
    /// Lookups are switched off.
    #[error("rating lookups are disabled")]
    Disabled,
}

/// Third-party rating aggregate lookup.
pub trait RatingSource: Send + Sync {
    /// Fetches the external rating for a book.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] for any failure; callers treat every error as
    /// "no rating available".
    fn fetch(&self, isbn: &Isbn) -> Result<ExternalRating, RatingError>;
}

/// Rating source used when lookups are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRatings;

impl RatingSource for DisabledRatings {
    fn fetch(&self, _isbn: &Isbn) -> Result<ExternalRating, RatingError> {
        Err(RatingError::Disabled)
    }
}
