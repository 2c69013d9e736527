// crates/book-review-core/src/core/mod.rs
// ============================================================================
// Module: Book Review Core Types
// Description: Canonical catalog, user, and review structures.
// Purpose: Provide stable, serializable types shared by every crate.
// Dependencies: argon2, serde
// ============================================================================

//! ## Overview
//! Core types define books, users, reviews, and the view models returned by
//! the service. These types are the single source of truth for the HTTP and
//! JSON surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod model;
pub mod password;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::Isbn;
pub use identifiers::SessionToken;
pub use identifiers::UserId;
pub use model::Book;
pub use model::BookDetail;
pub use model::BookSummary;
pub use model::BookWithReviews;
pub use model::BookWithStats;
pub use model::ExternalRating;
pub use model::HomeView;
pub use model::NewReview;
pub use model::Rating;
pub use model::ReviewEntry;
pub use model::ReviewStats;
pub use model::SearchResults;
pub use model::UserRecord;
pub use password::PasswordError;
pub use password::hash_password;
pub use password::verify_dummy;
pub use password::verify_password;
