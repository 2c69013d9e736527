// crates/book-review-core/src/core/model.rs
// ============================================================================
// Module: Book Review Model
// Description: Catalog rows, user records, reviews, and service view models.
// Purpose: Define the data exchanged between storage, service, and HTTP layers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Rows mirror the three persisted tables (`users`, `books`, `reviews`).
//! View models ([`BookDetail`], [`SearchResults`], [`HomeView`]) are what the
//! service hands to the presentation layer, and [`BookSummary`] is the exact
//! wire shape of the public JSON endpoint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Isbn;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Catalog entry loaded from the seed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique catalog key.
    pub isbn: Isbn,
    /// Book title.
    pub title: String,
    /// Author name as imported.
    pub author: String,
    /// Edition year, kept as the imported text.
    pub year: String,
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Stored user row.
///
/// # Invariants
/// - `password_hash` is a PHC-formatted argon2 hash, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Generated identifier.
    pub id: UserId,
    /// Unique, non-empty login name.
    pub username: String,
    /// Salted password hash.
    pub password_hash: String,
}

// ============================================================================
// SECTION: Reviews
// ============================================================================

/// Review score on the 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted score.
    pub const MIN: u8 = 1;
    /// Highest accepted score.
    pub const MAX: u8 = 5;

    /// Creates a rating when the value is on the accepted scale.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX { Some(Self(value)) } else { None }
    }

    /// Parses a submitted form value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<u8>().ok().and_then(Self::new)
    }

    /// Returns the numeric score.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Review to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    /// Reviewed book.
    pub isbn: Isbn,
    /// Reviewing user.
    pub user_id: UserId,
    /// Free-text review body.
    pub text: String,
    /// Score given by the reviewer.
    pub rating: Rating,
}

/// Stored review annotated with the reviewer's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    /// Reviewing user.
    pub user_id: UserId,
    /// Reviewer's username.
    pub username: String,
    /// Free-text review body.
    pub text: String,
    /// Score given by the reviewer.
    pub rating: Rating,
}

/// Aggregate review figures for one book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewStats {
    /// Number of reviews.
    pub review_count: u64,
    /// Sum of all ratings.
    pub rating_sum: u64,
}

impl ReviewStats {
    /// Returns the mean rating, or `0.0` when the book has no reviews.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Review counts and rating sums stay far below 2^52."
    )]
    pub fn average(self) -> f64 {
        if self.review_count == 0 {
            return 0.0;
        }
        self.rating_sum as f64 / self.review_count as f64
    }
}

/// Book row plus all of its reviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookWithReviews {
    /// Catalog entry.
    pub book: Book,
    /// Reviews in storage order.
    pub reviews: Vec<ReviewEntry>,
}

/// Book row plus its review aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookWithStats {
    /// Catalog entry.
    pub book: Book,
    /// Review aggregates.
    pub stats: ReviewStats,
}

// ============================================================================
// SECTION: External Ratings
// ============================================================================

/// Normalized third-party rating aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExternalRating {
    /// Number of ratings reported by the service.
    pub count: u64,
    /// Average rating reported by the service.
    pub average: f64,
}

// ============================================================================
// SECTION: View Models
// ============================================================================

/// Landing view for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeView {
    /// Signed-in username.
    pub viewer: String,
}

/// Catalog search outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// Signed-in username.
    pub viewer: String,
    /// Normalized query text.
    pub query: String,
    /// Matching books in storage order.
    pub books: Vec<Book>,
}

/// Book page view model.
///
/// # Invariants
/// - `can_review` is false once the viewer has a review in `reviews`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookDetail {
    /// Signed-in username.
    pub viewer: String,
    /// Catalog entry.
    pub book: Book,
    /// Reviews annotated with usernames.
    pub reviews: Vec<ReviewEntry>,
    /// Whether the review form should be offered.
    pub can_review: bool,
    /// External rating, when the lookup succeeded.
    pub external_rating: Option<ExternalRating>,
}

/// Public JSON summary for `/api/{isbn}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    /// Book title.
    pub title: String,
    /// Author name.
    pub author: String,
    /// Edition year as stored.
    pub year: String,
    /// Catalog key.
    pub isbn: String,
    /// Number of local reviews.
    pub review_count: u64,
    /// Mean local rating; `0.0` without reviews.
    pub average_score: f64,
}

impl From<BookWithStats> for BookSummary {
    fn from(value: BookWithStats) -> Self {
        let average_score = value.stats.average();
        Self {
            title: value.book.title,
            author: value.book.author,
            year: value.book.year,
            isbn: value.book.isbn.as_str().to_string(),
            review_count: value.stats.review_count,
            average_score,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
