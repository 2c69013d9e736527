// crates/book-review-ratings/src/lib.rs
// ============================================================================
// Module: Book Review Ratings Library
// Description: External rating source for book pages.
// Purpose: Fetch and normalize third-party rating aggregates.
// Dependencies: book-review-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! This crate implements [`RatingSource`] over a single GET request to the
//! ratings service. Every failure mode (transport, status, size, shape)
//! surfaces as a [`RatingError`] which callers read as "no rating available".
//!
//! [`RatingSource`]: book_review_core::RatingSource
//! [`RatingError`]: book_review_core::RatingError

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::HttpRatingConfig;
pub use http::HttpRatingSource;
pub use http::parse_rating_payload;
