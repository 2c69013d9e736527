// crates/book-review-core/src/lib.rs
// ============================================================================
// Module: Book Review Core Library
// Description: Public API surface for the Book Review core.
// Purpose: Expose domain types, storage interfaces, and the review service.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Book Review core holds the request-handling and data-access contract of the
//! application: validation rules, the session lifecycle, the one-review-per-book
//! invariant, and the external rating fallback. It is storage-agnostic and
//! integrates through the [`BookStore`], [`SessionStore`], and [`RatingSource`]
//! interfaces so each deployment (and each test) injects its own backends.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::BookStore;
pub use interfaces::DisabledRatings;
pub use interfaces::RatingError;
pub use interfaces::RatingSource;
pub use interfaces::SessionError;
pub use interfaces::SessionStore;
pub use interfaces::StoreError;
pub use runtime::BookReviewService;
pub use runtime::ConflictKind;
pub use runtime::InMemoryBookStore;
pub use runtime::InMemorySessionStore;
pub use runtime::RequestContext;
pub use runtime::ServiceError;
pub use runtime::SessionGrant;
pub use runtime::SessionLimits;
pub use runtime::generate_session_token;
