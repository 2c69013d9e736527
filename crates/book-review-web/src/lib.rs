// crates/book-review-web/src/lib.rs
// ============================================================================
// Module: Book Review Web
// Description: HTTP surface for the book review service.
// Purpose: Map browser requests onto service operations and render results.
// Dependencies: axum, book-review-core, book-review-config, tokio
// ============================================================================

//! ## Overview
//! The web crate owns everything HTTP: reading the session cookie into a
//! [`book_review_core::RequestContext`], dispatching each form to the
//! service on the blocking pool, turning service errors into apology pages,
//! and writing structured audit records.
//!
//! Handlers never touch storage directly; every action goes through
//! [`book_review_core::BookReviewService`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod error;
pub mod routes;
pub mod server;
pub mod session;
pub mod views;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use routes::AppState;
pub use routes::app;
pub use server::BookReviewServer;
pub use server::ServerError;
pub use session::CookieSettings;
