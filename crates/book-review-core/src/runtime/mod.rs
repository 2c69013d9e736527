// crates/book-review-core/src/runtime/mod.rs
// ============================================================================
// Module: Book Review Runtime
// Description: Review service and in-memory backends.
// Purpose: Execute every user-facing operation against injected backends.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the review service and the in-memory backends
//! used by tests and local runs. Every outer surface (HTTP handlers, the CLI)
//! calls into the same service so validation and invariants live in one place.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod service;
pub mod sessions;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use service::BookReviewService;
pub use service::ConflictKind;
pub use service::RequestContext;
pub use service::ServiceError;
pub use service::SessionGrant;
pub use sessions::InMemorySessionStore;
pub use sessions::SessionLimits;
pub use sessions::generate_session_token;
pub use store::InMemoryBookStore;
