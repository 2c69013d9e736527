// crates/book-review-core/src/runtime/service.rs
// ============================================================================
// Module: Book Review Service
// Description: Validation, session lifecycle, and review rules.
// Purpose: Implement every user-facing operation against injected backends.
// Dependencies: crate::{core, interfaces}, thiserror
// ============================================================================

//! ## Overview
//! [`BookReviewService`] is the single entry point for registration, login,
//! search, book pages, review submission, the JSON summary, and password
//! changes. Each call receives an explicit [`RequestContext`] built from the
//! caller's session token; the service never keeps per-request state.
//!
//! Validation order is part of the contract: the first failing check decides
//! the error the user sees. Credential failures use a single message so a
//! caller cannot tell an unknown username from a wrong password.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::BookDetail;
use crate::core::BookSummary;
use crate::core::ExternalRating;
use crate::core::HomeView;
use crate::core::Isbn;
use crate::core::NewReview;
use crate::core::PasswordError;
use crate::core::Rating;
use crate::core::SearchResults;
use crate::core::SessionToken;
use crate::core::UserId;
use crate::core::UserRecord;
use crate::core::hash_password;
use crate::core::verify_dummy;
use crate::core::verify_password;
use crate::interfaces::BookStore;
use crate::interfaces::RatingSource;
use crate::interfaces::SessionError;
use crate::interfaces::SessionStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Uniform login failure message.
pub const INVALID_CREDENTIALS: &str = "invalid username and/or password";
/// Message for an empty search query.
pub const EMPTY_SEARCH: &str = "must provide ISBN, title or author of the book";
/// Message for lookups that matched nothing.
pub const FOUND_NOTHING: &str = "found nothing";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request session state resolved from the caller's cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Token presented by the caller, if any.
    pub session: Option<SessionToken>,
    /// User bound to the presented token, if it is live.
    pub user_id: Option<UserId>,
}

impl RequestContext {
    /// Context for a caller without a session.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            session: None,
            user_id: None,
        }
    }

    /// Returns the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthenticated`] when no live session exists.
    pub fn require_user(&self) -> Result<UserId, ServiceError> {
        match self.user_id {
            Some(user_id) => Ok(user_id),
            None => Err(ServiceError::Unauthenticated),
        }
    }
}

/// Session established by registration or login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// User bound to the new session.
    pub user_id: UserId,
    /// Token to hand back to the browser.
    pub token: SessionToken,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Which uniqueness rule a write violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Username already registered.
    Username,
    /// User already reviewed the book.
    Review,
}

impl ConflictKind {
    /// Returns the user-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Username => "username already exists",
            Self::Review => "you can review a book only once",
        }
    }
}

/// Service-level failures mapped to user-visible outcomes.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation.
    #[error("{0}")]
    Validation(String),
    /// Credentials did not verify.
    #[error("{0}")]
    Auth(String),
    /// No live session.
    #[error("login required")]
    Unauthenticated,
    /// A uniqueness rule rejected the request.
    #[error("{}", .0.message())]
    Conflict(ConflictKind),
    /// Requested entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Backend failure; details are for logs only.
    #[error("internal store error: {0}")]
    Store(String),
}

impl ServiceError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Auth(_) => "auth",
            Self::Unauthenticated => "unauthenticated",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        Self::Store(err.to_string())
    }
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Book review operations over injected backends.
#[derive(Clone)]
pub struct BookReviewService {
    /// Users, books, and reviews.
    store: Arc<dyn BookStore>,
    /// Live browser sessions.
    sessions: Arc<dyn SessionStore>,
    /// External rating lookups.
    ratings: Arc<dyn RatingSource>,
}

impl BookReviewService {
    /// Creates a service over the given backends.
    #[must_use]
    pub fn new(
        store: Arc<dyn BookStore>,
        sessions: Arc<dyn SessionStore>,
        ratings: Arc<dyn RatingSource>,
    ) -> Self {
        Self {
            store,
            sessions,
            ratings,
        }
    }

    /// Builds a request context from the presented session token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] when the session backend fails.
    pub fn resolve_context(
        &self,
        session: Option<SessionToken>,
    ) -> Result<RequestContext, ServiceError> {
        let Some(token) = session else {
            return Ok(RequestContext::anonymous());
        };
        let user_id = self.sessions.resolve(&token)?;
        Ok(RequestContext {
            session: Some(token),
            user_id,
        })
    }

    /// Returns the landing view for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthenticated`] without a live session.
    pub fn home(&self, ctx: &RequestContext) -> Result<HomeView, ServiceError> {
        let viewer = self.viewer(ctx)?;
        Ok(HomeView {
            viewer: viewer.username,
        })
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    /// Registers a user and signs them in.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for empty or mismatched fields and
    /// [`ServiceError::Conflict`] when the username is taken.
    pub fn register(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<SessionGrant, ServiceError> {
        require(username, "must provide username")?;
        require(password, "must provide password")?;
        require(confirmation, "must provide confirmation")?;
        if password != confirmation {
            return Err(ServiceError::Validation(
                "confirmation and password mismatch".to_string(),
            ));
        }
        if self.store.user_by_username(username)?.is_some() {
            return Err(ServiceError::Conflict(ConflictKind::Username));
        }
        let hash = hash_password(password)?;
        let user_id = match self.store.create_user(username, &hash) {
            Ok(user_id) => user_id,
            Err(StoreError::Conflict(_)) => {
                return Err(ServiceError::Conflict(ConflictKind::Username));
            }
            Err(err) => return Err(err.into()),
        };
        self.end_session(ctx)?;
        let token = self.sessions.create(user_id)?;
        Ok(SessionGrant {
            user_id,
            token,
        })
    }

    /// Verifies credentials and issues a fresh session.
    ///
    /// Any session presented with the request is destroyed first, whether or
    /// not the login succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for empty fields and
    /// [`ServiceError::Auth`] when the credentials do not verify.
    pub fn login(
        &self,
        ctx: &RequestContext,
        username: &str,
        password: &str,
    ) -> Result<SessionGrant, ServiceError> {
        self.end_session(ctx)?;
        require(username, "must provide username")?;
        require(password, "must provide password")?;
        let user = self.store.user_by_username(username)?;
        let verified = match &user {
            Some(user) => verify_password(&user.password_hash, password),
            None => {
                verify_dummy(password);
                false
            }
        };
        let Some(user) = user.filter(|_| verified) else {
            return Err(ServiceError::Auth(INVALID_CREDENTIALS.to_string()));
        };
        let token = self.sessions.create(user.id)?;
        Ok(SessionGrant {
            user_id: user.id,
            token,
        })
    }

    /// Destroys the caller's session. Safe to call without one.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] when the session backend fails.
    pub fn logout(&self, ctx: &RequestContext) -> Result<(), ServiceError> {
        self.end_session(ctx)
    }

    /// Changes the signed-in user's password and ends all of their sessions.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Auth`] when `current` does not verify and
    /// [`ServiceError::Validation`] for empty or mismatched fields.
    pub fn change_password(
        &self,
        ctx: &RequestContext,
        current: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), ServiceError> {
        let user = self.viewer(ctx)?;
        require(current, "must provide current password")?;
        if !verify_password(&user.password_hash, current) {
            return Err(ServiceError::Auth("invalid password".to_string()));
        }
        require(new_password, "must provide new password")?;
        require(confirmation, "must provide confirmation")?;
        if new_password != confirmation {
            return Err(ServiceError::Validation(
                "confirmation and password mismatch".to_string(),
            ));
        }
        let hash = hash_password(new_password)?;
        self.store.update_password_hash(user.id, &hash)?;
        self.sessions.destroy_user(user.id)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------------

    /// Searches the catalog by isbn, title, or author.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] for an empty query and
    /// [`ServiceError::NotFound`] when nothing matches.
    pub fn search(&self, ctx: &RequestContext, query: &str) -> Result<SearchResults, ServiceError> {
        let viewer = self.viewer(ctx)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::Validation(EMPTY_SEARCH.to_string()));
        }
        let books = self.store.search_books(query)?;
        if books.is_empty() {
            return Err(ServiceError::NotFound(FOUND_NOTHING.to_string()));
        }
        Ok(SearchResults {
            viewer: viewer.username,
            query: query.to_string(),
            books,
        })
    }

    /// Loads the book page for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown isbn.
    pub fn get_book(&self, ctx: &RequestContext, isbn: &Isbn) -> Result<BookDetail, ServiceError> {
        let viewer = self.viewer(ctx)?;
        self.detail_for(&viewer, isbn)
    }

    /// Records the signed-in user's review and returns the refreshed page.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown isbn,
    /// [`ServiceError::Conflict`] for a second review, and
    /// [`ServiceError::Validation`] for a missing or out-of-range rating.
    pub fn submit_review(
        &self,
        ctx: &RequestContext,
        isbn: &Isbn,
        text: &str,
        rating: Option<&str>,
    ) -> Result<BookDetail, ServiceError> {
        let viewer = self.viewer(ctx)?;
        let Some(current) = self.store.book_with_reviews(isbn)? else {
            return Err(ServiceError::NotFound(FOUND_NOTHING.to_string()));
        };
        if current.reviews.iter().any(|review| review.user_id == viewer.id) {
            return Err(ServiceError::Conflict(ConflictKind::Review));
        }
        let rating = rating.and_then(Rating::parse).ok_or_else(|| {
            ServiceError::Validation(format!(
                "must provide a rating between {} and {}",
                Rating::MIN,
                Rating::MAX
            ))
        })?;
        let review = NewReview {
            isbn: isbn.clone(),
            user_id: viewer.id,
            text: text.to_string(),
            rating,
        };
        match self.store.insert_review(&review) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => {
                return Err(ServiceError::Conflict(ConflictKind::Review));
            }
            Err(StoreError::NotFound(_)) => {
                return Err(ServiceError::NotFound(FOUND_NOTHING.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
        self.detail_for(&viewer, isbn)
    }

    /// Returns the public JSON summary for a book.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown isbn.
    pub fn get_book_api(&self, isbn: &Isbn) -> Result<BookSummary, ServiceError> {
        self.store
            .book_stats(isbn)?
            .map(BookSummary::from)
            .ok_or_else(|| ServiceError::NotFound(FOUND_NOTHING.to_string()))
    }

    /// Looks up the external rating; every failure reads as "no rating".
    #[must_use]
    pub fn lookup_rating(&self, isbn: &Isbn) -> Option<ExternalRating> {
        self.ratings.fetch(isbn).ok()
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Loads the signed-in user's record.
    fn viewer(&self, ctx: &RequestContext) -> Result<UserRecord, ServiceError> {
        let user_id = ctx.require_user()?;
        self.store.user_by_id(user_id)?.ok_or(ServiceError::Unauthenticated)
    }

    /// Builds the book page for `viewer`.
    fn detail_for(&self, viewer: &UserRecord, isbn: &Isbn) -> Result<BookDetail, ServiceError> {
        let Some(found) = self.store.book_with_reviews(isbn)? else {
            return Err(ServiceError::NotFound(FOUND_NOTHING.to_string()));
        };
        let can_review = !found.reviews.iter().any(|review| review.user_id == viewer.id);
        Ok(BookDetail {
            viewer: viewer.username.clone(),
            book: found.book,
            reviews: found.reviews,
            can_review,
            external_rating: self.lookup_rating(isbn),
        })
    }

    /// Destroys the presented session, if any.
    fn end_session(&self, ctx: &RequestContext) -> Result<(), ServiceError> {
        if let Some(token) = &ctx.session {
            self.sessions.destroy(token)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects an empty form field with `message`.
fn require(value: &str, message: &str) -> Result<(), ServiceError> {
    if value.is_empty() { Err(ServiceError::Validation(message.to_string())) } else { Ok(()) }
}
