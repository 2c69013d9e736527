// crates/book-review-web/src/error.rs
// ============================================================================
// Module: Error Responses
// Description: Map service errors onto HTTP statuses and bodies.
// Purpose: Keep the error-to-response table in one place.
// Dependencies: axum, book-review-core, serde
// ============================================================================

//! ## Overview
//! Browser routes render failures as the apology page; the JSON API answers
//! with `{"error": message}`. A missing session is not an error page: it is a
//! `303 See Other` to `/login`. Backend failures never expose their detail.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use book_review_core::ConflictKind;
use book_review_core::ServiceError;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message shown in place of backend failure details.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Message shown when a form body cannot be decoded.
pub const MALFORMED_FORM_MESSAGE: &str = "malformed form submission";

/// Message shown when a request body exceeds the configured limit.
pub const BODY_TOO_LARGE_MESSAGE: &str = "request body too large";

/// Login page path used for unauthenticated redirects.
pub const LOGIN_PATH: &str = "/login";

// ============================================================================
// SECTION: Status Mapping
// ============================================================================

/// Returns the HTTP status for a service error.
#[must_use]
pub const fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Validation(_) | ServiceError::Conflict(ConflictKind::Username) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Auth(_) | ServiceError::Conflict(ConflictKind::Review) => {
            StatusCode::FORBIDDEN
        }
        ServiceError::Unauthenticated => StatusCode::SEE_OTHER,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Returns the user-visible message for a service error.
#[must_use]
pub fn public_message(error: &ServiceError) -> String {
    match error {
        ServiceError::Store(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Renders a service error for a browser route.
#[must_use]
pub fn page_error(error: &ServiceError) -> Response {
    if matches!(error, ServiceError::Unauthenticated) {
        return Redirect::to(LOGIN_PATH).into_response();
    }
    let status = status_for(error);
    let body = crate::views::apology_page(status.as_u16(), &public_message(error));
    (status, Html(body)).into_response()
}

/// Renders a rejected form body as an apology page.
///
/// Oversized bodies keep their `413`; every other rejection is a validation
/// failure.
#[must_use]
pub fn form_error(rejection: &FormRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let status = StatusCode::PAYLOAD_TOO_LARGE;
        let body = crate::views::apology_page(status.as_u16(), BODY_TOO_LARGE_MESSAGE);
        return (status, Html(body)).into_response();
    }
    page_error(&ServiceError::Validation(MALFORMED_FORM_MESSAGE.to_string()))
}

/// JSON error body for API routes.
#[derive(Debug, Serialize)]
struct ApiErrorBody {
    /// Error message.
    error: String,
}

/// Renders a service error for a JSON API route.
#[must_use]
pub fn api_error(error: &ServiceError) -> Response {
    let status = match error {
        ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
        other => status_for(other),
    };
    let body = ApiErrorBody {
        error: public_message(error),
    };
    (status, Json(body)).into_response()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
