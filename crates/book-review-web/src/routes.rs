// crates/book-review-web/src/routes.rs
// ============================================================================
// Module: Routes
// Description: One axum handler per browser action plus the JSON API.
// Purpose: Translate HTTP requests into service calls and responses.
// Dependencies: axum, book-review-core, tokio
// ============================================================================

//! ## Overview
//! Every handler follows the same shape: read the session cookie, move the
//! service call onto the blocking pool, then render the view model or the
//! error. Session-changing actions also emit an `auth` audit record, and
//! every handled request emits a `request` record.
//!
//! Redirects are `303 See Other`. Form bodies that cannot be read render the
//! apology page: `413` above the configured limit, `400` otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Form;
use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::header::SET_COOKIE;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use axum::routing::get;
use book_review_core::BookReviewService;
use book_review_core::HomeView;
use book_review_core::Isbn;
use book_review_core::ServiceError;
use book_review_core::SessionToken;
use book_review_core::UserId;
use serde::Deserialize;

use crate::audit::AuditSink;
use crate::audit::AuthAction;
use crate::audit::AuthAuditEvent;
use crate::audit::RequestAuditEvent;
use crate::audit::StoreErrorAuditEvent;
use crate::error::api_error;
use crate::error::form_error;
use crate::error::page_error;
use crate::session::CookieSettings;
use crate::views;

// ============================================================================
// SECTION: Route Patterns
// ============================================================================

/// Landing page.
const ROUTE_INDEX: &str = "/";
/// Registration form and submission.
const ROUTE_REGISTER: &str = "/register";
/// Login form and submission.
const ROUTE_LOGIN: &str = "/login";
/// Session teardown.
const ROUTE_LOGOUT: &str = "/logout";
/// Catalog search.
const ROUTE_SEARCH: &str = "/search";
/// Book page and review submission.
const ROUTE_BOOK: &str = "/books/{isbn}";
/// Public JSON summary.
const ROUTE_API: &str = "/api/{isbn}";
/// Password change.
const ROUTE_CHANGE_PASSWORD: &str = "/change_pass";

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Review operations.
    service: BookReviewService,
    /// Session cookie settings.
    cookies: CookieSettings,
    /// Audit sink for auth, request, and failure events.
    audit: Arc<dyn AuditSink>,
}

impl AppState {
    /// Creates handler state.
    #[must_use]
    pub fn new(
        service: BookReviewService,
        cookies: CookieSettings,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            service,
            cookies,
            audit,
        }
    }

    /// Runs a service call on the blocking pool.
    async fn run<T, F>(&self, task: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&BookReviewService) -> Result<T, ServiceError> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || task(&service))
            .await
            .map_err(|err| ServiceError::Store(format!("blocking task join failed: {err}")))?
    }

    /// Renders a browser error, auditing backend failures.
    fn page_error(&self, route: &'static str, error: &ServiceError) -> Response {
        self.audit_store_error(route, error);
        page_error(error)
    }

    /// Records backend failures that users only see as a generic error.
    fn audit_store_error(&self, route: &'static str, error: &ServiceError) {
        if let ServiceError::Store(message) = error {
            self.audit.record_store_error(&StoreErrorAuditEvent::new(route, message.clone()));
        }
    }

    /// Records an auth event for a session-changing action.
    fn audit_auth<T>(
        &self,
        action: AuthAction,
        user_id: Option<UserId>,
        result: &Result<T, ServiceError>,
    ) {
        let error_kind = result.as_ref().err().map(ServiceError::kind);
        self.audit.record_auth(&AuthAuditEvent::new(action, user_id, error_kind));
    }

    /// Records the request event and returns the response unchanged.
    fn finish(
        &self,
        method: &str,
        route: &'static str,
        started: Instant,
        response: Response,
    ) -> Response {
        let event = RequestAuditEvent::new(
            method,
            route,
            response.status().as_u16(),
            started.elapsed().as_millis(),
        );
        self.audit.record_request(&event);
        response
    }

    /// Redirects while storing a new session token.
    fn redirect_with_session(
        &self,
        route: &'static str,
        location: &str,
        token: &SessionToken,
    ) -> Response {
        match self.cookies.issue(token) {
            Ok(cookie) => with_cookie(Redirect::to(location).into_response(), cookie),
            Err(err) => self.page_error(route, &ServiceError::Store(err.to_string())),
        }
    }

    /// Adds a cookie-clearing header to `response`.
    fn clearing_session(&self, route: &'static str, response: Response) -> Response {
        match self.cookies.clear() {
            Ok(cookie) => with_cookie(response, cookie),
            Err(err) => self.page_error(route, &ServiceError::Store(err.to_string())),
        }
    }
}

/// Appends a `Set-Cookie` header.
fn with_cookie(mut response: Response, cookie: HeaderValue) -> Response {
    response.headers_mut().append(SET_COOKIE, cookie);
    response
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the application router.
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(ROUTE_INDEX, get(index))
        .route(ROUTE_REGISTER, get(register_form).post(register_submit))
        .route(ROUTE_LOGIN, get(login_form).post(login_submit))
        .route(ROUTE_LOGOUT, get(logout))
        .route(ROUTE_SEARCH, get(search_form).post(search_submit))
        .route(ROUTE_BOOK, get(book_page).post(book_review_submit))
        .route(ROUTE_API, get(book_api))
        .route(ROUTE_CHANGE_PASSWORD, get(change_password_form).post(change_password_submit))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

// ============================================================================
// SECTION: Forms
// ============================================================================

/// Registration form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegisterForm {
    /// Requested username.
    username: String,
    /// Chosen password.
    password: String,
    /// Password repeated.
    confirmation: String,
}

/// Login form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginForm {
    /// Account username.
    username: String,
    /// Account password.
    password: String,
}

/// Search form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchForm {
    /// Free-text query over isbn, title, and author.
    #[serde(rename = "book-search")]
    query: String,
}

/// Review form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReviewForm {
    /// Review text.
    #[serde(rename = "book-review")]
    text: String,
    /// Rating as submitted.
    #[serde(rename = "book-rating")]
    rating: Option<String>,
}

/// Password change form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChangePasswordForm {
    /// Current password.
    password: String,
    /// Replacement password.
    new_password: String,
    /// Replacement repeated.
    confirmation: String,
}

// ============================================================================
// SECTION: Session Handlers
// ============================================================================

/// Shows the search page to a signed-in user.
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let response = home_page(&state, ROUTE_INDEX, &headers, views::search_page).await;
    state.finish("GET", ROUTE_INDEX, started, response)
}

/// Shows the registration form.
async fn register_form(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let response = Html(views::register_page()).into_response();
    state.finish("GET", ROUTE_REGISTER, started, response)
}

/// Registers an account and signs it in.
async fn register_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return state.finish("POST", ROUTE_REGISTER, started, form_error(&rejection));
        }
    };
    let token = state.cookies.read_token(&headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service.register(&ctx, &form.username, &form.password, &form.confirmation)
        })
        .await;
    state.audit_auth(
        AuthAction::Register,
        result.as_ref().ok().map(|grant| grant.user_id),
        &result,
    );
    let response = match result {
        Ok(grant) => state.redirect_with_session(ROUTE_REGISTER, ROUTE_INDEX, &grant.token),
        Err(err) => state.page_error(ROUTE_REGISTER, &err),
    };
    state.finish("POST", ROUTE_REGISTER, started, response)
}

/// Shows the login form, ending any session the caller still holds.
async fn login_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let response = match state.cookies.read_token(&headers) {
        None => Html(views::login_page()).into_response(),
        Some(token) => {
            let result = state
                .run(move |service| {
                    let ctx = service.resolve_context(Some(token))?;
                    service.logout(&ctx)
                })
                .await;
            match result {
                Ok(()) => state
                    .clearing_session(ROUTE_LOGIN, Html(views::login_page()).into_response()),
                Err(err) => state.page_error(ROUTE_LOGIN, &err),
            }
        }
    };
    state.finish("GET", ROUTE_LOGIN, started, response)
}

/// Verifies credentials and issues a fresh session.
async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return state.finish("POST", ROUTE_LOGIN, started, form_error(&rejection));
        }
    };
    let token = state.cookies.read_token(&headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service.login(&ctx, &form.username, &form.password)
        })
        .await;
    state.audit_auth(AuthAction::Login, result.as_ref().ok().map(|grant| grant.user_id), &result);
    let response = match result {
        Ok(grant) => state.redirect_with_session(ROUTE_LOGIN, ROUTE_SEARCH, &grant.token),
        Err(err) => state.page_error(ROUTE_LOGIN, &err),
    };
    state.finish("POST", ROUTE_LOGIN, started, response)
}

/// Ends the session and returns to the landing page.
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let token = state.cookies.read_token(&headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service.logout(&ctx).map(|()| ctx.user_id)
        })
        .await;
    let user_id = result.as_ref().ok().copied().flatten();
    state.audit_auth(AuthAction::Logout, user_id, &result);
    let response = match result {
        Ok(_) => state.clearing_session(ROUTE_LOGOUT, Redirect::to(ROUTE_INDEX).into_response()),
        Err(err) => state.page_error(ROUTE_LOGOUT, &err),
    };
    state.finish("GET", ROUTE_LOGOUT, started, response)
}

/// Shows the password change form.
async fn change_password_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let response =
        home_page(&state, ROUTE_CHANGE_PASSWORD, &headers, views::change_password_page).await;
    state.finish("GET", ROUTE_CHANGE_PASSWORD, started, response)
}

/// Changes the password and forces a fresh login.
async fn change_password_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<ChangePasswordForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return state.finish("POST", ROUTE_CHANGE_PASSWORD, started, form_error(&rejection));
        }
    };
    let token = state.cookies.read_token(&headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service
                .change_password(&ctx, &form.password, &form.new_password, &form.confirmation)
                .map(|()| ctx.user_id)
        })
        .await;
    let user_id = result.as_ref().ok().copied().flatten();
    state.audit_auth(AuthAction::ChangePassword, user_id, &result);
    let response = match result {
        Ok(_) => state
            .clearing_session(ROUTE_CHANGE_PASSWORD, Redirect::to(ROUTE_LOGIN).into_response()),
        Err(err) => state.page_error(ROUTE_CHANGE_PASSWORD, &err),
    };
    state.finish("POST", ROUTE_CHANGE_PASSWORD, started, response)
}

// ============================================================================
// SECTION: Catalog Handlers
// ============================================================================

/// Shows the search form.
async fn search_form(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let response = home_page(&state, ROUTE_SEARCH, &headers, views::search_page).await;
    state.finish("GET", ROUTE_SEARCH, started, response)
}

/// Runs a catalog search.
async fn search_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<SearchForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return state.finish("POST", ROUTE_SEARCH, started, form_error(&rejection));
        }
    };
    let token = state.cookies.read_token(&headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service.search(&ctx, &form.query)
        })
        .await;
    let response = match result {
        Ok(view) => Html(views::results_page(&view)).into_response(),
        Err(err) => state.page_error(ROUTE_SEARCH, &err),
    };
    state.finish("POST", ROUTE_SEARCH, started, response)
}

/// Shows a book with its reviews.
async fn book_page(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let token = state.cookies.read_token(&headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service.get_book(&ctx, &Isbn::new(isbn))
        })
        .await;
    let response = match result {
        Ok(view) => Html(views::book_page(&view)).into_response(),
        Err(err) => state.page_error(ROUTE_BOOK, &err),
    };
    state.finish("GET", ROUTE_BOOK, started, response)
}

/// Records a review and shows the refreshed book page.
async fn book_review_submit(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
    headers: HeaderMap,
    form: Result<Form<ReviewForm>, FormRejection>,
) -> Response {
    let started = Instant::now();
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return state.finish("POST", ROUTE_BOOK, started, form_error(&rejection));
        }
    };
    let token = state.cookies.read_token(&headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service.submit_review(&ctx, &Isbn::new(isbn), &form.text, form.rating.as_deref())
        })
        .await;
    let response = match result {
        Ok(view) => Html(views::book_page(&view)).into_response(),
        Err(err) => state.page_error(ROUTE_BOOK, &err),
    };
    state.finish("POST", ROUTE_BOOK, started, response)
}

/// Returns the public JSON summary for a book.
async fn book_api(State(state): State<AppState>, Path(isbn): Path<String>) -> Response {
    let started = Instant::now();
    let result = state.run(move |service| service.get_book_api(&Isbn::new(isbn))).await;
    let response = match result {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => {
            state.audit_store_error(ROUTE_API, &err);
            api_error(&err)
        }
    };
    state.finish("GET", ROUTE_API, started, response)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a page that only needs the signed-in user's name.
async fn home_page(
    state: &AppState,
    route: &'static str,
    headers: &HeaderMap,
    render: fn(&HomeView) -> String,
) -> Response {
    let token = state.cookies.read_token(headers);
    let result = state
        .run(move |service| {
            let ctx = service.resolve_context(token)?;
            service.home(&ctx)
        })
        .await;
    match result {
        Ok(view) => Html(render(&view)).into_response(),
        Err(err) => state.page_error(route, &err),
    }
}
