// crates/book-review-web/tests/http_flows.rs
// ============================================================================
// Module: HTTP Flow Tests
// Description: Drive the router over real sockets with a SQLite store.
// Purpose: Verify redirects, cookies, status codes, and rendered results.
// ============================================================================

//! ## Overview
//! Each test binds the router on `127.0.0.1:0`, seeds a temporary SQLite
//! catalog, and talks to it with a redirect-free HTTP client so every `303`
//! and `Set-Cookie` is observable.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::float_cmp,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;

use book_review_core::Book;
use book_review_core::BookReviewService;
use book_review_core::BookStore;
use book_review_core::ExternalRating;
use book_review_core::InMemorySessionStore;
use book_review_core::Isbn;
use book_review_core::RatingError;
use book_review_core::RatingSource;
use book_review_store_sqlite::SqliteBookStore;
use book_review_store_sqlite::SqliteStoreConfig;
use book_review_web::AppState;
use book_review_web::AuditSink;
use book_review_web::CookieSettings;
use book_review_web::app;
use book_review_web::audit::AuthAuditEvent;
use book_review_web::audit::RequestAuditEvent;
use book_review_web::audit::StoreErrorAuditEvent;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::COOKIE;
use reqwest::header::LOCATION;
use reqwest::header::SET_COOKIE;
use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Isbn of the seeded book that tests review.
const HOBBIT: &str = "0547928211";

/// Cookie name used by the test server.
const COOKIE_NAME: &str = "test_session";

/// Rating source with a fixed answer.
struct FixedRatings;

impl RatingSource for FixedRatings {
    fn fetch(&self, _isbn: &Isbn) -> Result<ExternalRating, RatingError> {
        Ok(ExternalRating {
            count: 12_500,
            average: 4.27,
        })
    }
}

/// Audit sink that keeps serialized events in memory.
#[derive(Default)]
struct MemoryAudit {
    /// Serialized events in arrival order.
    lines: Mutex<Vec<String>>,
}

impl MemoryAudit {
    /// Serializes and stores one event.
    fn push<T: serde::Serialize>(&self, event: &T) {
        self.lines.lock().unwrap().push(serde_json::to_string(event).unwrap());
    }

    /// Parses every stored event.
    fn events(&self) -> Vec<Value> {
        self.lines.lock().unwrap().iter().map(|line| serde_json::from_str(line).unwrap()).collect()
    }
}

impl AuditSink for MemoryAudit {
    fn record_auth(&self, event: &AuthAuditEvent) {
        self.push(event);
    }

    fn record_request(&self, event: &RequestAuditEvent) {
        self.push(event);
    }

    fn record_store_error(&self, event: &StoreErrorAuditEvent) {
        self.push(event);
    }
}

/// Running test server.
struct TestApp {
    /// Base URL without trailing slash.
    base: String,
    /// Redirect-free client.
    client: Client,
    /// Captured audit events.
    audit: Arc<MemoryAudit>,
    /// Keeps the database directory alive.
    _dir: TempDir,
}

impl TestApp {
    /// Starts a server with the default body limit.
    async fn spawn() -> Self {
        Self::spawn_with_limit(64 * 1024).await
    }

    /// Starts a server over a seeded catalog.
    async fn spawn_with_limit(max_body_bytes: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let store = SqliteBookStore::new(&SqliteStoreConfig::for_path(dir.path().join("books.db")))
            .unwrap();
        store
            .insert_books(&[
                book(HOBBIT, "The Hobbit", "J.R.R. Tolkien", "1937"),
                book("0451524934", "1984", "George Orwell", "1949"),
            ])
            .unwrap();
        let service = BookReviewService::new(
            Arc::new(store),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(FixedRatings),
        );
        let audit = Arc::new(MemoryAudit::default());
        let state =
            AppState::new(service, CookieSettings::new(COOKIE_NAME, false), audit.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state, max_body_bytes)).await;
        });
        let client = Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap();
        Self {
            base: format!("http://{addr}"),
            client,
            audit,
            _dir: dir,
        }
    }

    /// Sends a GET with an optional cookie.
    async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(format!("{}{path}", self.base));
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// Sends a form-encoded POST with an optional cookie.
    async fn post(
        &self,
        path: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
    ) -> reqwest::Response {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().copied())
            .finish();
        let mut request = self
            .client
            .post(format!("{}{path}", self.base))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// Registers `username` and returns the session cookie pair.
    async fn register(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/register",
                None,
                &[("username", username), ("password", password), ("confirmation", password)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
        session_cookie(&response).expect("session cookie issued")
    }
}

/// Builds a catalog row.
fn book(isbn: &str, title: &str, author: &str, year: &str) -> Book {
    Book {
        isbn: Isbn::new(isbn),
        title: title.to_string(),
        author: author.to_string(),
        year: year.to_string(),
    }
}

/// Returns the redirect target.
fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Returns the `name=value` pair of the session cookie, if set non-empty.
fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{COOKIE_NAME}=")))
        .filter(|pair| pair.len() > COOKIE_NAME.len() + 1)
        .map(str::to_string)
}

/// Returns the raw `Set-Cookie` header for the session cookie.
fn raw_set_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{COOKIE_NAME}=")))
        .map(str::to_string)
}

// ============================================================================
// SECTION: End-to-End
// ============================================================================

/// Verifies register, search, review, and API summary work end to end.
#[tokio::test]
async fn register_search_review_and_summarize() {
    let app = TestApp::spawn().await;
    let cookie = app.register("alice", "pw1234").await;

    let search = app.post("/search", Some(&cookie), &[("book-search", "hobbit")]).await;
    assert_eq!(search.status(), StatusCode::OK);
    let html = search.text().await.unwrap();
    assert!(html.contains("The Hobbit"));
    assert!(html.contains(&format!("/books/{HOBBIT}")));
    assert!(!html.contains("1984"));
    assert!(html.contains("Signed in as alice"));

    let page = app.get(&format!("/books/{HOBBIT}"), Some(&cookie)).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = page.text().await.unwrap();
    assert!(html.contains("review-form"));
    assert!(html.contains("Goodreads: 12500 ratings, average 4.27"));

    let submitted = app
        .post(
            &format!("/books/{HOBBIT}"),
            Some(&cookie),
            &[("book-review", "A classic."), ("book-rating", "5")],
        )
        .await;
    assert_eq!(submitted.status(), StatusCode::OK);
    let html = submitted.text().await.unwrap();
    assert!(!html.contains("review-form"));
    assert!(html.contains("<strong>alice</strong> rated 5/5: A classic."));

    let reloaded = app.get(&format!("/books/{HOBBIT}"), Some(&cookie)).await;
    let html = reloaded.text().await.unwrap();
    assert!(!html.contains("review-form"));
    assert!(html.contains("A classic."));

    let api = app.get(&format!("/api/{HOBBIT}"), None).await;
    assert_eq!(api.status(), StatusCode::OK);
    let summary: Value = api.json().await.unwrap();
    assert_eq!(summary["isbn"], HOBBIT);
    assert_eq!(summary["title"], "The Hobbit");
    assert_eq!(summary["author"], "J.R.R. Tolkien");
    assert_eq!(summary["year"], "1937");
    assert_eq!(summary["review_count"], 1);
    assert_eq!(summary["average_score"].as_f64(), Some(5.0));
}

/// Verifies the issued cookie is HttpOnly, Lax, and browser-session scoped.
#[tokio::test]
async fn session_cookie_attributes() {
    let app = TestApp::spawn().await;
    let response = app
        .post(
            "/register",
            None,
            &[("username", "carol"), ("password", "pw"), ("confirmation", "pw")],
        )
        .await;
    let raw = raw_set_cookie(&response).unwrap();
    assert!(raw.contains("HttpOnly"));
    assert!(raw.contains("SameSite=Lax"));
    assert!(raw.contains("Path=/"));
    assert!(!raw.contains("Max-Age"));
    assert!(!raw.contains("Secure"));
}

// ============================================================================
// SECTION: Access Control
// ============================================================================

/// Verifies protected pages redirect to the login page without a session.
#[tokio::test]
async fn protected_pages_redirect_to_login() {
    let app = TestApp::spawn().await;
    let book_path = format!("/books/{HOBBIT}");
    for path in ["/", "/search", "/change_pass", book_path.as_str()] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "path {path}");
        assert_eq!(location(&response), "/login", "path {path}");
    }
    let stale = format!("{COOKIE_NAME}=not-a-live-token");
    let response = app.post("/search", Some(&stale), &[("book-search", "hobbit")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

/// Verifies the JSON API is public.
#[tokio::test]
async fn api_is_public_and_reports_zero_average() {
    let app = TestApp::spawn().await;
    let response = app.get("/api/0451524934", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let summary: Value = response.json().await.unwrap();
    assert_eq!(summary["review_count"], 0);
    assert_eq!(summary["average_score"].as_f64(), Some(0.0));
}

/// Verifies an unknown isbn on the API is a JSON 404.
#[tokio::test]
async fn api_unknown_isbn_is_json_not_found() {
    let app = TestApp::spawn().await;
    let response = app.get("/api/9999999999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"error": "found nothing"}));
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

/// Verifies duplicate usernames render a 400 apology.
#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = TestApp::spawn().await;
    app.register("alice", "pw1234").await;
    let response = app
        .post(
            "/register",
            None,
            &[("username", "alice"), ("password", "other"), ("confirmation", "other")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(session_cookie(&response).is_none());
    let html = response.text().await.unwrap();
    assert!(html.contains("username already exists"));
}

/// Verifies registration validation messages.
#[tokio::test]
async fn registration_validation_messages() {
    let app = TestApp::spawn().await;
    let cases: [(&[(&str, &str)], &str); 3] = [
        (&[("password", "pw"), ("confirmation", "pw")], "must provide username"),
        (&[("username", "u"), ("confirmation", "pw")], "must provide password"),
        (
            &[("username", "u"), ("password", "pw"), ("confirmation", "px")],
            "confirmation and password mismatch",
        ),
    ];
    for (fields, message) in cases {
        let response = app.post("/register", None, fields).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.text().await.unwrap().contains(message), "expected {message}");
    }
}

/// Verifies wrong password and unknown user fail identically.
#[tokio::test]
async fn login_failures_are_uniform() {
    let app = TestApp::spawn().await;
    app.register("alice", "pw1234").await;
    let wrong = app.post("/login", None, &[("username", "alice"), ("password", "nope")]).await;
    let unknown = app.post("/login", None, &[("username", "mallory"), ("password", "nope")]).await;
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
    assert_eq!(unknown.status(), StatusCode::FORBIDDEN);
    let wrong = wrong.text().await.unwrap();
    let unknown = unknown.text().await.unwrap();
    assert_eq!(wrong, unknown);
    assert!(wrong.contains("invalid username and/or password"));
}

/// Verifies login issues a session and redirects to search.
#[tokio::test]
async fn login_redirects_to_search_with_new_session() {
    let app = TestApp::spawn().await;
    let first = app.register("alice", "pw1234").await;
    let response = app
        .post("/login", Some(&first), &[("username", "alice"), ("password", "pw1234")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/search");
    let second = session_cookie(&response).unwrap();
    assert_ne!(first, second);

    let old = app.get("/search", Some(&first)).await;
    assert_eq!(old.status(), StatusCode::SEE_OTHER);
    let new = app.get("/search", Some(&second)).await;
    assert_eq!(new.status(), StatusCode::OK);
}

/// Verifies logout clears the cookie and ends the server-side session.
#[tokio::test]
async fn logout_ends_session() {
    let app = TestApp::spawn().await;
    let cookie = app.register("alice", "pw1234").await;
    let response = app.get("/logout", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(raw_set_cookie(&response).unwrap().contains("Max-Age=0"));

    let after = app.get("/search", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&after), "/login");

    let again = app.get("/logout", None).await;
    assert_eq!(again.status(), StatusCode::SEE_OTHER);
}

/// Verifies the password change flow forces a fresh login.
#[tokio::test]
async fn change_password_forces_relogin() {
    let app = TestApp::spawn().await;
    let cookie = app.register("alice", "pw1234").await;

    let wrong = app
        .post(
            "/change_pass",
            Some(&cookie),
            &[("password", "bad"), ("new_password", "next"), ("confirmation", "next")],
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
    assert!(wrong.text().await.unwrap().contains("invalid password"));

    let changed = app
        .post(
            "/change_pass",
            Some(&cookie),
            &[("password", "pw1234"), ("new_password", "next"), ("confirmation", "next")],
        )
        .await;
    assert_eq!(changed.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&changed), "/login");

    let stale = app.get("/change_pass", Some(&cookie)).await;
    assert_eq!(stale.status(), StatusCode::SEE_OTHER);

    let old = app.post("/login", None, &[("username", "alice"), ("password", "pw1234")]).await;
    assert_eq!(old.status(), StatusCode::FORBIDDEN);
    let new = app.post("/login", None, &[("username", "alice"), ("password", "next")]).await;
    assert_eq!(new.status(), StatusCode::SEE_OTHER);
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Verifies empty and unmatched searches render apologies.
#[tokio::test]
async fn search_errors_render_apologies() {
    let app = TestApp::spawn().await;
    let cookie = app.register("alice", "pw1234").await;

    let empty = app.post("/search", Some(&cookie), &[("book-search", "   ")]).await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    assert!(empty.text().await.unwrap().contains("must provide ISBN, title or author of the book"));

    let nothing = app.post("/search", Some(&cookie), &[("book-search", "zzz")]).await;
    assert_eq!(nothing.status(), StatusCode::NOT_FOUND);
    assert!(nothing.text().await.unwrap().contains("found nothing"));
}

/// Verifies a second review is refused and the first is unchanged.
#[tokio::test]
async fn second_review_is_forbidden() {
    let app = TestApp::spawn().await;
    let cookie = app.register("alice", "pw1234").await;
    let path = format!("/books/{HOBBIT}");
    let first =
        app.post(&path, Some(&cookie), &[("book-review", "first"), ("book-rating", "4")]).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second =
        app.post(&path, Some(&cookie), &[("book-review", "second"), ("book-rating", "1")]).await;
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
    assert!(second.text().await.unwrap().contains("you can review a book only once"));

    let summary: Value = app.get(&format!("/api/{HOBBIT}"), None).await.json().await.unwrap();
    assert_eq!(summary["review_count"], 1);
    assert_eq!(summary["average_score"].as_f64(), Some(4.0));
}

/// Verifies invalid ratings and unknown books are rejected.
#[tokio::test]
async fn review_input_is_validated() {
    let app = TestApp::spawn().await;
    let cookie = app.register("alice", "pw1234").await;
    let path = format!("/books/{HOBBIT}");
    for rating in ["", "0", "6", "five"] {
        let response =
            app.post(&path, Some(&cookie), &[("book-review", "x"), ("book-rating", rating)]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "rating {rating:?}");
    }
    let missing = app.post(&path, Some(&cookie), &[("book-review", "x")]).await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = app.get("/books/9999999999", Some(&cookie)).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// SECTION: Limits and Audit
// ============================================================================

/// Verifies oversized bodies are rejected with the apology page.
#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = TestApp::spawn_with_limit(256).await;
    let padding = "x".repeat(1024);
    let response = app
        .post(
            "/register",
            None,
            &[("username", &padding), ("password", "pw"), ("confirmation", "pw")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = response.text().await.unwrap();
    assert!(body.contains("class=\"apology-message\">request body too large</p>"), "{body}");
}

/// Verifies a form posted with the wrong content type renders an apology.
#[tokio::test]
async fn wrong_form_content_type_renders_apology() {
    let app = TestApp::spawn().await;
    let cookie = app.register("alice", "pw1234").await;
    for path in ["/search", "/login", "/register", "/change_pass", "/books/0547928211"] {
        let response = app
            .client
            .post(format!("{}{path}", app.base))
            .header(CONTENT_TYPE, "text/plain")
            .header(COOKIE, cookie.as_str())
            .body("book-search=hobbit")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path {path}");
        let content_type = response.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/html"), "path {path}: {content_type}");
        let body = response.text().await.unwrap();
        assert!(body.contains("malformed form submission"), "path {path}");
    }
}

/// Verifies auth events carry ids and kinds but never credentials.
#[tokio::test]
async fn audit_records_auth_without_credentials() {
    let app = TestApp::spawn().await;
    app.register("alice", "pw1234").await;
    app.post("/login", None, &[("username", "alice"), ("password", "wrong")]).await;

    let events = app.audit.events();
    let auth: Vec<&Value> = events.iter().filter(|event| event["event"] == "auth").collect();
    assert_eq!(auth.len(), 2);
    assert_eq!(auth[0]["action"], "register");
    assert_eq!(auth[0]["outcome"], "success");
    assert!(auth[0]["user_id"].is_i64());
    assert_eq!(auth[1]["action"], "login");
    assert_eq!(auth[1]["outcome"], "failure");
    assert_eq!(auth[1]["error_kind"], "auth");

    let requests = events.iter().filter(|event| event["event"] == "request").count();
    assert_eq!(requests, 2);
    let raw = app.audit.lines.lock().unwrap().join("\n");
    assert!(!raw.contains("alice"));
    assert!(!raw.contains("pw1234"));
}
