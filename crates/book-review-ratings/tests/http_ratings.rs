// crates/book-review-ratings/tests/http_ratings.rs
// ============================================================================
// Module: HTTP Rating Source Tests
// Description: Exercise rating lookups against local HTTP servers.
// Purpose: Verify query shape, status handling, size limits, and timeouts.
// ============================================================================

//! ## Overview
//! Each test starts a single-shot local server and points the rating source
//! at it with cleartext HTTP enabled. Every failure mode must surface as an
//! error, never as a zero rating.

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

use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use book_review_core::Isbn;
use book_review_core::RatingError;
use book_review_core::RatingSource;
use book_review_ratings::HttpRatingConfig;
use book_review_ratings::HttpRatingSource;
use proptest::prelude::*;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Creates a source pointed at a local endpoint.
fn local_source(endpoint: &str, timeout_ms: u64, max_response_bytes: usize) -> HttpRatingSource {
    HttpRatingSource::new(HttpRatingConfig {
        endpoint: endpoint.to_string(),
        api_key: "test-key".to_string(),
        timeout_ms,
        max_response_bytes,
        allow_http: true,
        ..HttpRatingConfig::default()
    })
    .unwrap()
}

/// Serves one response and reports the requested URL.
fn serve_once(
    status: u16,
    body: String,
) -> (String, mpsc::Receiver<String>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let _ = tx.send(request.url().to_string());
            let header = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let response = Response::from_string(body).with_status_code(status).with_header(header);
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}/book/review_counts.json"), rx, handle)
}

// ============================================================================
// SECTION: Success Paths
// ============================================================================

/// Verifies the request carries isbn and key, and numeric strings parse.
#[test]
fn fetch_parses_string_fields_and_sends_query() {
    let body = r#"{"books":[{"isbn":"0547928211","ratings_count":"12500","average_rating":"4.27"}]}"#;
    let (endpoint, rx, handle) = serve_once(200, body.to_string());
    let source = local_source(&endpoint, 2_000, 64 * 1024);

    let rating = source.fetch(&Isbn::new("0547928211")).unwrap();
    handle.join().unwrap();

    assert_eq!(rating.count, 12_500);
    assert_eq!(rating.average, 4.27);
    let url = rx.recv().unwrap();
    assert_eq!(url, "/book/review_counts.json?isbns=0547928211&key=test-key");
}

/// Verifies JSON numbers are accepted as well as numeric strings.
#[test]
fn fetch_accepts_numeric_fields() {
    let body = r#"{"books":[{"ratings_count":42,"average_rating":3.5}]}"#;
    let (endpoint, _rx, handle) = serve_once(200, body.to_string());
    let source = local_source(&endpoint, 2_000, 64 * 1024);

    let rating = source.fetch(&Isbn::new("1")).unwrap();
    handle.join().unwrap();

    assert_eq!(rating.count, 42);
    assert_eq!(rating.average, 3.5);
}

// ============================================================================
// SECTION: Failure Paths
// ============================================================================

/// Verifies non-success statuses are reported with their code.
#[test]
fn non_success_status_is_an_error() {
    let (endpoint, _rx, handle) = serve_once(404, "No books match those ISBNs.".to_string());
    let source = local_source(&endpoint, 2_000, 64 * 1024);

    let result = source.fetch(&Isbn::new("0000000000"));
    handle.join().unwrap();

    assert!(matches!(result, Err(RatingError::Status(404))), "got {result:?}");
}

/// Verifies a body that lacks the expected fields is malformed.
#[test]
fn missing_fields_are_malformed() {
    let (endpoint, _rx, handle) = serve_once(200, r#"{"books":[]}"#.to_string());
    let source = local_source(&endpoint, 2_000, 64 * 1024);

    let result = source.fetch(&Isbn::new("1"));
    handle.join().unwrap();

    assert!(matches!(result, Err(RatingError::Malformed(_))), "got {result:?}");
}

/// Verifies oversized responses fail closed.
#[test]
fn oversized_response_is_rejected() {
    let body = format!(
        r#"{{"books":[{{"ratings_count":1,"average_rating":1.0,"pad":"{}"}}]}}"#,
        "x".repeat(4096)
    );
    let (endpoint, _rx, handle) = serve_once(200, body);
    let source = local_source(&endpoint, 2_000, 1024);

    let result = source.fetch(&Isbn::new("1"));
    handle.join().unwrap();

    match result {
        Err(RatingError::Malformed(message)) => assert!(message.contains("size limit")),
        other => panic!("expected size rejection, got {other:?}"),
    }
}

/// Verifies redirects are surfaced as statuses rather than followed.
#[test]
fn redirects_are_not_followed() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let location = Header::from_bytes(&b"Location"[..], &b"http://127.0.0.1:1/"[..]).unwrap();
            let response = Response::empty(302).with_header(location);
            let _ = request.respond(response);
        }
    });
    let source = local_source(&format!("http://{addr}/ratings"), 2_000, 64 * 1024);

    let result = source.fetch(&Isbn::new("1"));
    handle.join().unwrap();

    assert!(matches!(result, Err(RatingError::Status(302))), "got {result:?}");
}

/// Verifies a stalled server trips the request timeout.
#[test]
fn stalled_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            thread::sleep(Duration::from_millis(1_500));
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}");
        }
    });
    let source = local_source(&format!("http://{addr}/ratings"), 200, 64 * 1024);

    let started = Instant::now();
    let result = source.fetch(&Isbn::new("1"));
    let elapsed = started.elapsed();
    handle.join().unwrap();

    assert!(matches!(result, Err(RatingError::Request(_))), "got {result:?}");
    assert!(elapsed < Duration::from_millis(1_400), "timeout not enforced: {elapsed:?}");
}

/// Verifies an unreachable endpoint is a request error.
#[test]
fn connection_refused_is_a_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let source = local_source(&format!("http://{addr}/ratings"), 500, 64 * 1024);

    let result = source.fetch(&Isbn::new("1"));

    assert!(matches!(result, Err(RatingError::Request(_))), "got {result:?}");
}

// ============================================================================
// SECTION: Payload Properties
// ============================================================================

proptest! {
    /// Arbitrary bodies never panic the parser.
    #[test]
    fn parse_never_panics(body in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = book_review_ratings::parse_rating_payload(&body);
    }

    /// Any parsed average is finite and non-negative.
    #[test]
    fn parsed_average_is_finite(count in any::<u64>(), average in "[-0-9.eE]{1,12}") {
        let body = format!(
            r#"{{"books":[{{"ratings_count":{count},"average_rating":"{average}"}}]}}"#
        );
        if let Ok(rating) = book_review_ratings::parse_rating_payload(body.as_bytes()) {
            prop_assert!(rating.average.is_finite());
            prop_assert!(rating.average >= 0.0);
            prop_assert_eq!(rating.count, count);
        }
    }
}
