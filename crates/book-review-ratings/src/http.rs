// crates/book-review-ratings/src/http.rs
// ============================================================================
// Module: HTTP Rating Source
// Description: Bounded GET lookups against the external ratings service.
// Purpose: Provide book rating aggregates without trusting the remote side.
// Dependencies: book-review-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The lookup is `GET {endpoint}?isbns={isbn}&key={api_key}` with a finite
//! timeout, redirects disabled, and a response size cap. The body must be a
//! JSON object whose `books[0]` carries `ratings_count` and `average_rating`,
//! each either a JSON number or a numeric string.
//!
//! There are no retries. A failed lookup costs at most one timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use book_review_core::ExternalRating;
use book_review_core::Isbn;
use book_review_core::RatingError;
use book_review_core::RatingSource;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::redirect::Policy;
use serde_json::Value;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP rating source.
#[derive(Debug, Clone)]
pub struct HttpRatingConfig {
    /// Ratings endpoint URL without query string.
    pub endpoint: String,
    /// API key appended as the `key` query parameter.
    pub api_key: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpRatingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.goodreads.com/book/review_counts.json".to_string(),
            api_key: String::new(),
            timeout_ms: 2_000,
            max_response_bytes: 64 * 1024,
            allow_http: false,
            user_agent: concat!("book-review/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ============================================================================
// SECTION: Rating Source
// ============================================================================

/// Rating source backed by the external ratings HTTP API.
///
/// # Invariants
/// - Redirects are not followed.
/// - Responses exceeding the configured size fail closed.
pub struct HttpRatingSource {
    /// Parsed endpoint URL.
    endpoint: Url,
    /// API key appended to each request.
    api_key: String,
    /// Maximum response size allowed, in bytes.
    max_response_bytes: usize,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpRatingSource {
    /// Creates a rating source from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError::Request`] when the endpoint is invalid or the
    /// client cannot be built.
    pub fn new(config: HttpRatingConfig) -> Result<Self, RatingError> {
        let endpoint = Url::parse(config.endpoint.trim())
            .map_err(|err| RatingError::Request(format!("invalid ratings endpoint: {err}")))?;
        match endpoint.scheme() {
            "https" => {}
            "http" if config.allow_http => {}
            other => {
                return Err(RatingError::Request(format!(
                    "ratings endpoint scheme not allowed: {other}"
                )));
            }
        }
        let client = build_http_client(&config)?;
        Ok(Self {
            endpoint,
            api_key: config.api_key,
            max_response_bytes: config.max_response_bytes,
            client,
        })
    }

    /// Builds the lookup URL for one isbn.
    fn lookup_url(&self, isbn: &Isbn) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("isbns", isbn.as_str()).append_pair("key", &self.api_key);
        url
    }
}

impl RatingSource for HttpRatingSource {
    fn fetch(&self, isbn: &Isbn) -> Result<ExternalRating, RatingError> {
        let url = self.lookup_url(isbn);
        let mut response = self.client.get(url).send().map_err(|err| {
            RatingError::Request(if err.is_timeout() {
                "ratings request timed out".to_string()
            } else {
                "ratings request failed".to_string()
            })
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(RatingError::Status(status.as_u16()));
        }
        let body = read_response_limited(&mut response, self.max_response_bytes)?;
        parse_rating_payload(&body)
    }
}

// ============================================================================
// SECTION: Payload Parsing
// ============================================================================

/// Parses a ratings response body into a normalized aggregate.
///
/// # Errors
///
/// Returns [`RatingError::Malformed`] when the body is not JSON or lacks the
/// expected fields.
pub fn parse_rating_payload(body: &[u8]) -> Result<ExternalRating, RatingError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| RatingError::Malformed("response is not json".to_string()))?;
    let book = value
        .get("books")
        .and_then(Value::as_array)
        .and_then(|books| books.first())
        .ok_or_else(|| RatingError::Malformed("missing books[0]".to_string()))?;
    let count = book
        .get("ratings_count")
        .and_then(count_value)
        .ok_or_else(|| RatingError::Malformed("invalid ratings_count".to_string()))?;
    let average = book
        .get("average_rating")
        .and_then(average_value)
        .ok_or_else(|| RatingError::Malformed("invalid average_rating".to_string()))?;
    Ok(ExternalRating {
        count,
        average,
    })
}

/// Reads a non-negative integer from a number or numeric string.
fn count_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a finite, non-negative float from a number or numeric string.
fn average_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed >= 0.0).then_some(parsed)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the blocking HTTP client with timeout and no redirects.
fn build_http_client(config: &HttpRatingConfig) -> Result<Client, RatingError> {
    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none())
        .build()
        .map_err(|_| RatingError::Request("http client build failed".to_string()))
}

/// Reads a response body while enforcing a maximum size.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, RatingError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| RatingError::Malformed("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(RatingError::Malformed("ratings response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle
        .read_to_end(&mut buf)
        .map_err(|_| RatingError::Request("failed to read ratings response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(RatingError::Malformed("ratings response exceeds size limit".to_string()));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
