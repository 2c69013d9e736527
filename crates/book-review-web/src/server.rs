// crates/book-review-web/src/server.rs
// ============================================================================
// Module: Web Server
// Description: Build backends from configuration and serve HTTP.
// Purpose: Wire config, storage, ratings, sessions, and audit into axum.
// Dependencies: axum, book-review-config, book-review-ratings, tokio
// ============================================================================

//! ## Overview
//! [`BookReviewServer::from_config`] performs every fallible startup step up
//! front: validation, opening the database, and building the ratings client.
//! A server that constructs successfully only fails later on bind or
//! transport errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use book_review_config::BookReviewConfig;
use book_review_config::RatingsConfig;
use book_review_config::ServerAuditConfig;
use book_review_core::BookReviewService;
use book_review_core::DisabledRatings;
use book_review_core::InMemorySessionStore;
use book_review_core::RatingSource;
use book_review_ratings::HttpRatingConfig;
use book_review_ratings::HttpRatingSource;
use book_review_store_sqlite::SqliteBookStore;
use tokio::net::TcpListener;

use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::routes::AppState;
use crate::routes::app;
use crate::session::CookieSettings;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Book review HTTP server.
pub struct BookReviewServer {
    /// Validated configuration.
    config: BookReviewConfig,
    /// Handler state built from configuration.
    state: AppState,
}

impl BookReviewServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation or backend setup fails.
    pub fn from_config(config: BookReviewConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store_config =
            config.database.store_config().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = SqliteBookStore::new(&store_config)
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let ratings = build_rating_source(&config.ratings)?;
        let audit = build_audit_sink(&config.server.audit)?;
        let sessions = InMemorySessionStore::with_limits(config.session.limits());
        let service = BookReviewService::new(Arc::new(store), Arc::new(sessions), ratings);
        let state = AppState::new(service, CookieSettings::from_config(&config.session), audit);
        emit_startup_warnings(&config);
        Ok(Self {
            config,
            state,
        })
    }

    /// Serves requests on the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr: SocketAddr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_listener(listener).await
    }

    /// Serves requests on an already-bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        let router = app(self.state, self.config.server.max_body_bytes);
        axum::serve(listener, router)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Builds the rating source; disabled ratings always report "no rating".
fn build_rating_source(config: &RatingsConfig) -> Result<Arc<dyn RatingSource>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(DisabledRatings));
    }
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| ServerError::Config("ratings.api_key must be set".to_string()))?;
    let source = HttpRatingSource::new(HttpRatingConfig {
        endpoint: config.endpoint.clone(),
        api_key,
        timeout_ms: config.timeout_ms,
        max_response_bytes: config.max_response_bytes,
        allow_http: config.allow_http,
        ..HttpRatingConfig::default()
    })
    .map_err(|err| ServerError::Init(err.to_string()))?;
    Ok(Arc::new(source))
}

/// Builds the audit sink from configuration.
fn build_audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn AuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(Path::new(path))
                .map_err(|err| ServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Warns about configurations that are valid but risky.
#[allow(clippy::print_stderr, reason = "Startup warnings go to stderr before audit is live.")]
fn emit_startup_warnings(config: &BookReviewConfig) {
    if !config.ratings.enabled {
        eprintln!("book-review: WARNING: external ratings disabled; book pages omit ratings");
    }
    let exposed = config.server.bind_addr().is_ok_and(|addr| !addr.ip().is_loopback());
    if exposed && !config.session.secure_cookie {
        eprintln!(
            "book-review: WARNING: serving on a non-loopback address without session.secure_cookie; \
             session cookies may be sent over cleartext http"
        );
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Web server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
