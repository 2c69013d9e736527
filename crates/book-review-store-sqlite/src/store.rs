// crates/book-review-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Book Store
// Description: Durable BookStore backed by SQLite.
// Purpose: Persist users, books, and reviews with enforced uniqueness.
// Dependencies: book-review-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`BookStore`] using `SQLite`. The schema version is
//! recorded in `store_meta` and checked on open; an unknown version fails
//! closed. Review inserts run inside an immediate transaction so the
//! duplicate check and the insert cannot interleave with another writer, and
//! `UNIQUE (user_id, isbn)` backs the check at the storage level.
//!
//! `SQLite`'s built-in `lower()` folds ASCII only, so each connection
//! registers a `fold_case` function that lower-cases with Unicode rules.
//! Search matches with `instr` so `%` and `_` in a query are literal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use book_review_core::Book;
use book_review_core::BookStore;
use book_review_core::BookWithReviews;
use book_review_core::BookWithStats;
use book_review_core::Isbn;
use book_review_core::NewReview;
use book_review_core::Rating;
use book_review_core::ReviewEntry;
use book_review_core::ReviewStats;
use book_review_core::StoreError;
use book_review_core::UserId;
use book_review_core::UserRecord;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::ffi;
use rusqlite::functions::FunctionFlags;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Unicode lower-casing SQL function used by search.
const FOLD_CASE_FUNCTION: &str = "fold_case";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` book store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config for `path` with default pragmas.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows violate an invariant.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Uniqueness constraint rejected a write.
    #[error("sqlite store conflict: {0}")]
    Conflict(String),
    /// Referenced row is missing.
    #[error("sqlite store missing row: {0}")]
    NotFound(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Db(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Conflict(message) => Self::Conflict(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
        }
    }
}

/// Maps an engine error to [`SqliteStoreError::Db`].
#[allow(clippy::needless_pass_by_value, reason = "Used directly as a map_err callback.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

/// Returns true when `err` is a unique or primary key violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Returns true when `err` is a foreign key violation.
fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed book store.
#[derive(Clone)]
pub struct SqliteBookStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteBookStore {
    /// Opens an `SQLite`-backed book store, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Acquires the connection lock.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts a user row.
    fn insert_user(&self, username: &str, hash: &str) -> Result<UserId, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        tx.execute("INSERT INTO users (username, hash) VALUES (?1, ?2)", params![username, hash])
            .map_err(|err| {
                if is_unique_violation(&err) {
                    SqliteStoreError::Conflict(format!("username {username} already exists"))
                } else {
                    db_error(err)
                }
            })?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(UserId::new(id))
    }

    /// Loads one user row matching a column value.
    fn load_user(
        &self,
        sql: &str,
        param: &dyn rusqlite::ToSql,
    ) -> Result<Option<UserRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(sql, [param], |row| {
                Ok(UserRecord {
                    id: UserId::new(row.get(0)?),
                    username: row.get(1)?,
                    password_hash: row.get(2)?,
                })
            })
            .optional()
            .map_err(db_error)?;
        drop(guard);
        Ok(row)
    }

    /// Replaces a user's password hash.
    fn store_password_hash(&self, user_id: UserId, hash: &str) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let updated = tx
            .execute("UPDATE users SET hash = ?1 WHERE id = ?2", params![hash, user_id.get()])
            .map_err(db_error)?;
        if updated == 0 {
            return Err(SqliteStoreError::NotFound(format!("user {user_id}")));
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    /// Runs the literal, case-insensitive catalog search.
    fn query_books(&self, query: &str) -> Result<Vec<Book>, SqliteStoreError> {
        let needle = query.to_lowercase();
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(
                "SELECT isbn, title, author, year FROM books WHERE instr(fold_case(isbn), ?1) > 0 \
                 OR instr(fold_case(title), ?1) > 0 OR instr(fold_case(author), ?1) > 0 \
                 ORDER BY rowid",
            )
            .map_err(db_error)?;
        let rows = stmt
            .query_map(params![needle], |row| {
                Ok(Book {
                    isbn: Isbn::new(row.get::<_, String>(0)?),
                    title: row.get(1)?,
                    author: row.get(2)?,
                    year: row.get(3)?,
                })
            })
            .map_err(db_error)?;
        let books = rows.collect::<Result<Vec<_>, _>>().map_err(db_error)?;
        drop(stmt);
        drop(guard);
        Ok(books)
    }

    /// Loads a book with its reviews in one read transaction.
    fn load_book_with_reviews(
        &self,
        isbn: &Isbn,
    ) -> Result<Option<BookWithReviews>, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let Some(book) = select_book(&tx, isbn)? else {
            return Ok(None);
        };
        let raw = {
            let mut stmt = tx
                .prepare(
                    "SELECT r.user_id, u.username, r.review, r.rating FROM reviews r JOIN users u \
                     ON u.id = r.user_id WHERE r.isbn = ?1 ORDER BY r.id",
                )
                .map_err(db_error)?;
            let rows = stmt
                .query_map(params![isbn.as_str()], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(db_error)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_error)?
        };
        tx.commit().map_err(db_error)?;
        drop(guard);
        let reviews = raw
            .into_iter()
            .map(|(user_id, username, text, rating)| {
                Ok(ReviewEntry {
                    user_id: UserId::new(user_id),
                    username,
                    text,
                    rating: parse_stored_rating(rating)?,
                })
            })
            .collect::<Result<Vec<_>, SqliteStoreError>>()?;
        Ok(Some(BookWithReviews {
            book,
            reviews,
        }))
    }

    /// Loads a book with its review count and rating sum.
    fn load_book_stats(&self, isbn: &Isbn) -> Result<Option<BookWithStats>, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let Some(book) = select_book(&tx, isbn)? else {
            return Ok(None);
        };
        let (count, sum): (i64, i64) = tx
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(rating), 0) FROM reviews WHERE isbn = ?1",
                params![isbn.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        let review_count = u64::try_from(count)
            .map_err(|_| SqliteStoreError::Corrupt(format!("negative review count for {isbn}")))?;
        let rating_sum = u64::try_from(sum)
            .map_err(|_| SqliteStoreError::Corrupt(format!("negative rating sum for {isbn}")))?;
        Ok(Some(BookWithStats {
            book,
            stats: ReviewStats {
                review_count,
                rating_sum,
            },
        }))
    }

    /// Checks for an existing review and inserts under one immediate lock.
    fn write_review(&self, review: &NewReview) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx =
            guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db_error)?;
        if select_book(&tx, &review.isbn)?.is_none() {
            return Err(SqliteStoreError::NotFound(format!("book {}", review.isbn)));
        }
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM reviews WHERE user_id = ?1 AND isbn = ?2",
                params![review.user_id.get(), review.isbn.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        if existing.is_some() {
            return Err(SqliteStoreError::Conflict(format!(
                "user {} already reviewed {}",
                review.user_id, review.isbn
            )));
        }
        tx.execute(
            "INSERT INTO reviews (isbn, user_id, review, rating) VALUES (?1, ?2, ?3, ?4)",
            params![
                review.isbn.as_str(),
                review.user_id.get(),
                review.text,
                i64::from(review.rating.get())
            ],
        )
        .map_err(|err| {
            if is_unique_violation(&err) {
                SqliteStoreError::Conflict(format!(
                    "user {} already reviewed {}",
                    review.user_id, review.isbn
                ))
            } else if is_foreign_key_violation(&err) {
                SqliteStoreError::NotFound(format!("user {}", review.user_id))
            } else {
                db_error(err)
            }
        })?;
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    /// Inserts a batch of books in a single transaction.
    fn write_books(&self, books: &[Book]) -> Result<usize, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO books (isbn, title, author, year) VALUES (?1, ?2, ?3, ?4)")
                .map_err(db_error)?;
            for book in books {
                if book.isbn.as_str().is_empty() {
                    return Err(SqliteStoreError::Invalid("empty isbn".to_string()));
                }
                stmt.execute(params![book.isbn.as_str(), book.title, book.author, book.year])
                    .map_err(|err| {
                        if is_unique_violation(&err) {
                            SqliteStoreError::Conflict(format!("duplicate isbn {}", book.isbn))
                        } else {
                            db_error(err)
                        }
                    })?;
            }
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(books.len())
    }
}

impl BookStore for SqliteBookStore {
    fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError> {
        self.insert_user(username, password_hash).map_err(StoreError::from)
    }

    fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.load_user("SELECT id, username, hash FROM users WHERE username = ?1", &username)
            .map_err(StoreError::from)
    }

    fn user_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.load_user("SELECT id, username, hash FROM users WHERE id = ?1", &user_id.get())
            .map_err(StoreError::from)
    }

    fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.store_password_hash(user_id, password_hash).map_err(StoreError::from)
    }

    fn search_books(&self, query: &str) -> Result<Vec<Book>, StoreError> {
        self.query_books(query).map_err(StoreError::from)
    }

    fn book_with_reviews(&self, isbn: &Isbn) -> Result<Option<BookWithReviews>, StoreError> {
        self.load_book_with_reviews(isbn).map_err(StoreError::from)
    }

    fn book_stats(&self, isbn: &Isbn) -> Result<Option<BookWithStats>, StoreError> {
        self.load_book_stats(isbn).map_err(StoreError::from)
    }

    fn insert_review(&self, review: &NewReview) -> Result<(), StoreError> {
        self.write_review(review).map_err(StoreError::from)
    }

    fn insert_books(&self, books: &[Book]) -> Result<usize, StoreError> {
        self.write_books(books).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads a single book row.
fn select_book(
    tx: &rusqlite::Transaction<'_>,
    isbn: &Isbn,
) -> Result<Option<Book>, SqliteStoreError> {
    tx.query_row(
        "SELECT isbn, title, author, year FROM books WHERE isbn = ?1",
        params![isbn.as_str()],
        |row| {
            Ok(Book {
                isbn: Isbn::new(row.get::<_, String>(0)?),
                title: row.get(1)?,
                author: row.get(2)?,
                year: row.get(3)?,
            })
        },
    )
    .optional()
    .map_err(db_error)
}

/// Validates a stored rating against the accepted scale.
fn parse_stored_rating(value: i64) -> Result<Rating, SqliteStoreError> {
    u8::try_from(value)
        .ok()
        .and_then(Rating::new)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("stored rating out of range: {value}")))
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path is empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    register_functions(&connection)?;
    Ok(connection)
}

/// Registers the scalar functions search relies on.
fn register_functions(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .create_scalar_function(
            FOLD_CASE_FUNCTION,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<String>(0)?.to_lowercase()),
        )
        .map_err(db_error)
}

/// Applies `SQLite` pragmas required for durability and integrity.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    hash TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS books (
                    isbn TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    author TEXT NOT NULL,
                    year TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    isbn TEXT NOT NULL REFERENCES books(isbn),
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    review TEXT NOT NULL,
                    rating INTEGER NOT NULL,
                    UNIQUE (user_id, isbn)
                );
                CREATE INDEX IF NOT EXISTS idx_reviews_isbn ON reviews (isbn);",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}
