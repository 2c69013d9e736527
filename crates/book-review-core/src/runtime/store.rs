// crates/book-review-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Book Store
// Description: Simple in-memory book store for tests and local runs.
// Purpose: Provide a deterministic store without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`BookStore`] that
//! mirrors the relational store's constraints: unique usernames, unique
//! isbns, and one review per user and book. Books are kept in insertion order
//! so search results match the storage order a database would return.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Book;
use crate::core::BookWithReviews;
use crate::core::BookWithStats;
use crate::core::Isbn;
use crate::core::NewReview;
use crate::core::ReviewEntry;
use crate::core::ReviewStats;
use crate::core::UserId;
use crate::core::UserRecord;
use crate::interfaces::BookStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Table contents guarded by the store mutex.
#[derive(Debug, Default)]
struct Tables {
    /// Users keyed by identifier.
    users: BTreeMap<UserId, UserRecord>,
    /// Last generated user identifier.
    last_user_id: i64,
    /// Books in insertion order.
    books: Vec<Book>,
    /// Reviews in insertion order.
    reviews: Vec<NewReview>,
}

/// In-memory book store for tests and local runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBookStore {
    /// Tables protected by a mutex.
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryBookStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the table lock.
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables.lock().map_err(|_| StoreError::Io("book store mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: BookStore Implementation
// ============================================================================

impl BookStore for InMemoryBookStore {
    fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, StoreError> {
        let mut guard = self.lock()?;
        if guard.users.values().any(|user| user.username == username) {
            return Err(StoreError::Conflict(format!("username {username} already exists")));
        }
        guard.last_user_id += 1;
        let id = UserId::new(guard.last_user_id);
        guard.users.insert(
            id,
            UserRecord {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(id)
    }

    fn user_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.users.values().find(|user| user.username == username).cloned())
    }

    fn user_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let user = guard
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {user_id}")))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    fn search_books(&self, query: &str) -> Result<Vec<Book>, StoreError> {
        let needle = query.to_lowercase();
        let guard = self.lock()?;
        Ok(guard
            .books
            .iter()
            .filter(|book| {
                book.isbn.as_str().to_lowercase().contains(&needle)
                    || book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    fn book_with_reviews(&self, isbn: &Isbn) -> Result<Option<BookWithReviews>, StoreError> {
        let guard = self.lock()?;
        let Some(book) = guard.books.iter().find(|book| &book.isbn == isbn) else {
            return Ok(None);
        };
        let mut reviews = Vec::new();
        for review in guard.reviews.iter().filter(|review| &review.isbn == isbn) {
            let user = guard.users.get(&review.user_id).ok_or_else(|| {
                StoreError::Corrupt(format!("review references missing user {}", review.user_id))
            })?;
            reviews.push(ReviewEntry {
                user_id: review.user_id,
                username: user.username.clone(),
                text: review.text.clone(),
                rating: review.rating,
            });
        }
        Ok(Some(BookWithReviews {
            book: book.clone(),
            reviews,
        }))
    }

    fn book_stats(&self, isbn: &Isbn) -> Result<Option<BookWithStats>, StoreError> {
        let guard = self.lock()?;
        let Some(book) = guard.books.iter().find(|book| &book.isbn == isbn) else {
            return Ok(None);
        };
        let stats = guard.reviews.iter().filter(|review| &review.isbn == isbn).fold(
            ReviewStats::default(),
            |acc, review| ReviewStats {
                review_count: acc.review_count + 1,
                rating_sum: acc.rating_sum + u64::from(review.rating.get()),
            },
        );
        Ok(Some(BookWithStats {
            book: book.clone(),
            stats,
        }))
    }

    fn insert_review(&self, review: &NewReview) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if !guard.books.iter().any(|book| book.isbn == review.isbn) {
            return Err(StoreError::NotFound(format!("book {}", review.isbn)));
        }
        if !guard.users.contains_key(&review.user_id) {
            return Err(StoreError::NotFound(format!("user {}", review.user_id)));
        }
        if guard
            .reviews
            .iter()
            .any(|existing| existing.isbn == review.isbn && existing.user_id == review.user_id)
        {
            return Err(StoreError::Conflict(format!(
                "user {} already reviewed {}",
                review.user_id, review.isbn
            )));
        }
        guard.reviews.push(review.clone());
        Ok(())
    }

    fn insert_books(&self, books: &[Book]) -> Result<usize, StoreError> {
        let mut guard = self.lock()?;
        let mut seen: BTreeSet<&str> =
            guard.books.iter().map(|book| book.isbn.as_str()).collect();
        for book in books {
            if book.isbn.as_str().is_empty() {
                return Err(StoreError::Invalid("empty isbn".to_string()));
            }
            if !seen.insert(book.isbn.as_str()) {
                return Err(StoreError::Conflict(format!("duplicate isbn {}", book.isbn)));
            }
        }
        drop(seen);
        guard.books.extend_from_slice(books);
        Ok(books.len())
    }
}
