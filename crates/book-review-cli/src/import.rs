// crates/book-review-cli/src/import.rs
// ============================================================================
// Module: Catalog Import
// Description: Parse a comma-delimited catalog and load it in one batch.
// Purpose: Populate the books table from an export of the catalog.
// Dependencies: book-review-core, csv
// ============================================================================

//! ## Overview
//! Input is comma-delimited with double-quote quoting. The first row is a
//! header and is skipped. Every remaining record must have exactly four
//! columns: isbn, title, author, and edition year.
//!
//! The run is all-or-nothing. Every row is parsed and checked before the
//! store sees any of them, and the store inserts the batch in a single
//! transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use book_review_core::Book;
use book_review_core::BookStore;
use book_review_core::Isbn;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Columns each catalog record must carry.
pub const CATALOG_COLUMNS: usize = 4;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalog import failures. Nothing is committed when any occurs.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Input file could not be opened or read.
    #[error("catalog io error: {0}")]
    Io(String),
    /// Delimited text could not be parsed.
    #[error("catalog parse error at line {line}: {message}")]
    Parse {
        /// 1-based input line.
        line: u64,
        /// Parser detail.
        message: String,
    },
    /// A record was well-formed text but invalid as a book.
    #[error("catalog row error at line {line}: {message}")]
    Row {
        /// 1-based input line.
        line: u64,
        /// Validation detail.
        message: String,
    },
    /// The store rejected the batch.
    #[error("catalog store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses catalog records from `input`, skipping the header row.
///
/// # Errors
///
/// Returns [`ImportError`] for malformed text, wrong column counts, empty
/// isbns, or an isbn repeated within the input.
pub fn parse_catalog<R: Read>(input: R) -> Result<Vec<Book>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let mut seen = BTreeSet::new();
    let mut books = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| ImportError::Parse {
            line: err.position().map_or(0, csv::Position::line),
            message: err.to_string(),
        })?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.len() != CATALOG_COLUMNS {
            return Err(ImportError::Row {
                line,
                message: format!(
                    "expected {CATALOG_COLUMNS} columns (isbn, title, author, year), found {}",
                    record.len()
                ),
            });
        }
        let field = |index: usize| record.get(index).unwrap_or_default().to_string();
        let isbn = field(0);
        if isbn.trim().is_empty() {
            return Err(ImportError::Row {
                line,
                message: "isbn must not be empty".to_string(),
            });
        }
        if !seen.insert(isbn.clone()) {
            return Err(ImportError::Row {
                line,
                message: format!("duplicate isbn {isbn}"),
            });
        }
        books.push(Book {
            isbn: Isbn::new(isbn),
            title: field(1),
            author: field(2),
            year: field(3),
        });
    }
    Ok(books)
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Parses `input` and inserts every book in one batch.
///
/// Returns the number of books inserted.
///
/// # Errors
///
/// Returns [`ImportError`] when parsing fails or the store rejects the batch,
/// including isbns already present in the table.
pub fn import_catalog<R: Read>(input: R, store: &dyn BookStore) -> Result<usize, ImportError> {
    let books = parse_catalog(input)?;
    store.insert_books(&books).map_err(|err| ImportError::Store(err.to_string()))
}

/// Opens `path` and imports it into `store`.
///
/// # Errors
///
/// Returns [`ImportError::Io`] when the file cannot be opened, otherwise as
/// [`import_catalog`].
pub fn import_catalog_file(path: &Path, store: &dyn BookStore) -> Result<usize, ImportError> {
    let file = File::open(path)
        .map_err(|err| ImportError::Io(format!("{}: {err}", path.display())))?;
    import_catalog(file, store)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions on parsed catalogs."
    )]

    use book_review_core::InMemoryBookStore;

    use super::*;

    const CATALOG: &str = "isbn,title,author,year\n\
        0380795272,Krondor: The Betrayal,Raymond E. Feist,1998\n\
        \"1416949658\",\"The Dark Is Rising\",\"Susan Cooper\",1973\n\
        0441172717,\"Dune, Deluxe\",Frank Herbert,1965\n";

    #[test]
    fn parses_quoted_fields_and_skips_header() {
        let books = parse_catalog(CATALOG.as_bytes()).unwrap();
        assert_eq!(books.len(), 3);
        assert_eq!(books[0].isbn.as_str(), "0380795272");
        assert_eq!(books[1].title, "The Dark Is Rising");
        assert_eq!(books[2].title, "Dune, Deluxe");
        assert_eq!(books[2].year, "1965");
    }

    #[test]
    fn wrong_column_count_reports_line() {
        let input = "isbn,title,author,year\n1,a,b,2000\n2,only three,c\n";
        match parse_catalog(input.as_bytes()) {
            Err(ImportError::Row {
                line,
                message,
            }) => {
                assert_eq!(line, 3);
                assert!(message.contains("expected 4 columns"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn empty_and_duplicate_isbns_are_rejected() {
        let empty = "isbn,title,author,year\n  ,a,b,2000\n";
        assert!(matches!(parse_catalog(empty.as_bytes()), Err(ImportError::Row { .. })));
        let duplicate = "isbn,title,author,year\n1,a,b,2000\n1,c,d,2001\n";
        assert!(matches!(parse_catalog(duplicate.as_bytes()), Err(ImportError::Row { .. })));
    }

    #[test]
    fn header_only_input_imports_nothing() {
        let store = InMemoryBookStore::new();
        assert_eq!(import_catalog("isbn,title,author,year\n".as_bytes(), &store).unwrap(), 0);
    }

    #[test]
    fn import_is_all_or_nothing_against_existing_rows() {
        let store = InMemoryBookStore::new();
        assert_eq!(import_catalog(CATALOG.as_bytes(), &store).unwrap(), 3);
        let overlap = "isbn,title,author,year\n9999999999,New,Someone,2020\n0380795272,Again,X,1\n";
        assert!(matches!(import_catalog(overlap.as_bytes(), &store), Err(ImportError::Store(_))));
        assert!(store.search_books("9999999999").unwrap().is_empty());
    }
}
