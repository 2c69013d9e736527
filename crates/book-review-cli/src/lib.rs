// crates/book-review-cli/src/lib.rs
// ============================================================================
// Module: Book Review CLI Library
// Description: Shared helpers for the book-review command-line interface.
// Purpose: Provide the catalog loader to the binary and to tests.
// Dependencies: book-review-core, csv
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) handles argument parsing and output;
//! the catalog loader lives here so it can be exercised without a process.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Catalog import from delimited text.
pub mod import;
