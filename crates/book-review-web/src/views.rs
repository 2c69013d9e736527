// crates/book-review-web/src/views.rs
// ============================================================================
// Module: HTML Views
// Description: Minimal escaped HTML rendering for service view models.
// Purpose: Give browsers enough markup to drive every flow.
// Dependencies: book-review-core
// ============================================================================

//! ## Overview
//! Each page is a plain HTML document built from a view model. Every
//! interpolated value passes through [`escape_html`]; nothing user-supplied
//! reaches the markup unescaped. Form field names are fixed wire names shared
//! with existing clients.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use book_review_core::Book;
use book_review_core::BookDetail;
use book_review_core::HomeView;
use book_review_core::Rating;
use book_review_core::SearchResults;

// ============================================================================
// SECTION: Escaping
// ============================================================================

/// Escapes text for HTML element and attribute contexts.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Rewrites a caption into the meme image service's path alphabet.
///
/// Replacements apply in order, so the `-` doubling happens before spaces
/// become dashes.
#[must_use]
pub fn meme_escape(input: &str) -> String {
    const REPLACEMENTS: [(&str, &str); 8] = [
        ("-", "--"),
        (" ", "-"),
        ("_", "__"),
        ("?", "~q"),
        ("%", "~p"),
        ("#", "~h"),
        ("/", "~s"),
        ("\"", "''"),
    ];
    REPLACEMENTS.iter().fold(input.to_string(), |acc, (old, new)| acc.replace(old, new))
}

/// Percent-encodes a value for use as a single URL path segment.
#[must_use]
pub fn path_segment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Wraps page content in the shared document shell.
fn layout(title: &str, viewer: Option<&str>, body: &str) -> String {
    let nav = viewer.map_or_else(
        || r#"<a href="/register">Register</a> | <a href="/login">Log In</a>"#.to_string(),
        |name| {
            format!(
                "<span>Signed in as {}</span> | <a href=\"/search\">Search</a> | <a \
                 href=\"/change_pass\">Change Password</a> | <a href=\"/logout\">Log Out</a>",
                escape_html(name)
            )
        },
    );
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Book Review: \
         {}</title></head>\n<body>\n<nav>{nav}</nav>\n<main>\n{body}\n</main>\n</body>\n</html>\n",
        escape_html(title)
    )
}

// ============================================================================
// SECTION: Pages
// ============================================================================

/// Login form.
#[must_use]
pub fn login_page() -> String {
    layout(
        "Log In",
        None,
        r#"<form action="/login" method="post">
<input autocomplete="off" autofocus name="username" placeholder="Username" type="text">
<input name="password" placeholder="Password" type="password">
<button type="submit">Log In</button>
</form>"#,
    )
}

/// Registration form.
#[must_use]
pub fn register_page() -> String {
    layout(
        "Register",
        None,
        r#"<form action="/register" method="post">
<input autocomplete="off" autofocus name="username" placeholder="Username" type="text">
<input name="password" placeholder="Password" type="password">
<input name="confirmation" placeholder="Confirm Password" type="password">
<button type="submit">Register</button>
</form>"#,
    )
}

/// Search form for the signed-in user.
#[must_use]
pub fn search_page(view: &HomeView) -> String {
    layout("Search", Some(&view.viewer), &search_form(""))
}

/// Search results list.
#[must_use]
pub fn results_page(view: &SearchResults) -> String {
    let mut body = search_form(&view.query);
    body.push_str("\n<table>\n<tr><th>ISBN</th><th>Title</th><th>Author</th><th>Year</th></tr>\n");
    for book in &view.books {
        let _ = writeln!(
            body,
            "<tr><td><a href=\"/books/{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>",
            path_segment(book.isbn.as_str()),
            escape_html(book.isbn.as_str()),
            escape_html(&book.title),
            escape_html(&book.author),
            escape_html(&book.year)
        );
    }
    body.push_str("</table>");
    layout("Results", Some(&view.viewer), &body)
}

/// Book page with reviews, external rating, and the review form when allowed.
#[must_use]
pub fn book_page(view: &BookDetail) -> String {
    let mut body = book_header(&view.book);
    match view.external_rating {
        Some(rating) => {
            let _ = writeln!(
                body,
                "<p class=\"external-rating\">Goodreads: {} ratings, average {:.2}</p>",
                rating.count, rating.average
            );
        }
        None => body.push_str("<p class=\"external-rating\">No external rating available</p>\n"),
    }
    body.push_str("<h2>Reviews</h2>\n<ul class=\"reviews\">\n");
    for review in &view.reviews {
        let _ = writeln!(
            body,
            "<li><strong>{}</strong> rated {}/{}: {}</li>",
            escape_html(&review.username),
            review.rating.get(),
            Rating::MAX,
            escape_html(&review.text)
        );
    }
    body.push_str("</ul>\n");
    if view.can_review {
        body.push_str(&review_form(&view.book));
    }
    layout(&view.book.title, Some(&view.viewer), &body)
}

/// Password change form.
#[must_use]
pub fn change_password_page(view: &HomeView) -> String {
    layout(
        "Change Password",
        Some(&view.viewer),
        r#"<form action="/change_pass" method="post">
<input name="password" placeholder="Current Password" type="password">
<input name="new_password" placeholder="New Password" type="password">
<input name="confirmation" placeholder="Confirm New Password" type="password">
<button type="submit">Change Password</button>
</form>"#,
    )
}

/// Apology page carrying a status code and message.
#[must_use]
pub fn apology_page(status: u16, message: &str) -> String {
    let caption = path_segment(&meme_escape(message));
    let body = format!(
        "<img alt=\"{status}\" class=\"apology\" \
         src=\"https://api.memegen.link/images/custom/{status}/{}.jpg?background=https://i.imgur.com/CsCgN7Ll.png\" \
         title=\"{status}\">\n<p class=\"apology-message\">{}</p>",
        escape_html(&caption),
        escape_html(message)
    );
    layout("Apology", None, &body)
}

// ============================================================================
// SECTION: Fragments
// ============================================================================

/// Search form prefilled with `query`.
fn search_form(query: &str) -> String {
    format!(
        "<form action=\"/search\" method=\"post\">\n<input autocomplete=\"off\" autofocus \
         name=\"book-search\" placeholder=\"ISBN, title or author\" type=\"text\" \
         value=\"{}\">\n<button type=\"submit\">Search</button>\n</form>",
        escape_html(query)
    )
}

/// Book metadata block.
fn book_header(book: &Book) -> String {
    format!(
        "<h1>{}</h1>\n<p>Author: {}</p>\n<p>Year: {}</p>\n<p>ISBN: {}</p>\n",
        escape_html(&book.title),
        escape_html(&book.author),
        escape_html(&book.year),
        escape_html(book.isbn.as_str())
    )
}

/// Review submission form for `book`.
fn review_form(book: &Book) -> String {
    let mut options = String::new();
    for value in Rating::MIN..=Rating::MAX {
        let _ = write!(options, "<option value=\"{value}\">{value}</option>");
    }
    format!(
        "<form class=\"review-form\" action=\"/books/{}\" method=\"post\">\n<textarea \
         name=\"book-review\" placeholder=\"Your review\"></textarea>\n<select \
         name=\"book-rating\">{options}</select>\n<button type=\"submit\">Submit \
         Review</button>\n</form>\n",
        path_segment(book.isbn.as_str())
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only fixture construction.")]

    use book_review_core::ExternalRating;
    use book_review_core::Isbn;
    use book_review_core::ReviewEntry;
    use book_review_core::UserId;

    use super::*;

    fn detail(can_review: bool) -> BookDetail {
        BookDetail {
            viewer: "alice".to_string(),
            book: Book {
                isbn: Isbn::new("0547928211"),
                title: "The Hobbit <illustrated>".to_string(),
                author: "J.R.R. Tolkien".to_string(),
                year: "1937".to_string(),
            },
            reviews: vec![ReviewEntry {
                user_id: UserId::new(2),
                username: "bob".to_string(),
                text: "<script>alert(1)</script>".to_string(),
                rating: Rating::new(4).unwrap(),
            }],
            can_review,
            external_rating: None,
        }
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn meme_escape_applies_replacements_in_order() {
        assert_eq!(meme_escape("found nothing"), "found-nothing");
        assert_eq!(meme_escape("a-b c"), "a--b-c");
        assert_eq!(meme_escape("x_y?100%#/\""), "x__y~q100~p~h~s''");
    }

    #[test]
    fn path_segment_encodes_reserved_bytes() {
        assert_eq!(path_segment("0547928211"), "0547928211");
        assert_eq!(path_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn book_page_escapes_review_text_and_shows_form() {
        let html = book_page(&detail(true));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("The Hobbit &lt;illustrated&gt;"));
        assert!(html.contains("name=\"book-review\""));
        assert!(html.contains("name=\"book-rating\""));
        assert!(html.contains("No external rating available"));
    }

    #[test]
    fn book_page_hides_form_and_shows_rating() {
        let mut view = detail(false);
        view.external_rating = Some(ExternalRating {
            count: 12_500,
            average: 4.27,
        });
        let html = book_page(&view);
        assert!(!html.contains("review-form"));
        assert!(html.contains("Goodreads: 12500 ratings, average 4.27"));
    }

    #[test]
    fn apology_page_carries_status_and_message() {
        let html = apology_page(404, "found nothing");
        assert!(html.contains("alt=\"404\""));
        assert!(html.contains("/custom/404/found-nothing.jpg"));
        assert!(html.contains("<p class=\"apology-message\">found nothing</p>"));
    }
}
