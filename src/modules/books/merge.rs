//! Field-level merge for partial updates.

use super::models::{Book, BookPatch};

/// Layer `patch` over `existing`.
///
/// A field is replaced when the patch supplies it at all, including values
/// such as `0` or `""`; only absent fields keep the existing value. The ISBN
/// always comes from `existing`, since the path names the book being changed.
pub fn merge(existing: &Book, patch: BookPatch) -> Book {
    let BookPatch {
        isbn: _,
        amazon_url,
        author,
        language,
        pages,
        publisher,
        title,
        year,
    } = patch;

    Book {
        isbn: existing.isbn.clone(),
        amazon_url: amazon_url.unwrap_or_else(|| existing.amazon_url.clone()),
        author: author.unwrap_or_else(|| existing.author.clone()),
        language: language.unwrap_or_else(|| existing.language.clone()),
        pages: pages.unwrap_or(existing.pages),
        publisher: publisher.unwrap_or_else(|| existing.publisher.clone()),
        title: title.unwrap_or_else(|| existing.title.clone()),
        year: year.unwrap_or(existing.year),
    }
}
