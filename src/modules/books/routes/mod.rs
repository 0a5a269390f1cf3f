//! HTTP handlers for `/books`.

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookshelf_http::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    merge::merge,
    models::{Book, BookFilter, BookPatch, BookResponse, BooksResponse, MessageResponse},
    repository::BookRepository,
    schema::{normalize_integers, validate, SchemaKind, ValidationResult},
};

pub type SharedRepository = Arc<dyn BookRepository>;

/// Routes relative to the module mount point.
pub fn router(repository: SharedRepository) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book)
                .put(update_book)
                .post(patch_book)
                .delete(delete_book),
        )
        .with_state(repository)
}

async fn list_books(
    State(repository): State<SharedRepository>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<BooksResponse>, AppError> {
    let filter = BookFilter::from_query(&params).map_err(AppError::validation)?;
    let books = repository.find_all(&filter).await?;
    Ok(Json(BooksResponse { books }))
}

async fn get_book(
    State(repository): State<SharedRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = repository.find_one(&isbn).await?;
    Ok(Json(BookResponse { book }))
}

async fn create_book(
    State(repository): State<SharedRepository>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(body) = payload?;
    let book: Book = parse_book(&body, SchemaKind::Full)?;

    let book = repository.create(book).await?;
    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

async fn update_book(
    State(repository): State<SharedRepository>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(body) = payload?;
    let book: Book = parse_book(&body, SchemaKind::Full)?;

    // The path is the key; a payload naming another book would re-key it.
    if book.isbn != isbn {
        return Err(AppError::validation(vec![format!(
            "isbn: must match the isbn in the path '{isbn}', got '{}'",
            book.isbn
        )]));
    }

    let book = repository.update(&isbn, book).await?;
    Ok(Json(BookResponse { book }))
}

async fn patch_book(
    State(repository): State<SharedRepository>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let Json(body) = payload?;
    let patch: BookPatch = parse_book(&body, SchemaKind::Partial)?;

    let existing = repository.find_one(&isbn).await?;
    let merged = merge(&existing, patch);

    let merged_value = serde_json::to_value(&merged).context("failed to serialize merged book")?;
    if let ValidationResult::Invalid(violations) = validate(&merged_value, SchemaKind::Full) {
        tracing::warn!(%isbn, violations = violations.len(), "merged book failed validation");
        return Err(AppError::validation(violations));
    }

    let book = repository.update(&isbn, merged).await?;
    Ok(Json(BookResponse { book }))
}

async fn delete_book(
    State(repository): State<SharedRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    repository.remove(&isbn).await?;
    Ok(Json(MessageResponse {
        message: "Book deleted".to_string(),
    }))
}

/// Validate the `book` member of a request body and deserialize it.
fn parse_book<T: DeserializeOwned>(body: &Value, kind: SchemaKind) -> Result<T, AppError> {
    let Some(book) = body.get("book") else {
        return Err(AppError::validation(vec!["book: is required".to_string()]));
    };

    if let ValidationResult::Invalid(violations) = validate(book, kind) {
        tracing::debug!(?kind, violations = violations.len(), "book payload rejected");
        return Err(AppError::validation(violations));
    }

    let mut book = book.clone();
    normalize_integers(&mut book);
    serde_json::from_value(book).map_err(|e| AppError::bad_request(e.to_string()))
}
