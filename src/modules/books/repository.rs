use async_trait::async_trait;
use bookshelf_db::DbPool;
use bookshelf_http::error::AppError;
use sqlx::{QueryBuilder, Sqlite};

use super::models::{Book, BookFilter, FilterValue};

const COLUMNS: &str = "isbn, amazon_url, author, language, pages, publisher, title, year";

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error("There is no book with isbn '{0}'")]
    NotFound(String),

    #[error("A book with isbn '{0}' already exists")]
    Conflict(String),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<RepositoryError> for AppError {
    fn from(error: RepositoryError) -> Self {
        let message = error.to_string();
        match error {
            RepositoryError::NotFound(_) => AppError::not_found(message),
            RepositoryError::Conflict(_) => AppError::conflict(message),
            RepositoryError::Database(e) => {
                AppError::Internal(anyhow::Error::new(e).context("book storage failed"))
            }
        }
    }
}

/// Persistent storage for books, keyed by ISBN.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Every book matching all filter conditions, ordered by ISBN
    async fn find_all(&self, filter: &BookFilter) -> Result<Vec<Book>, RepositoryError>;

    async fn find_one(&self, isbn: &str) -> Result<Book, RepositoryError>;

    /// Insert a new book; fails with `Conflict` when the ISBN is taken
    async fn create(&self, book: Book) -> Result<Book, RepositoryError>;

    /// Replace every field except the ISBN of the book stored under `isbn`
    async fn update(&self, isbn: &str, book: Book) -> Result<Book, RepositoryError>;

    async fn remove(&self, isbn: &str) -> Result<(), RepositoryError>;
}

/// `BookRepository` over the `books` table. Every value is bound, never spliced.
#[derive(Clone)]
pub struct SqlBookRepository {
    pool: DbPool,
}

impl SqlBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqlBookRepository {
    async fn find_all(&self, filter: &BookFilter) -> Result<Vec<Book>, RepositoryError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM books"));

        let mut separator = " WHERE ";
        for (column, value) in filter.conditions() {
            query.push(separator).push(*column).push(" = ");
            match value {
                FilterValue::Text(text) => query.push_bind(text.clone()),
                FilterValue::Integer(number) => query.push_bind(*number),
            };
            separator = " AND ";
        }
        query.push(" ORDER BY isbn");

        let books = query
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find_one(&self, isbn: &str) -> Result<Book, RepositoryError> {
        sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE isbn = ?"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(isbn.to_string()))
    }

    async fn create(&self, book: Book) -> Result<Book, RepositoryError> {
        let stored = sqlx::query_as::<_, Book>(&format!(
            "INSERT INTO books ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(book.isbn.clone())
            }
            other => RepositoryError::Database(other),
        })?;

        tracing::info!(isbn = %stored.isbn, "book created");
        Ok(stored)
    }

    async fn update(&self, isbn: &str, book: Book) -> Result<Book, RepositoryError> {
        let stored = sqlx::query_as::<_, Book>(&format!(
            "UPDATE books
             SET amazon_url = ?, author = ?, language = ?, pages = ?,
                 publisher = ?, title = ?, year = ?
             WHERE isbn = ?
             RETURNING {COLUMNS}"
        ))
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(isbn.to_string()))?;

        tracing::info!(isbn = %stored.isbn, "book updated");
        Ok(stored)
    }

    async fn remove(&self, isbn: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(isbn.to_string()));
        }

        tracing::info!(%isbn, "book removed");
        Ok(())
    }
}
