pub mod merge;
pub mod models;
pub mod repository;
pub mod routes;
pub mod schema;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::DbPool;
use bookshelf_kernel::{InitCtx, Migration, Module};
use serde_json::{json, Value};

use repository::{BookRepository, SqlBookRepository};

/// Book catalog keyed by ISBN
pub struct BooksModule {
    repository: Arc<dyn BookRepository>,
}

impl BooksModule {
    pub fn new(repository: impl BookRepository + 'static) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Schema owned by this module, oldest first
    pub fn migration_set() -> Vec<Migration> {
        vec![Migration {
            id: "001_create_books",
            up: r#"
                CREATE TABLE books (
                    isbn       TEXT PRIMARY KEY NOT NULL,
                    amazon_url TEXT NOT NULL,
                    author     TEXT NOT NULL,
                    language   TEXT NOT NULL,
                    pages      INTEGER NOT NULL CHECK (pages > 0),
                    publisher  TEXT NOT NULL,
                    title      TEXT NOT NULL,
                    year       INTEGER NOT NULL
                );
                CREATE INDEX books_author ON books (author);
                "#,
        }]
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.repository.clone())
    }

    fn openapi(&self) -> Option<Value> {
        Some(openapi_fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        Self::migration_set()
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module backed by the `books` table in `pool`
pub fn create_module(pool: DbPool) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(SqlBookRepository::new(pool)))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookResponse" }
            }
        }
    })
}

fn book_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": { "book": { "$ref": format!("#/components/schemas/{schema}") } },
                    "required": ["book"]
                }
            }
        }
    })
}

fn openapi_fragment() -> Value {
    let isbn_param = json!({
        "name": "isbn",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    });

    let book_properties = json!({
        "isbn": { "type": "string", "minLength": 1 },
        "amazon_url": { "type": "string", "format": "uri" },
        "author": { "type": "string", "minLength": 1 },
        "language": { "type": "string", "minLength": 1 },
        "pages": { "type": "integer", "minimum": 1 },
        "publisher": { "type": "string", "minLength": 1 },
        "title": { "type": "string", "minLength": 1 },
        "year": { "type": "integer" }
    });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books, optionally filtered by field equality",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "Matching books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "books": {
                                                "type": "array",
                                                "items": { "$ref": "#/components/schemas/Book" }
                                            }
                                        }
                                    }
                                }
                            }
                        },
                        "400": error_response("Unknown or malformed filter")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_body("Book"),
                    "responses": {
                        "201": book_response("Created book"),
                        "400": error_response("Schema violation"),
                        "409": error_response("ISBN already exists")
                    }
                }
            },
            "/{isbn}": {
                "get": {
                    "summary": "Get a book by ISBN",
                    "tags": ["Books"],
                    "parameters": [isbn_param.clone()],
                    "responses": {
                        "200": book_response("The book"),
                        "404": error_response("No such book")
                    }
                },
                "put": {
                    "summary": "Replace every field of a book",
                    "tags": ["Books"],
                    "parameters": [isbn_param.clone()],
                    "requestBody": book_body("Book"),
                    "responses": {
                        "200": book_response("Updated book"),
                        "400": error_response("Schema violation"),
                        "404": error_response("No such book")
                    }
                },
                "post": {
                    "summary": "Merge the supplied fields into a book",
                    "tags": ["Books"],
                    "parameters": [isbn_param.clone()],
                    "requestBody": book_body("BookPatch"),
                    "responses": {
                        "200": book_response("Merged book"),
                        "400": error_response("Schema violation"),
                        "404": error_response("No such book")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [isbn_param],
                    "responses": {
                        "200": {
                            "description": "Book deleted",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": { "message": { "type": "string" } }
                                    }
                                }
                            }
                        },
                        "404": error_response("No such book")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": book_properties.clone(),
                    "required": [
                        "isbn", "amazon_url", "author", "language",
                        "pages", "publisher", "title", "year"
                    ],
                    "additionalProperties": false
                },
                "BookPatch": {
                    "type": "object",
                    "properties": book_properties,
                    "additionalProperties": false
                },
                "BookResponse": {
                    "type": "object",
                    "properties": { "book": { "$ref": "#/components/schemas/Book" } }
                }
            }
        }
    })
}
