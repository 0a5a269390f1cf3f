use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A catalog entry, addressed by ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// International Standard Book Number; the primary key
    pub isbn: String,
    /// Absolute URL of the book's Amazon listing
    pub amazon_url: String,
    pub author: String,
    pub language: String,
    /// Page count, always positive
    pub pages: i64,
    pub publisher: String,
    pub title: String,
    /// Publication year
    pub year: i64,
}

/// Sparse book used by partial updates; `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    /// Type-checked but never applied; the path decides which book changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amazon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub book: Book,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooksResponse {
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Value a list filter compares a column against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

/// Equality filters for listing books, ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    conditions: Vec<(&'static str, FilterValue)>,
}

const TEXT_COLUMNS: &[&str] = &[
    "isbn",
    "amazon_url",
    "author",
    "language",
    "publisher",
    "title",
];
const INTEGER_COLUMNS: &[&str] = &["pages", "year"];

impl BookFilter {
    /// Build a filter from query-string parameters.
    ///
    /// Unknown keys and non-integer values for integer columns are violations.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, Vec<String>> {
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();

        let mut conditions = Vec::new();
        let mut violations = Vec::new();
        for key in keys {
            let value = &params[key];
            if let Some(column) = TEXT_COLUMNS.iter().find(|c| **c == key.as_str()) {
                conditions.push((*column, FilterValue::Text(value.clone())));
            } else if let Some(column) = INTEGER_COLUMNS.iter().find(|c| **c == key.as_str()) {
                match value.parse::<i64>() {
                    Ok(number) => conditions.push((*column, FilterValue::Integer(number))),
                    Err(_) => violations.push(format!("{key}: filter must be an integer")),
                }
            } else {
                violations.push(format!("{key}: is not a filterable field"));
            }
        }

        if violations.is_empty() {
            Ok(Self { conditions })
        } else {
            Err(violations)
        }
    }

    /// Add an equality condition on a known column.
    pub fn with(mut self, column: &'static str, value: FilterValue) -> Self {
        self.conditions.push((column, value));
        self
    }

    /// Column/value pairs; column names come only from the fixed whitelist.
    pub fn conditions(&self) -> &[(&'static str, FilterValue)] {
        &self.conditions
    }
}
