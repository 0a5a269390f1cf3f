//! End-to-end tests of `/books` through the full router and an in-memory database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bookshelf_kernel::{settings::Settings, ModuleRegistry};
use serde_json::{json, Value};
use tower::ServiceExt;

fn power_up() -> Value {
    json!({
        "isbn": "0691161518",
        "amazon_url": "http://a.co/eobPtX2",
        "author": "Matthew Lane",
        "language": "english",
        "pages": 264,
        "publisher": "Princeton University Press",
        "title": "Power-Up: Unlocking the Hidden Mathematics in Video Games",
        "year": 2017
    })
}

fn power_up_updated() -> Value {
    json!({
        "isbn": "0691161518",
        "amazon_url": "http://a.co/eobPtX2",
        "author": "Matthew Louis",
        "language": "spanish",
        "pages": 300,
        "publisher": "Princeton University Press",
        "title": "Power-Up: Unlocking the Hidden Mathematics in Video Games",
        "year": 2018
    })
}

async fn app() -> Router {
    let pool = bookshelf_db::connect("sqlite::memory:", 1).await.unwrap();
    let mut registry = ModuleRegistry::new();
    bookshelf_app::register_all(&mut registry, &pool);
    bookshelf_db::run_migrations(&pool, &registry.collect_migrations())
        .await
        .unwrap();

    bookshelf_http::build_router(&registry, &Settings::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn assert_error_shape(body: &Value, list: bool) {
    assert!(body["error"].is_object(), "error object missing: {body}");
    if list {
        assert!(body["message"].is_array(), "message list missing: {body}");
    } else {
        assert!(body["message"].is_string(), "message string missing: {body}");
    }
}

#[tokio::test]
async fn book_lifecycle() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "/books", Some(json!({ "book": power_up() }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "book": power_up() }));

    let (status, body) = send(&app, "GET", "/books/0691161518", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "book": power_up() }));

    let (status, body) = send(
        &app,
        "PUT",
        "/books/0691161518",
        Some(json!({ "book": power_up_updated() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "book": power_up_updated() }));

    let (status, body) = send(
        &app,
        "POST",
        "/books/0691161518",
        Some(json!({"book": {"title": "Title Updated", "year": 2022}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let mut merged = power_up_updated();
    merged["title"] = json!("Title Updated");
    merged["year"] = json!(2022);
    assert_eq!(body, json!({ "book": merged.clone() }));

    let (status, body) = send(&app, "GET", "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "books": [merged] }));

    let (status, body) = send(&app, "DELETE", "/books/0691161518", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Book deleted" }));

    let (status, body) = send(&app, "GET", "/books/0691161518", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_shape(&body, false);
}

#[tokio::test]
async fn create_rejects_schema_violations() {
    let app = app().await;

    for book in [
        json!({"isbn": 123}),
        json!({"pages": "acb"}),
        json!({"amazon_url": "www.com"}),
        json!({"isbn": "0691161518"}),
    ] {
        let (status, body) =
            send(&app, "POST", "/books", Some(json!({ "book": book.clone() }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{book}");
        assert_error_shape(&body, true);
    }

    let (_, body) = send(&app, "GET", "/books", None).await;
    assert_eq!(body, json!({ "books": [] }));
}

#[tokio::test]
async fn updates_reject_schema_violations() {
    let app = app().await;
    send(&app, "POST", "/books", Some(json!({ "book": power_up() }))).await;

    for method in ["PUT", "POST"] {
        for book in [
            json!({"isbn": 123}),
            json!({"pages": "acb"}),
            json!({"amazon_url": "www.com"}),
        ] {
            let (status, body) =
                send(&app, method, "/books/0691161518", Some(json!({ "book": book.clone() }))).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {book}");
            assert_error_shape(&body, true);
        }
    }

    // Full update needs every field; a lone isbn is not enough.
    let (status, body) = send(
        &app,
        "PUT",
        "/books/0691161518",
        Some(json!({"book": {"isbn": "0691161518"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_shape(&body, true);

    let (_, body) = send(&app, "GET", "/books/0691161518", None).await;
    assert_eq!(body, json!({ "book": power_up() }));
}

#[tokio::test]
async fn unknown_isbn_is_not_found() {
    let app = app().await;
    let mut full = power_up();
    full["isbn"] = json!("abc123");

    for (method, body) in [
        ("GET", None),
        ("PUT", Some(json!({ "book": full }))),
        ("POST", Some(json!({"book": {"title": "Title Updated"}}))),
        ("DELETE", None),
    ] {
        let (status, response) = send(&app, method, "/books/abc123", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
        assert_error_shape(&response, false);
    }
}

#[tokio::test]
async fn duplicate_isbn_is_conflict() {
    let app = app().await;
    send(&app, "POST", "/books", Some(json!({ "book": power_up() }))).await;

    let (status, body) = send(&app, "POST", "/books", Some(json!({ "book": power_up() }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error_shape(&body, false);
}

#[tokio::test]
async fn repeated_full_update_is_idempotent() {
    let app = app().await;
    send(&app, "POST", "/books", Some(json!({ "book": power_up() }))).await;

    let payload = json!({ "book": power_up_updated() });
    let (_, first) = send(&app, "PUT", "/books/0691161518", Some(payload.clone())).await;
    let (_, stored_first) = send(&app, "GET", "/books/0691161518", None).await;
    let (_, second) = send(&app, "PUT", "/books/0691161518", Some(payload)).await;
    let (_, stored_second) = send(&app, "GET", "/books/0691161518", None).await;

    assert_eq!(first, second);
    assert_eq!(stored_first, stored_second);
}

#[tokio::test]
async fn list_filters_by_field_equality() {
    let app = app().await;
    let mut rust_book = power_up();
    rust_book["isbn"] = json!("1593278284");
    rust_book["author"] = json!("Steve Klabnik");
    rust_book["year"] = json!(2018);

    send(&app, "POST", "/books", Some(json!({ "book": power_up() }))).await;
    send(&app, "POST", "/books", Some(json!({ "book": rust_book.clone() }))).await;

    let (status, body) = send(&app, "GET", "/books?year=2018", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "books": [rust_book] }));

    let (status, body) = send(&app, "GET", "/books?language=english", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/books?year=recent", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_shape(&body, true);
}

#[tokio::test]
async fn isbn_matching_a_word_is_addressable() {
    let app = app().await;
    let mut book = power_up();
    book["isbn"] = json!("health");

    let (status, body) = send(&app, "POST", "/books", Some(json!({ "book": book.clone() }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "book": book.clone() }));

    let (status, body) = send(&app, "GET", "/books/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "book": book.clone() }));

    book["pages"] = json!(300);
    let (status, body) = send(&app, "PUT", "/books/health", Some(json!({ "book": book.clone() }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "book": book.clone() }));

    let (status, body) = send(
        &app,
        "POST",
        "/books/health",
        Some(json!({"book": {"title": "Title Updated"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    book["title"] = json!("Title Updated");
    assert_eq!(body, json!({ "book": book }));

    let (status, body) = send(&app, "DELETE", "/books/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Book deleted" }));

    let (status, body) = send(&app, "GET", "/books/health", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_shape(&body, false);
}

#[tokio::test]
async fn integral_float_fields_are_stored_as_integers() {
    let app = app().await;
    let mut book = power_up();
    book["pages"] = json!(264.0);

    let (status, body) = send(&app, "POST", "/books", Some(json!({ "book": book }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "book": power_up() }));

    let (status, body) = send(
        &app,
        "POST",
        "/books/0691161518",
        Some(json!({"book": {"year": 2022.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["year"], json!(2022));
}

#[tokio::test]
async fn health_and_docs_are_served() {
    let app = app().await;

    let request = Request::get("/healthz").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(&app, "GET", "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/books/{isbn}"]["put"].is_object());
    assert!(body["components"]["schemas"]["Book"].is_object());
    assert!(body["paths"]["/books/health"].is_null());
}
