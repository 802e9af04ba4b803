//! Integration tests for API endpoints.
//!
//! Each test drives the real router against a fresh in-memory SQLite
//! database, so status codes come from the store's normalized errors.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use sea_orm::{ConnectionTrait, Schema};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::DatabaseConfig;
use entity_access::Database;
use user_service_lib::entities::UserEntity;
use user_service_lib::routes::create_router;
use user_service_lib::state::AppState;

async fn app() -> Router {
    let database = Database::connect(&DatabaseConfig::in_memory_sqlite())
        .await
        .expect("in-memory database");

    let db = database.connection();
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(UserEntity)))
        .await
        .expect("create users table");

    create_router(AppState::new(database))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create(app: &Router, email: &str, name: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/users",
        Some(json!({ "email": email, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body
}

fn user_uri(user: &Value) -> String {
    format!("/users/{}", user["id"].as_str().unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_and_get_user() {
    let app = app().await;
    let created = create(&app, "ann@example.com", "Ann").await;

    let mut keys: Vec<&str> = created
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["bio", "created_at", "email", "id", "name", "updated_at"]
    );

    let (status, fetched) = send(&app, "GET", &user_uri(&created), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let app = app().await;
    create(&app, "ann@example.com", "Ann").await;

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({ "email": "ann@example.com", "name": "Other" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    assert_eq!(
        body["error"]["message"],
        "users with email address ann@example.com already exists"
    );
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/users",
        Some(json!({ "email": "not-an-email", "name": "Ann" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_get_missing_user_is_not_found() {
    let app = app().await;

    let (status, body) = send(&app, "GET", &format!("/users/{}", Uuid::new_v4()), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_patch_updates_fields() {
    let app = app().await;
    let created = create(&app, "ann@example.com", "Ann").await;

    let (status, updated) = send(
        &app,
        "PATCH",
        &user_uri(&created),
        Some(json!({ "name": "Ann B.", "bio": "Rustacean", "created_at": "2000-01-01T00:00:00Z" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ann B.");
    assert_eq!(updated["bio"], "Rustacean");
    assert_eq!(updated["email"], "ann@example.com");
    assert_eq!(updated["created_at"], created["created_at"]);
}

#[tokio::test]
async fn test_patch_cannot_rewrite_creation_time_through_alias() {
    let app = app().await;
    let created = create(&app, "ann@example.com", "Ann").await;

    let (status, updated) = send(
        &app,
        "PATCH",
        &user_uri(&created),
        Some(json!({ "createdAt": "2000-01-01T00:00:00Z", "name": "Ann B." })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ann B.");
    assert_eq!(updated["created_at"], created["created_at"]);

    let (_, fetched) = send(&app, "GET", &user_uri(&created), None).await;
    assert_eq!(fetched["created_at"], created["created_at"]);
}

#[tokio::test]
async fn test_patch_rejects_unknown_fields_and_id_changes() {
    let app = app().await;
    let created = create(&app, "ann@example.com", "Ann").await;

    let (status, _) = send(
        &app,
        "PATCH",
        &user_uri(&created),
        Some(json!({ "nickname": "annie" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "PATCH",
        &user_uri(&created),
        Some(json!({ "id": Uuid::new_v4().to_string() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_to_taken_email_is_conflict() {
    let app = app().await;
    create(&app, "ann@example.com", "Ann").await;
    let bob = create(&app, "bob@example.com", "Bob").await;

    let (status, _) = send(
        &app,
        "PATCH",
        &user_uri(&bob),
        Some(json!({ "email": "ann@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Re-submitting one's own email is not a conflict
    let (status, _) = send(
        &app,
        "PATCH",
        &user_uri(&bob),
        Some(json!({ "email": "bob@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_user() {
    let app = app().await;
    let created = create(&app, "ann@example.com", "Ann").await;
    let uri = user_uri(&created);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_users_with_window() {
    let app = app().await;
    for n in 0..3 {
        create(&app, &format!("user{n}@example.com"), "User").await;
    }

    let (status, all) = send(&app, "GET", "/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (status, window) = send(&app, "GET", "/users?offset=1&limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(window.as_array().unwrap().len(), 1);
}
