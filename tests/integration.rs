//! Integration tests: register, login, profile and token refresh over HTTP.
//!
//! Run with `cargo test`. Most tests use the in-memory user store. The PostgreSQL
//! round-trip runs only when `TEST_DATABASE_URL` is set (migrations are applied).

use amankan::auth::JwtSecret;
use amankan::db::{self, InMemoryUserStore, PgUserStore};
use amankan::{create_app, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

const JWT_SECRET: &str = "test-jwt-secret-min-32-chars!!!!";

fn memory_app() -> (Router, InMemoryUserStore) {
    let store = InMemoryUserStore::new();
    let jwt = JwtSecret::new(JWT_SECRET.to_string(), 300, 86_400);
    let state = AppState::new(Arc::new(store.clone()), jwt, true);
    (create_app(state), store)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_alice(app: &Router) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/register",
        Some(json!({ "email": "a@x.com", "username": "alice", "password": "secret123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register should succeed: {body}");
    body
}

async fn login(app: &Router, identifier: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/login",
        Some(json!({ "email_or_username": identifier, "password": password })),
        None,
    )
    .await
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = memory_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_returns_public_user() {
    let (app, _) = memory_app();
    let body = register_alice(&app).await;
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["username"], "alice");
    assert!(body["id"].as_str().is_some());
    assert!(body.get("password").is_none());
    assert!(!body.to_string().contains("secret123"));
}

#[tokio::test]
async fn register_then_login_by_username_and_email() {
    let (app, _) = memory_app();
    let registered = register_alice(&app).await;

    for identifier in ["alice", "a@x.com"] {
        let (status, body) = login(&app, identifier, "secret123").await;
        assert_eq!(status, StatusCode::OK, "login with {identifier}: {body}");
        assert!(body["access"].as_str().is_some());
        assert!(body["refresh"].as_str().is_some());
        assert_eq!(body["user"], registered);
        assert!(body["user"].get("password").is_none());
    }
}

#[tokio::test]
async fn login_accepts_email_field_name() {
    let (app, _) = memory_app();
    register_alice(&app).await;
    let (status, _) = send(
        &app,
        "POST",
        "/login",
        Some(json!({ "email": "alice", "password": "secret123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_failures_are_distinguished() {
    let (app, store) = memory_app();
    let registered = register_alice(&app).await;

    let (status, body) = login(&app, "alice", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_password");
    assert_eq!(body["detail"], "Wrong Password. Please Try Again");

    let (status, body) = login(&app, "nobody", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "user_not_found");

    let id = registered["id"].as_str().unwrap().parse().unwrap();
    store.set_active(id, false).await.unwrap();
    let (status, body) = login(&app, "alice", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "user_inactive");
}

#[tokio::test]
async fn blank_login_fields_are_bad_request() {
    let (app, _) = memory_app();
    let (status, body) = login(&app, "", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email_or_username").is_some());
    assert!(body.get("password").is_some());
}

#[tokio::test]
async fn login_identifier_is_trimmed() {
    let (app, _) = memory_app();
    let (status, _) = send(
        &app,
        "POST",
        "/register",
        Some(json!({ "email": "a@x.com", "username": " alice ", "password": "secret123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = login(&app, " alice ", "secret123").await;
    assert_eq!(status, StatusCode::OK, "padded username should resolve: {body}");
    assert_eq!(body["user"]["username"], "alice");

    let (status, _) = login(&app, "  a@x.com\t", "secret123").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = login(&app, "   ", "secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["email_or_username"][0], "This field may not be blank.");
}

#[tokio::test]
async fn login_missing_fields_are_required() {
    let (app, _) = memory_app();
    let (status, body) = send(
        &app,
        "POST",
        "/login",
        Some(json!({ "email_or_username": "alice" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["password"][0], "This field is required.");
    assert!(body.get("email_or_username").is_none());

    let (status, body) = send(&app, "POST", "/login", Some(json!({})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["email_or_username"][0], "This field is required.");
    assert_eq!(body["password"][0], "This field is required.");
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (app, store) = memory_app();
    register_alice(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/register",
        Some(json!({ "email": "a@x.com", "username": "alice", "password": "secret123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());
    assert!(body["username"].is_array());
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn register_validation_errors_are_field_keyed() {
    let (app, store) = memory_app();
    let (status, body) = send(
        &app,
        "POST",
        "/register",
        Some(json!({ "email": "nope", "username": "" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["email"][0], "Enter a valid email address.");
    assert_eq!(body["username"][0], "This field may not be blank.");
    assert_eq!(body["password"][0], "This field is required.");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn register_length_limits_are_enforced() {
    let (app, store) = memory_app();
    let email = format!(
        "user@{}.{}.{}.{}.com",
        "a".repeat(63),
        "b".repeat(63),
        "c".repeat(63),
        "d".repeat(54)
    );
    assert_eq!(email.len(), 255);
    let (status, body) = send(
        &app,
        "POST",
        "/register",
        Some(json!({ "email": email, "username": "a".repeat(151), "password": "secret123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"]
        .as_array()
        .unwrap()
        .contains(&json!("Ensure this field has no more than 254 characters.")));
    assert_eq!(
        body["username"][0],
        "Ensure this field has no more than 150 characters."
    );
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (app, _) = memory_app();
    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_authentication() {
    let (app, _) = memory_app();
    let (status, body) = send(&app, "GET", "/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "not_authenticated");

    let (status, body) = send(&app, "GET", "/profile", None, Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");

    let (status, _) = send(
        &app,
        "PUT",
        "/profile",
        Some(json!({ "username": "mallory" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_get_and_update() {
    let (app, _) = memory_app();
    let registered = register_alice(&app).await;
    let (_, tokens) = login(&app, "alice", "secret123").await;
    let access = tokens["access"].as_str().unwrap();
    let refresh = tokens["refresh"].as_str().unwrap();

    let (status, body) = send(&app, "GET", "/profile", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, registered);

    // refresh tokens do not authenticate requests
    let (status, _) = send(&app, "GET", "/profile", None, Some(refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "PUT",
        "/profile",
        Some(json!({ "username": "alicia", "password": "n3w-secret" })),
        Some(access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alicia");
    assert_eq!(body["email"], "a@x.com");
    assert!(body.get("password").is_none());
    assert!(!body.to_string().contains("n3w-secret"));

    let (status, _) = login(&app, "alicia", "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = login(&app, "alicia", "n3w-secret").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "PATCH",
        "/profile",
        Some(json!({ "email": "not-an-email" })),
        Some(access),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());
}

#[tokio::test]
async fn deactivated_user_token_is_rejected() {
    let (app, store) = memory_app();
    let registered = register_alice(&app).await;
    let (_, tokens) = login(&app, "alice", "secret123").await;
    let access = tokens["access"].as_str().unwrap();

    let id = registered["id"].as_str().unwrap().parse().unwrap();
    store.set_active(id, false).await.unwrap();

    let (status, body) = send(&app, "GET", "/profile", None, Some(access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "user_inactive");
}

#[tokio::test]
async fn refresh_mints_working_access_token() {
    let (app, _) = memory_app();
    register_alice(&app).await;
    let (_, tokens) = login(&app, "alice", "secret123").await;

    let (status, body) = send(
        &app,
        "POST",
        "/token/refresh",
        Some(json!({ "refresh": tokens["refresh"] })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();

    let (status, _) = send(&app, "GET", "/profile", None, Some(access)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/token/refresh",
        Some(json!({ "refresh": tokens["access"] })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_not_valid");
}

#[tokio::test]
async fn postgres_register_and_login() {
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("Skip postgres test: set TEST_DATABASE_URL");
            return;
        }
    };
    let pool = match db::create_pool(&database_url).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Skip postgres test: {}", e);
            return;
        }
    };
    db::run_migrations(&pool).await.unwrap();

    let store = PgUserStore::new(pool);
    let jwt = JwtSecret::new(JWT_SECRET.to_string(), 300, 86_400);
    let app = create_app(AppState::new(Arc::new(store.clone()), jwt, true));

    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let email = format!("test-{}@example.com", suffix);
    let username = format!("user{}@example.org", suffix);

    let (status, registered) = send(
        &app,
        "POST",
        "/register",
        Some(json!({ "email": email, "username": username, "password": "secret123" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register should succeed");

    // an email equal to an existing username is refused
    let (status, body) = send(
        &app,
        "POST",
        "/register",
        Some(json!({ "email": username, "username": format!("other{}", suffix), "password": "x" })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["email"].is_array());

    let (status, body) = login(&app, &username, "secret123").await;
    assert_eq!(status, StatusCode::OK, "login should succeed");
    assert_eq!(body["user"], registered);

    let (status, body) = login(&app, &email, "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_password");

    let id = registered["id"].as_str().unwrap().parse().unwrap();
    store.set_active(id, false).await.unwrap();
    let (status, body) = login(&app, &email, "secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "user_inactive");
}
