//! Registration, login and token contract tests.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use sweet_shop_integration_tests::{TestApp, token_of};

#[tokio::test]
async fn test_register_returns_token_and_user() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "alice", "email": "Alice@Example.com", "password": "secret123" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["message"], "User registered successfully");
    let user = &response.data()["user"];
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("passwordHash").is_none());
    assert!(!token_of(&response).is_empty());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::new();
    app.register("alice").await;

    let response = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "alice2", "email": "alice@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.error(), "Email already registered.");
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let app = TestApp::new();
    app.register("alice").await;

    let response = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "alice", "email": "other@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error(), "Username already taken.");
}

#[tokio::test]
async fn test_register_missing_and_invalid_fields() {
    let app = TestApp::new();

    let missing = app
        .post("/api/auth/register", None, json!({ "username": "bob" }))
        .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.error(), "Please provide username, email, and password.");

    let invalid = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "bo", "email": "not-an-email", "password": "123" }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.error(), "Validation failed");
    assert_eq!(invalid.body["details"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("valid request");

    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new();
    app.register("carol").await;

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "CAROL@example.com", "password": "secret123" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = token_of(&login);

    let me = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.data()["user"]["username"], "carol");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.register("dave").await;

    let wrong_password = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "dave@example.com", "password": "wrong-password" }),
        )
        .await;
    let unknown_email = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": "secret123" }),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.error(), unknown_email.error());
    assert_eq!(wrong_password.error(), "Invalid email or password.");
}

#[tokio::test]
async fn test_missing_and_invalid_tokens() {
    let app = TestApp::new();

    let missing = app.get("/api/auth/me", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.error(), "Access denied. No token provided.");

    let invalid = app.get("/api/auth/me", Some("garbage")).await;
    assert_eq!(invalid.status, StatusCode::UNAUTHORIZED);
    assert_eq!(invalid.error(), "Invalid token.");
}

#[tokio::test]
async fn test_admin_self_registration_forbidden() {
    let app = TestApp::new();
    let response = app
        .post(
            "/api/auth/register",
            None,
            json!({
                "username": "sneaky",
                "email": "sneaky@example.com",
                "password": "secret123",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_can_register_admin() {
    let app = TestApp::new();
    let admin = app.admin("root").await;

    let response = app
        .post(
            "/api/auth/register",
            Some(&admin),
            json!({
                "username": "deputy",
                "email": "deputy@example.com",
                "password": "secret123",
                "role": "admin",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.data()["user"]["role"], "admin");
}
