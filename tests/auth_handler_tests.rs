mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use classroom_files::{AppConfig, MockStorageService, UserRepository, auth::verify_token};
use common::{
    BrokenRepository, InMemoryRepository, app, body_json, json_request, list_request, state_with,
};
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

fn register_body(email: &str) -> serde_json::Value {
    json!({ "email": email, "password": "hunter2hunter2", "role": "teacher" })
}

#[tokio::test]
async fn test_register_returns_sanitised_user_and_token() {
    let response = app(MockStorageService::new())
        .oneshot(json_request(
            "/api/auth/register",
            register_body("grace@school.edu"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["user"]["email"], "grace@school.edu");
    assert_eq!(json["user"]["role"], "teacher");
    assert!(json["user"].get("password").is_none());
    assert!(json["user"].get("password_hash").is_none());

    let claims = verify_token(
        json["token"].as_str().unwrap(),
        &AppConfig::default().jwt_secret,
    )
    .unwrap();
    assert_eq!(claims.sub.to_string(), json["user"]["id"].as_str().unwrap());
    assert_eq!(claims.role, "teacher");
}

#[tokio::test]
async fn test_register_missing_field_is_bad_request() {
    let response = app(MockStorageService::new())
        .oneshot(json_request(
            "/api/auth/register",
            json!({ "email": "grace@school.edu", "password": "pw" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "All fields are required");
}

#[tokio::test]
async fn test_register_blank_field_is_bad_request() {
    let response = app(MockStorageService::new())
        .oneshot(json_request(
            "/api/auth/register",
            json!({ "email": "  ", "password": "pw", "role": "student" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_invalid_email_is_bad_request() {
    let response = app(MockStorageService::new())
        .oneshot(json_request(
            "/api/auth/register",
            register_body("not-an-email"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid email format");
}

#[tokio::test]
async fn test_register_duplicate_email_is_conflict() {
    let router = app(MockStorageService::new());

    let first = router
        .clone()
        .oneshot(json_request("/api/auth/register", register_body("dup@school.edu")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = router
        .oneshot(json_request("/api/auth/register", register_body("dup@school.edu")))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"], "Email already exists");
}

#[tokio::test]
async fn test_register_database_failure_is_generic_error() {
    let router = classroom_files::create_router(state_with(
        Arc::new(BrokenRepository),
        MockStorageService::new(),
    ));

    let response = router
        .oneshot(json_request("/api/auth/register", register_body("x@school.edu")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Registration failed");
}

#[tokio::test]
async fn test_login_after_register_yields_working_token() {
    let router = app(MockStorageService::new());

    router
        .clone()
        .oneshot(json_request("/api/auth/register", register_body("alan@school.edu")))
        .await
        .unwrap();

    let login = router
        .clone()
        .oneshot(json_request(
            "/api/auth/login",
            json!({ "email": "alan@school.edu", "password": "hunter2hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let json = body_json(login).await;
    assert_eq!(json["user"]["email"], "alan@school.edu");
    let token = json["token"].as_str().unwrap().to_string();

    let listing = router.oneshot(list_request(Some(&token))).await.unwrap();
    assert_eq!(listing.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let router = app(MockStorageService::new());

    router
        .clone()
        .oneshot(json_request("/api/auth/register", register_body("ada@school.edu")))
        .await
        .unwrap();

    let response = router
        .oneshot(json_request(
            "/api/auth/login",
            json!({ "email": "ada@school.edu", "password": "wrong-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_unknown_email_is_unauthorized() {
    let response = app(MockStorageService::new())
        .oneshot(json_request(
            "/api/auth/login",
            json!({ "email": "nobody@school.edu", "password": "whatever" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_missing_password_is_bad_request() {
    let response = app(MockStorageService::new())
        .oneshot(json_request(
            "/api/auth/login",
            json!({ "email": "ada@school.edu" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Email and password required"
    );
}

#[tokio::test]
async fn test_login_database_failure_is_generic_error() {
    let router = classroom_files::create_router(state_with(
        Arc::new(BrokenRepository),
        MockStorageService::new(),
    ));

    let response = router
        .oneshot(json_request(
            "/api/auth/login",
            json!({ "email": "ada@school.edu", "password": "pw" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Login failed");
}

#[tokio::test]
async fn test_in_memory_repository_is_shared_across_requests() {
    // Sanity check for the test fixture itself: the same Arc backs every clone.
    let repo = Arc::new(InMemoryRepository::default());
    let router = classroom_files::create_router(state_with(repo.clone(), MockStorageService::new()));

    router
        .oneshot(json_request("/api/auth/register", register_body("k@school.edu")))
        .await
        .unwrap();

    assert!(repo.find_by_email("k@school.edu").await.unwrap().is_some());
}

#[tokio::test]
async fn test_register_malformed_json_is_json_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(MockStorageService::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("JSON"));
}

#[tokio::test]
async fn test_login_without_json_content_type_is_json_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .body(Body::from(r#"{"email":"a@b.co","password":"pw"}"#))
        .unwrap();

    let response = app(MockStorageService::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("application/json"));
}
