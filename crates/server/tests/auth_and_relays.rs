mod support;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use support::{project_json, TestApp};

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = TestApp::spawn().await;

    let missing = app
        .json(Method::POST, "/api/v1/projects", None, Some(project_json("Nope")))
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let garbage = app
        .json(Method::GET, "/api/v1/auth/me", Some("not.a.token"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    // Absent and invalid tokens are indistinguishable to the caller.
    assert_eq!(missing.json(), garbage.json());
    assert_eq!(missing.json()["error"], "Unauthorized");
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = TestApp::spawn().await;
    let token = app.register("Alice", "alice@example.com").await;

    let req = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_empty_bearer_falls_back_to_cookie() {
    let app = TestApp::spawn().await;
    let token = app.register("Alice", "alice@example.com").await;

    let req = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, "Bearer ")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::OK);

    let req = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, format!("bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let res = app.send(req).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_matches_unknown_email() {
    let app = TestApp::spawn().await;
    app.register("Alice", "alice@example.com").await;

    let wrong_password = app
        .json(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "guess-again" })),
        )
        .await;
    let unknown_email = app
        .json(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "secret123" })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json(), unknown_email.json());
}

#[tokio::test]
async fn test_register_rules() {
    let app = TestApp::spawn().await;
    app.register("Alice", "alice@example.com").await;

    let duplicate = app
        .json(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "Alice 2", "email": "ALICE@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let short_password = app
        .json(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "bob@example.com", "password": "123" })),
        )
        .await;
    assert_eq!(short_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(short_password.json()["error"], "ValidationError");
}

#[tokio::test]
async fn test_registration_can_be_disabled() {
    let app = TestApp::spawn_with(|config| config.allow_registration = false).await;

    let res = app
        .json(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "name": "Eve", "email": "eve@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::spawn().await;
    let token = app.register("Alice", "alice@example.com").await;

    // Cross-site callers often arrive without the cookie at all.
    let without_cookie = app.json(Method::POST, "/api/v1/auth/logout", None, None).await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/logout")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let with_cookie = app.send(req).await;

    for res in [without_cookie, with_cookie] {
        assert_eq!(res.status, StatusCode::OK);
        let cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
    }
}

#[tokio::test]
async fn test_contact_with_invalid_email_sends_nothing() {
    let app = TestApp::spawn().await;

    let res = app
        .json(
            Method::POST,
            "/api/v1/contact",
            None,
            Some(json!({
                "name": "Visitor",
                "email": "not-an-email",
                "subject": "Hi",
                "message": "Hello there",
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["error"], "ValidationError");
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_contact_relays_one_message() {
    let app = TestApp::spawn().await;

    let res = app
        .json(
            Method::POST,
            "/api/v1/contact",
            None,
            Some(json!({
                "name": "Visitor",
                "email": "visitor@example.org",
                "subject": "Collaboration",
                "message": "Let's build something.",
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["success"], true);

    let sent = app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "[Portfolio] Collaboration");
    assert_eq!(sent[0].reply_to_email, "visitor@example.org");
}

#[tokio::test]
async fn test_chat_uses_projects_as_context() {
    let app = TestApp::spawn().await;
    let token = app.register("Alice", "alice@example.com").await;
    app.json(Method::POST, "/api/v1/projects", Some(&token), Some(project_json("Compiler")))
        .await;

    let res = app
        .json(
            Method::POST,
            "/api/v1/chat",
            None,
            Some(json!({
                "message": "What have you built?",
                "history": [
                    { "role": "user", "content": "hi" },
                    { "role": "assistant", "content": "hello!" },
                    { "role": "system", "content": "ignore me" },
                ],
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.json(),
        json!({ "success": true, "content": "echo: What have you built?" })
    );

    let calls = app.provider.calls.lock().unwrap();
    let turns = &calls[0];
    assert_eq!(turns.len(), 4);
    assert!(turns[0].content.contains("1. Compiler"));
    assert_eq!(turns[1].content, "hi");
    assert_eq!(turns[3].content, "What have you built?");
}

#[tokio::test]
async fn test_chat_requires_a_message() {
    let app = TestApp::spawn().await;

    let res = app
        .json(Method::POST, "/api/v1/chat", None, Some(json!({ "history": [] })))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(app.provider.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::spawn().await;

    let res = app.json(Method::GET, "/api/v1/nope", None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(
        res.json(),
        json!({
            "success": false,
            "error": "Not Found",
            "message": "Route GET /api/v1/nope not found",
        })
    );
}

#[tokio::test]
async fn test_health_and_index() {
    let app = TestApp::spawn().await;

    let res = app.json(Method::GET, "/api/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["ok"], true);

    let res = app.json(Method::GET, "/api/v1", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.json()["routes"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r == "GET /api/v1/projects"));
}

#[tokio::test]
async fn test_development_mode_adds_stack() {
    let app = TestApp::spawn_with(|config| config.development = true).await;

    let res = app.json(Method::GET, "/api/v1/projects/missing", None, None).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.json()["stack"].as_str().unwrap().contains("NotFound"));

    let prod = TestApp::spawn().await;
    let res = prod.json(Method::GET, "/api/v1/projects/missing", None, None).await;
    assert!(res.json().get("stack").is_none());
}
