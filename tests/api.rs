use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use peoples_voice::config::AppConfig;
use peoples_voice::responder::KeywordResponder;
use peoples_voice::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> Router {
    let config = AppConfig::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused/peoples_voice".to_string()),
        "JWT_SECRET" => Some("integration-test-secret".to_string()),
        _ => None,
    })
    .expect("test config");
    let responder = Arc::new(KeywordResponder::new(Duration::ZERO));
    build_router(Arc::new(AppState::in_memory(config, responder)))
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, email: &str, name: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": "secret123", "display_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_and_verify() {
    let app = app();
    register(&app, "Selvi@Example.com", "Selvi").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "selvi@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["display_name"], "Selvi");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = call(&app, "GET", "/api/auth/verify", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "selvi@example.com");
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let app = app();
    register(&app, "arun@example.com", "Arun").await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "arun@example.com", "password": "another1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "arun@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "short@example.com", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_endpoints_require_a_token() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing Authorization header");

    let (status, _) = call(&app, "GET", "/api/sessions", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sessions_and_messages_round_trip() {
    let app = app();
    let token = register(&app, "devi@example.com", "Devi").await;

    let (status, body) = call(&app, "POST", "/api/sessions", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["session"]["title"], "New Chat");
    let first = body["session"]["id"].as_str().unwrap().to_string();

    let (_, body) = call(
        &app,
        "POST",
        "/api/sessions",
        Some(&token),
        Some(json!({ "title": "Pension questions" })),
    )
    .await;
    let second = body["session"]["id"].as_str().unwrap().to_string();

    // Renaming the older session moves it to the top.
    let (status, body) = call(
        &app,
        "PATCH",
        &format!("/api/sessions/{}", first),
        Some(&token),
        Some(json!({ "title": "Tenant rights" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session"]["title"], "Tenant rights");

    let (_, body) = call(&app, "GET", "/api/sessions", Some(&token), None).await;
    let ids: Vec<&str> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);

    for (role, content) in [("user", "Can my landlord evict me?"), ("assistant", "It depends.")] {
        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/sessions/{}/messages", first),
            Some(&token),
            Some(json!({ "role": role, "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(&app, "GET", &format!("/api/sessions/{}/messages", first), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["content"], "It depends.");

    let (status, _) = call(&app, "DELETE", &format!("/api/sessions/{}", first), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", &format!("/api/sessions/{}/messages", first), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_users_cannot_touch_a_session() {
    let app = app();
    let owner = register(&app, "owner@example.com", "Owner").await;
    let intruder = register(&app, "intruder@example.com", "Intruder").await;

    let (_, body) = call(&app, "POST", "/api/sessions", Some(&owner), Some(json!({ "title": "Private" }))).await;
    let id = body["session"]["id"].as_str().unwrap().to_string();

    let (_, body) = call(&app, "GET", "/api/sessions", Some(&intruder), None).await;
    assert!(body["sessions"].as_array().unwrap().is_empty());

    for (method, uri, payload) in [
        ("GET", format!("/api/sessions/{}", id), None),
        ("GET", format!("/api/sessions/{}/messages", id), None),
        (
            "POST",
            format!("/api/sessions/{}/messages", id),
            Some(json!({ "role": "user", "content": "hi" })),
        ),
        ("PATCH", format!("/api/sessions/{}", id), Some(json!({ "title": "Mine" }))),
        ("DELETE", format!("/api/sessions/{}", id), None),
    ] {
        let (status, _) = call(&app, method, &uri, Some(&intruder), payload).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
    }

    let (status, body) = call(
        &app,
        "POST",
        "/api/chat/submit",
        Some(&intruder),
        Some(json!({ "session_id": id, "prompt": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
async fn submit_runs_the_whole_chat_flow() {
    let app = app();
    let token = register(&app, "lakshmi@example.com", "Lakshmi").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/chat/submit",
        Some(&token),
        Some(json!({ "prompt": "What schemes am I eligible for?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert!(body["reply"]["content"]
        .as_str()
        .unwrap()
        .starts_with("**Tamil Nadu Welfare Schemes**"));
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    let (_, body) = call(&app, "GET", "/api/sessions", Some(&token), None).await;
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["title"], "What schemes am I eligible for?");

    let (status, body) = call(
        &app,
        "POST",
        "/api/chat/submit",
        Some(&token),
        Some(json!({ "session_id": session_id, "prompt": "Tell me about women's safety" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["messages"].as_array().unwrap().len(), 4);

    let (_, body) = call(&app, "GET", "/api/sessions", Some(&token), None).await;
    assert_eq!(body["sessions"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "POST", "/api/chat/submit", Some(&token), Some(json!({ "prompt": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn respond_returns_keyword_reply() {
    let app = app();
    let token = register(&app, "ravi@example.com", "Ravi").await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/chat/respond",
        Some(&token),
        Some(json!({ "prompt": "How do I get a passport?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("Thank you for your question."));
}

#[tokio::test]
async fn status_reports_healthy_store() {
    let app = app();
    let (status, body) = call(&app, "GET", "/api/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["services"]["database"], "healthy");
    assert_eq!(body["services"]["responder"], "keyword");
}
