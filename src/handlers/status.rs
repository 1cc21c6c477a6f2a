// src/handlers/status.rs
use crate::AppState;
use axum::{
    extract::Extension,
    response::{Html, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn status_routes() -> Router {
    Router::new()
        .route("/api/status", get(api_status))
        .route("/api/docs", get(api_documentation))
}

async fn api_status(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let db_status = match state.store.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    let responder = if state.config.responder_url.is_some() {
        "remote"
    } else {
        "keyword"
    };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status,
            "responder": responder
        },
        "endpoints": {
            "documentation": "/api/docs",
            "status": "/api/status",
            "websocket": "/ws?token=<jwt>",
            "auth": "/api/auth/*",
            "sessions": "/api/sessions/*",
            "chat": "/api/chat/*"
        }
    }))
}

async fn api_documentation() -> Html<&'static str> {
    Html(API_DOCS)
}

const API_DOCS: &str = r###"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>People's Voice - API Documentation</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 960px; margin: 0 auto; padding: 20px; line-height: 1.6; }
        .endpoint { background: #f8f9fa; border-left: 4px solid #007bff; padding: 0.75rem 1rem; margin: 0.75rem 0; border-radius: 5px; }
        code { background: #e9ecef; padding: 0.2rem 0.4rem; border-radius: 3px; }
    </style>
</head>
<body>
    <h1>People's Voice API</h1>
    <p>Endpoints marked 🔒 require <code>Authorization: Bearer &lt;token&gt;</code>.</p>

    <h2>Authentication</h2>
    <div class="endpoint"><strong>POST /api/auth/register</strong><br><code>{"email", "password", "display_name"?}</code></div>
    <div class="endpoint"><strong>POST /api/auth/login</strong><br><code>{"email", "password"}</code></div>
    <div class="endpoint"><strong>GET /api/auth/verify</strong> 🔒</div>

    <h2>Sessions &amp; messages</h2>
    <div class="endpoint"><strong>GET /api/sessions</strong> 🔒 newest-updated first</div>
    <div class="endpoint"><strong>POST /api/sessions</strong> 🔒 <code>{"title"?}</code></div>
    <div class="endpoint"><strong>GET | PATCH | DELETE /api/sessions/:id</strong> 🔒 <code>{"title"}</code> for PATCH</div>
    <div class="endpoint"><strong>GET /api/sessions/:id/messages</strong> 🔒 oldest first</div>
    <div class="endpoint"><strong>POST /api/sessions/:id/messages</strong> 🔒 <code>{"role": "user" | "assistant", "content"}</code></div>

    <h2>Chat</h2>
    <div class="endpoint"><strong>POST /api/chat/respond</strong> 🔒 <code>{"prompt"}</code></div>
    <div class="endpoint"><strong>POST /api/chat/submit</strong> 🔒 <code>{"prompt", "session_id"?}</code></div>
    <div class="endpoint"><strong>WS /ws?token=&lt;jwt&gt;</strong><br>
        Commands: <code>submit</code>, <code>select_session</code>, <code>new_chat</code>,
        <code>delete_session</code>, <code>refresh</code>, <code>sign_out</code>.
        Events: <code>view</code>, <code>error</code>.</div>

    <h2>System</h2>
    <div class="endpoint"><strong>GET /api/status</strong></div>
</body>
</html>
"###;
