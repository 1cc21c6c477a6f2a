// src/handlers/sessions.rs
use crate::error::ApiError;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::CurrentUser;
use crate::models::chat::{
    session_title, AppendMessageRequest, ChatSession, CreateSessionRequest, RenameSessionRequest,
    DEFAULT_SESSION_TITLE,
};
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub fn session_routes() -> Router {
    Router::new()
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/:session_id",
            get(get_session).patch(rename_session).delete(delete_session),
        )
        .route(
            "/api/sessions/:session_id/messages",
            get(list_messages).post(append_message),
        )
        .layer(axum::middleware::from_fn(auth_middleware))
}

/// Looks up a session owned by `user`; other users' sessions are reported as missing.
pub async fn owned_session(state: &AppState, user: &CurrentUser, session_id: Uuid) -> Result<ChatSession, ApiError> {
    match state.store.get_session(user.id, session_id).await? {
        Some(session) => Ok(session),
        None => {
            tracing::debug!(user_id = %user.id, session_id = %session_id, "Chat session not found for user");
            Err(ApiError::not_found("Chat session not found"))
        }
    }
}

async fn list_sessions(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let sessions = state.store.list_sessions(user.id).await?;
    Ok(Json(json!({
        "success": true,
        "sessions": sessions
    })))
}

async fn get_session(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let session = owned_session(&state, &user, session_id).await?;
    Ok(Json(json!({
        "success": true,
        "session": session
    })))
}

async fn create_session(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let title = payload
        .title
        .as_deref()
        .map(session_title)
        .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());

    let session = state.store.create_session(user.id, &title).await?;
    tracing::info!(user_id = %user.id, session_id = %session.id, "Created chat session");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "session": session
        })),
    ))
}

async fn rename_session(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<RenameSessionRequest>,
) -> Result<Json<Value>, ApiError> {
    let session = state
        .store
        .rename_session(user.id, session_id, &session_title(&payload.title))
        .await?;
    Ok(Json(json!({
        "success": true,
        "session": session
    })))
}

async fn delete_session(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_session(user.id, session_id).await?;
    tracing::info!(user_id = %user.id, session_id = %session_id, "Deleted chat session");
    Ok(Json(json!({
        "success": true,
        "session_id": session_id
    })))
}

async fn list_messages(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    owned_session(&state, &user, session_id).await?;
    let messages = state.store.list_messages(session_id).await?;
    Ok(Json(json!({
        "success": true,
        "session_id": session_id,
        "messages": messages
    })))
}

async fn append_message(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<AppendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::bad_request("Message content is required"));
    }
    owned_session(&state, &user, session_id).await?;

    let message = state
        .store
        .append_message(session_id, payload.role, &payload.content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": message
        })),
    ))
}
