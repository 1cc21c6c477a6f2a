// src/handlers/chat.rs
use crate::chat::{Dashboard, DashboardView, SubmitOutcome};
use crate::error::ApiError;
use crate::handlers::auth::authenticate;
use crate::middleware::auth::auth_middleware;
use crate::models::auth::{AuthContext, CurrentUser};
use crate::models::chat::{PromptRequest, SubmitRequest};
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Commands a dashboard client sends over the socket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "submit")]
    Submit { prompt: String },
    #[serde(rename = "select_session")]
    SelectSession { session_id: Uuid },
    #[serde(rename = "new_chat")]
    NewChat,
    #[serde(rename = "delete_session")]
    DeleteSession { session_id: Uuid },
    #[serde(rename = "refresh")]
    Refresh,
    #[serde(rename = "sign_out")]
    SignOut,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "view")]
    View { view: DashboardView },
    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Deserialize)]
struct WebSocketQuery {
    token: Option<String>,
}

pub fn chat_routes() -> Router {
    // Browsers cannot set headers on a WebSocket handshake, so the socket
    // authenticates with a query parameter instead of the middleware.
    let socket_routes = Router::new().route("/ws", get(websocket_handler));

    let protected_routes = Router::new()
        .route("/api/chat/respond", post(respond))
        .route("/api/chat/submit", post(submit))
        .layer(axum::middleware::from_fn(auth_middleware));

    socket_routes.merge(protected_routes)
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WebSocketQuery>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let token = params
        .token
        .ok_or_else(|| ApiError::unauthorized("Missing token"))?;
    let user = authenticate(&token, &state.config.jwt_secret)?;

    Ok(ws
        .on_upgrade(move |socket| dashboard_socket(socket, state, user))
        .into_response())
}

async fn dashboard_socket(stream: WebSocket, state: Arc<AppState>, user: CurrentUser) {
    let (mut sender, mut receiver) = stream.split();
    tracing::info!(user_id = %user.id, "🔌 Dashboard connected");

    let (view_tx, mut view_rx) = mpsc::unbounded_channel::<DashboardView>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: views are pushed while a reply is still pending.
    let writer = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(view) = view_rx.recv() => ServerEvent::View { view },
                Some(event) = event_rx.recv() => event,
                else => break,
            };
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to serialize dashboard event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut subscription = state.changes.subscribe(user.id);
    let mut dashboard = Dashboard::new(
        state.store.clone(),
        state.responder.clone(),
        AuthContext::signed_in(user.clone()),
    )
    .with_updates(view_tx);
    dashboard.mount().await;

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(ClientCommand::SignOut) => {
                        tracing::info!(user_id = %user.id, "Dashboard signed out");
                        break;
                    }
                    Ok(command) => {
                        if let Err(message) = apply_command(&mut dashboard, command).await {
                            let _ = event_tx.send(ServerEvent::Error { message });
                        }
                    }
                    Err(e) => {
                        let _ = event_tx.send(ServerEvent::Error {
                            message: format!("Unrecognized command: {}", e),
                        });
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(user_id = %user.id, "Dashboard socket error: {}", e);
                    break;
                }
            },
            change = subscription.recv() => match change {
                Some(change) => dashboard.on_session_change(&change).await,
                None => break,
            },
        }
    }

    // Dropping the dashboard and the event sender lets the writer drain and exit.
    drop(dashboard);
    drop(event_tx);
    let _ = writer.await;
    tracing::info!(user_id = %user.id, "Dashboard disconnected");
}

/// Applies one client command; an `Err` carries a message for the client.
pub async fn apply_command(dashboard: &mut Dashboard, command: ClientCommand) -> Result<(), String> {
    match command {
        ClientCommand::Submit { prompt } => {
            dashboard.submit(&prompt).await;
        }
        ClientCommand::SelectSession { session_id } => {
            if !dashboard.select_session(session_id).await {
                return Err("Chat session not found".to_string());
            }
        }
        ClientCommand::NewChat => dashboard.new_chat(),
        ClientCommand::DeleteSession { session_id } => dashboard.delete_session(session_id).await,
        ClientCommand::Refresh => dashboard.refresh().await,
        ClientCommand::SignOut => {}
    }
    Ok(())
}

async fn respond(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<PromptRequest>,
) -> Result<Json<Value>, ApiError> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }

    let response = state.responder.respond(prompt).await?;
    Ok(Json(json!({
        "success": true,
        "response": response
    })))
}

/// One prompt through the full chat flow, for clients without a socket.
async fn submit(
    Extension(state): Extension<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<Value>, ApiError> {
    if payload.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }

    let mut dashboard = Dashboard::new(
        state.store.clone(),
        state.responder.clone(),
        AuthContext::signed_in(user),
    );
    if let Some(session_id) = payload.session_id {
        if !dashboard.select_session(session_id).await {
            return Err(ApiError::not_found("Chat session not found"));
        }
    }

    match dashboard.submit(&payload.prompt).await {
        SubmitOutcome::Replied(reply) => Ok(Json(json!({
            "success": true,
            "session_id": dashboard.active_session(),
            "reply": reply,
            "messages": dashboard.messages()
        }))),
        SubmitOutcome::Ignored => Err(ApiError::bad_request("Prompt is required")),
        SubmitOutcome::SessionUnavailable => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not create a chat session",
        )),
        SubmitOutcome::ReplyNotStored => Err(ApiError::internal()),
        SubmitOutcome::GenerationFailed => Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            "Failed to generate a response",
        )),
    }
}
