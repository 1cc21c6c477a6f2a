// lib.rs - People's Voice chat service
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod responder;
pub mod store;

use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state handed to every handler through an `Extension` layer.
pub struct AppState {
    pub store: Arc<dyn store::ChatStore>,
    pub accounts: Arc<dyn store::AccountStore>,
    pub responder: Arc<dyn responder::Responder>,
    pub changes: realtime::ChangeFeed,
    pub auth_limiter: middleware::rate_limit::RateLimiter,
    pub config: config::AppConfig,
}

impl AppState {
    /// State backed by a single in-memory store; used by tests and local demos.
    pub fn in_memory(config: config::AppConfig, responder: Arc<dyn responder::Responder>) -> Self {
        let changes = realtime::ChangeFeed::new();
        let backend = Arc::new(store::MemoryStore::with_feed(changes.clone()));
        AppState {
            store: backend.clone(),
            accounts: backend,
            responder,
            changes,
            auth_limiter: middleware::rate_limit::RateLimiter::strict(),
            config,
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::auth::auth_routes())
        .merge(handlers::sessions::session_routes())
        .merge(handlers::chat::chat_routes())
        .merge(handlers::status::status_routes())
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
