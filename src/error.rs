// src/error.rs
use crate::models::auth::ErrorResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Chat session {0} not found")]
    SessionNotFound(Uuid),
    #[error("{0} already exists")]
    Conflict(String),
}

#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Responder request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Responder returned status {0}")]
    Status(u16),
    #[error("Responder returned an empty reply")]
    EmptyReply,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Error returned by HTTP handlers; renders as `{"success": false, "message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SessionNotFound(_) => ApiError::not_found("Chat session not found"),
            StoreError::Conflict(what) => ApiError::new(StatusCode::CONFLICT, format!("{} already exists", what)),
            StoreError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ApiError::internal()
            }
        }
    }
}

impl From<ResponderError> for ApiError {
    fn from(err: ResponderError) -> Self {
        tracing::error!("Response generation failed: {}", err);
        ApiError::new(StatusCode::BAD_GATEWAY, "Failed to generate a response")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                success: false,
                message: self.message,
            }),
        )
            .into_response()
    }
}
