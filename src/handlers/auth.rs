use crate::error::{ApiError, StoreError};
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::strict_rate_limit_middleware;
use crate::models::auth::*;
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    routing::{get, post, Router},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

const MIN_PASSWORD_LEN: usize = 6;

pub fn auth_routes() -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .layer(axum::middleware::from_fn(strict_rate_limit_middleware));

    let protected_routes = Router::new()
        .route("/api/auth/verify", get(verify_token))
        .layer(axum::middleware::from_fn(auth_middleware));

    public_routes.merge(protected_routes)
}

async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password must be at least 6 characters long"));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Error hashing password: {}", e);
        ApiError::internal()
    })?;

    let display_name = payload
        .display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let user = state
        .accounts
        .create_user(NewUser {
            email,
            display_name,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                ApiError::new(StatusCode::CONFLICT, "User with this email already exists")
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "Registered new user");
    let token = generate_jwt_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "User registered successfully".to_string(),
        user: UserResponse::from(user),
        token,
    }))
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let Some(user) = state.accounts.find_user_by_email(&email).await? else {
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::unauthorized("Invalid email or password")),
        Err(e) => {
            tracing::error!("Error verifying password: {}", e);
            return Err(ApiError::internal());
        }
    }

    let token = generate_jwt_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_string(),
        user: UserResponse::from(user),
        token,
    }))
}

async fn verify_token(
    Extension(state): Extension<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(user) = state.accounts.find_user(current.id).await? else {
        return Err(ApiError::unauthorized("User not found"));
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "user": UserResponse::from(user)
    })))
}

pub fn generate_jwt_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, ApiError> {
    let now = Utc::now();
    let expiration = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            tracing::error!("JWT lifetime of {} hours is out of range", ttl_hours);
            ApiError::internal()
        })?
        .timestamp();

    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        display_name: user.display_name.clone(),
        exp: expiration as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        tracing::error!("Error generating JWT token: {}", e);
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate authentication token",
        )
    })
}

pub fn verify_jwt_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Resolves a bearer token to the user it was issued for.
pub fn authenticate(token: &str, secret: &str) -> Result<CurrentUser, ApiError> {
    let claims = verify_jwt_token(token, secret).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    CurrentUser::try_from(&claims).map_err(|_| ApiError::unauthorized("Invalid or expired token"))
}
