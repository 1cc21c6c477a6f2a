use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// Entries are swept once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    // client key -> (request_count, window_start)
    clients: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimiter {
    /// 10 requests per minute, applied to the auth endpoints.
    pub fn strict() -> Self {
        Self::new(10, 60)
    }

    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window_duration: Duration::from_secs(window_seconds),
        }
    }

    pub fn check_rate_limit(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());

        if clients.len() > SWEEP_THRESHOLD {
            let window = self.window_duration;
            clients.retain(|_, (_, window_start)| now.duration_since(*window_start) <= window);
        }

        match clients.get_mut(client) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) > self.window_duration {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                clients.insert(client.to_string(), (1, now));
                true
            }
        }
    }
}

/// Limits sign-in and registration attempts per client IP using the
/// limiter held in [`AppState`].
pub async fn strict_rate_limit_middleware(
    Extension(state): Extension<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let rate_limiter = &state.auth_limiter;

    let client_ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !rate_limiter.check_rate_limit(&client_ip) {
        tracing::warn!("Strict rate limit exceeded for IP: {}", client_ip);
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded for sensitive operations. Please try again later.",
        ));
    }

    Ok(next.run(request).await)
}
