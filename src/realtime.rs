// src/realtime.rs
//! Change notifications for chat session rows.
//!
//! Every insert, update or delete of a session is published on a process-wide
//! broadcast channel. Subscribers only see changes to their own user's rows.
//! With PostgreSQL the events originate from a table trigger (`pg_notify`) and
//! are forwarded by [`listen_postgres`]; the in-memory store publishes directly.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Channel name used by the `chat_sessions_notify` trigger.
pub const SESSION_CHANNEL: &str = "chat_sessions_changes";

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChange {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<SessionChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, change: SessionChange) {
        // No receivers is the normal idle state.
        let _ = self.sender.send(change);
    }

    /// Subscribes to changes of one user's sessions. Dropping the
    /// subscription unsubscribes.
    pub fn subscribe(&self, user_id: Uuid) -> SessionSubscription {
        SessionSubscription {
            user_id,
            receiver: self.sender.subscribe(),
        }
    }
}

pub struct SessionSubscription {
    user_id: Uuid,
    receiver: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    /// Waits for the next change to this user's sessions.
    ///
    /// Returns `None` once the feed is closed. If the subscriber fell behind,
    /// a synthetic update is returned so the caller refetches.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.user_id == self.user_id => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user_id, skipped, "session change subscriber lagged");
                    return Some(SessionChange {
                        user_id: self.user_id,
                        session_id: Uuid::nil(),
                        kind: ChangeKind::Update,
                    });
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

pub fn parse_notification(payload: &str) -> Result<SessionChange, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Forwards `chat_sessions_changes` notifications from PostgreSQL into the feed.
///
/// Runs until the task is aborted; connection failures are logged and retried
/// after a short pause.
pub async fn listen_postgres(pool: PgPool, feed: ChangeFeed) {
    loop {
        match forward_notifications(&pool, &feed).await {
            Ok(()) => tracing::warn!("Session change listener stopped, restarting"),
            Err(e) => tracing::error!("Session change listener failed: {}", e),
        }
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    }
}

async fn forward_notifications(pool: &PgPool, feed: &ChangeFeed) -> Result<(), sqlx::Error> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(SESSION_CHANNEL).await?;
    tracing::info!("Listening for session changes on '{}'", SESSION_CHANNEL);

    loop {
        let notification = listener.recv().await?;
        match parse_notification(notification.payload()) {
            Ok(change) => {
                tracing::debug!(user_id = %change.user_id, session_id = %change.session_id, kind = ?change.kind, "session change");
                feed.publish(change);
            }
            Err(e) => tracing::warn!("Ignoring malformed session notification: {}", e),
        }
    }
}
