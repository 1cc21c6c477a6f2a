// src/chat/sessions.rs
use crate::models::auth::AuthContext;
use crate::models::chat::ChatSession;
use crate::realtime::SessionChange;
use crate::store::ChatStore;
use std::sync::Arc;
use uuid::Uuid;

/// The signed-in user's session list, kept in step with the backend.
///
/// Backend failures leave the cached list untouched and are only logged.
/// Every operation is a no-op when nobody is signed in.
pub struct SessionList {
    store: Arc<dyn ChatStore>,
    auth: AuthContext,
    sessions: Vec<ChatSession>,
    loading: bool,
}

impl SessionList {
    pub fn new(store: Arc<dyn ChatStore>, auth: AuthContext) -> Self {
        Self {
            store,
            auth,
            sessions: Vec::new(),
            loading: true,
        }
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn find(&self, id: Uuid) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Reloads the list; returns false when the backend call failed.
    pub async fn refresh(&mut self) -> bool {
        let Some(owner) = self.auth.user_id() else {
            self.sessions.clear();
            self.loading = false;
            return true;
        };

        let fetched = match self.store.list_sessions(owner).await {
            Ok(sessions) => {
                self.sessions = sessions;
                true
            }
            Err(e) => {
                tracing::warn!(user_id = %owner, "Failed to fetch chat sessions: {}", e);
                false
            }
        };
        self.loading = false;
        fetched
    }

    /// Creates a session and returns its id.
    pub async fn create(&mut self, title: &str) -> Option<Uuid> {
        let owner = self.auth.user_id()?;
        match self.store.create_session(owner, title).await {
            Ok(session) => {
                tracing::info!(user_id = %owner, session_id = %session.id, "Created chat session");
                self.refresh().await;
                Some(session.id)
            }
            Err(e) => {
                tracing::warn!(user_id = %owner, "Failed to create chat session: {}", e);
                None
            }
        }
    }

    pub async fn rename(&mut self, id: Uuid, title: &str) {
        let Some(owner) = self.auth.user_id() else {
            return;
        };
        match self.store.rename_session(owner, id, title).await {
            Ok(_) => {
                self.refresh().await;
            }
            Err(e) => tracing::warn!(session_id = %id, "Failed to rename chat session: {}", e),
        }
    }

    pub async fn delete(&mut self, id: Uuid) {
        let Some(owner) = self.auth.user_id() else {
            return;
        };
        match self.store.delete_session(owner, id).await {
            Ok(()) => {
                tracing::info!(user_id = %owner, session_id = %id, "Deleted chat session");
                self.refresh().await;
            }
            Err(e) => tracing::warn!(session_id = %id, "Failed to delete chat session: {}", e),
        }
    }

    /// Whether a change notification concerns this list.
    pub fn is_affected_by(&self, change: &SessionChange) -> bool {
        self.auth.user_id() == Some(change.user_id)
    }
}
