// src/chat/messages.rs
use crate::models::chat::{ChatMessage, Role};
use crate::store::ChatStore;
use std::sync::Arc;
use uuid::Uuid;

/// Transcript of the selected session.
pub struct MessageList {
    store: Arc<dyn ChatStore>,
    session_id: Option<Uuid>,
    messages: Vec<ChatMessage>,
    loading: bool,
}

impl MessageList {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            session_id: None,
            messages: Vec::new(),
            loading: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Selects `session_id` and fetches its transcript.
    pub async fn load(&mut self, session_id: Option<Uuid>) {
        self.session_id = session_id;
        self.refresh().await;
    }

    /// Selects a session known to be empty without a round trip.
    pub fn attach(&mut self, session_id: Uuid) {
        self.session_id = Some(session_id);
        self.messages.clear();
    }

    pub async fn refresh(&mut self) {
        let Some(session_id) = self.session_id else {
            self.messages.clear();
            return;
        };

        self.loading = true;
        match self.store.list_messages(session_id).await {
            Ok(messages) => self.messages = messages,
            Err(e) => tracing::warn!(session_id = %session_id, "Failed to fetch messages: {}", e),
        }
        self.loading = false;
    }

    /// Stores a message in `target` (or the selected session) and appends it
    /// to the local transcript.
    pub async fn append(&mut self, role: Role, content: &str, target: Option<Uuid>) -> Option<ChatMessage> {
        let session_id = target.or(self.session_id)?;
        match self.store.append_message(session_id, role, content).await {
            Ok(message) => {
                self.messages.push(message.clone());
                Some(message)
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, role = role.as_str(), "Failed to store message: {}", e);
                None
            }
        }
    }

    /// Empties the local transcript; used for "new chat" before a session exists.
    pub fn clear(&mut self) {
        self.session_id = None;
        self.messages.clear();
    }
}
