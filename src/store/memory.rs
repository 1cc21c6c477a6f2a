// src/store/memory.rs
//! In-process backend used by tests and for running without a database.

use super::{AccountStore, ChatStore};
use crate::error::StoreError;
use crate::models::auth::{NewUser, User};
use crate::models::chat::{ChatMessage, ChatSession, Role};
use crate::realtime::{ChangeFeed, ChangeKind, SessionChange};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
struct SessionRow {
    session: ChatSession,
    // Breaks `updated_at` ties; bumped on every write to the row.
    touched: u64,
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, SessionRow>,
    messages: Vec<ChatMessage>,
    clock: u64,
}

impl Tables {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn owned(&self, owner: Uuid, id: Uuid) -> Option<&SessionRow> {
        self.sessions.get(&id).filter(|row| row.session.user_id == owner)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: Option<ChangeFeed>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes session changes to `feed`, mirroring the database trigger.
    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            feed: Some(feed),
        }
    }

    fn notify(&self, user_id: Uuid, session_id: Uuid, kind: ChangeKind) {
        if let Some(feed) = &self.feed {
            feed.publish(SessionChange {
                user_id,
                session_id,
                kind,
            });
        }
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn list_sessions(&self, owner: Uuid) -> Result<Vec<ChatSession>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&SessionRow> = tables
            .sessions
            .values()
            .filter(|row| row.session.user_id == owner)
            .collect();
        rows.sort_by(|a, b| {
            b.session
                .updated_at
                .cmp(&a.session.updated_at)
                .then(b.touched.cmp(&a.touched))
        });
        Ok(rows.into_iter().map(|row| row.session.clone()).collect())
    }

    async fn get_session(&self, owner: Uuid, id: Uuid) -> Result<Option<ChatSession>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.owned(owner, id).map(|row| row.session.clone()))
    }

    async fn create_session(&self, owner: Uuid, title: &str) -> Result<ChatSession, StoreError> {
        let now = Utc::now();
        let session = ChatSession {
            id: Uuid::new_v4(),
            user_id: owner,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        {
            let mut tables = self.tables.write().await;
            let touched = tables.tick();
            tables.sessions.insert(
                session.id,
                SessionRow {
                    session: session.clone(),
                    touched,
                },
            );
        }
        self.notify(owner, session.id, ChangeKind::Insert);
        Ok(session)
    }

    async fn rename_session(&self, owner: Uuid, id: Uuid, title: &str) -> Result<ChatSession, StoreError> {
        let renamed = {
            let mut tables = self.tables.write().await;
            if tables.owned(owner, id).is_none() {
                return Err(StoreError::SessionNotFound(id));
            }
            let touched = tables.tick();
            let row = tables
                .sessions
                .get_mut(&id)
                .ok_or(StoreError::SessionNotFound(id))?;
            row.session.title = title.to_string();
            row.session.updated_at = Utc::now().max(row.session.updated_at);
            row.touched = touched;
            row.session.clone()
        };
        self.notify(owner, id, ChangeKind::Update);
        Ok(renamed)
    }

    async fn delete_session(&self, owner: Uuid, id: Uuid) -> Result<(), StoreError> {
        {
            let mut tables = self.tables.write().await;
            if tables.owned(owner, id).is_none() {
                return Err(StoreError::SessionNotFound(id));
            }
            tables.sessions.remove(&id);
            tables.messages.retain(|m| m.session_id != id);
        }
        self.notify(owner, id, ChangeKind::Delete);
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let tables = self.tables.read().await;
        let mut messages: Vec<ChatMessage> = tables
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn append_message(&self, session_id: Uuid, role: Role, content: &str) -> Result<ChatMessage, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(&session_id) {
            return Err(StoreError::SessionNotFound(session_id));
        }
        let message = ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("User with email {}", user.email)));
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            display_name: user.display_name,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }
}
