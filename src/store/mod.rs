// src/store/mod.rs
//! Backend collaborator: persistence for accounts, chat sessions and messages.

use crate::error::StoreError;
use crate::models::auth::{NewUser, User};
use crate::models::chat::{ChatMessage, ChatSession, Role};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Session and message persistence, scoped by owning user where rows have one.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Sessions of `owner`, most recently updated first.
    async fn list_sessions(&self, owner: Uuid) -> Result<Vec<ChatSession>, StoreError>;

    async fn get_session(&self, owner: Uuid, id: Uuid) -> Result<Option<ChatSession>, StoreError>;

    async fn create_session(&self, owner: Uuid, title: &str) -> Result<ChatSession, StoreError>;

    /// Sets the title and bumps `updated_at`.
    async fn rename_session(&self, owner: Uuid, id: Uuid, title: &str) -> Result<ChatSession, StoreError>;

    /// Deletes the session together with its messages.
    async fn delete_session(&self, owner: Uuid, id: Uuid) -> Result<(), StoreError>;

    /// Messages of a session, oldest first.
    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, StoreError>;

    async fn append_message(&self, session_id: Uuid, role: Role, content: &str) -> Result<ChatMessage, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}
