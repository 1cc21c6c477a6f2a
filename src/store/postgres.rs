// src/store/postgres.rs
use super::{AccountStore, ChatStore};
use crate::error::StoreError;
use crate::models::auth::{NewUser, User};
use crate::models::chat::{ChatMessage, ChatSession, Role};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL backend. Change notifications come from the `chat_sessions`
/// trigger, so this type never publishes to the feed itself.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn list_sessions(&self, owner: Uuid) -> Result<Vec<ChatSession>, StoreError> {
        let sessions = sqlx::query_as::<_, ChatSession>(
            "SELECT id, user_id, title, created_at, updated_at
             FROM chat_sessions
             WHERE user_id = $1
             ORDER BY updated_at DESC, created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    async fn get_session(&self, owner: Uuid, id: Uuid) -> Result<Option<ChatSession>, StoreError> {
        let session = sqlx::query_as::<_, ChatSession>(
            "SELECT id, user_id, title, created_at, updated_at
             FROM chat_sessions
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn create_session(&self, owner: Uuid, title: &str) -> Result<ChatSession, StoreError> {
        let session = sqlx::query_as::<_, ChatSession>(
            "INSERT INTO chat_sessions (user_id, title, created_at, updated_at)
             VALUES ($1, $2, NOW(), NOW())
             RETURNING id, user_id, title, created_at, updated_at",
        )
        .bind(owner)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn rename_session(&self, owner: Uuid, id: Uuid, title: &str) -> Result<ChatSession, StoreError> {
        sqlx::query_as::<_, ChatSession>(
            "UPDATE chat_sessions
             SET title = $1, updated_at = NOW()
             WHERE id = $2 AND user_id = $3
             RETURNING id, user_id, title, created_at, updated_at",
        )
        .bind(title)
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::SessionNotFound(id))
    }

    async fn delete_session(&self, owner: Uuid, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SessionNotFound(id));
        }
        Ok(())
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT id, session_id, role, content, created_at
             FROM chat_messages
             WHERE session_id = $1
             ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn append_message(&self, session_id: Uuid, role: Role, content: &str) -> Result<ChatMessage, StoreError> {
        let inserted = sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO chat_messages (session_id, role, content)
             VALUES ($1, $2, $3)
             RETURNING id, session_id, role, content, created_at",
        )
        .bind(session_id)
        .bind(role)
        .bind(content)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(message) => Ok(message),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(StoreError::SessionNotFound(session_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let inserted = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, display_name, password_hash, created_at)
             VALUES ($1, $2, $3, NOW())
             RETURNING id, email, display_name, password_hash, created_at",
        )
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(format!("User with email {}", user.email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, display_name, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, display_name, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
