//! SQLite conversation store implementation.
//!
//! Read-only adapter over the conversation tables the surrounding
//! application writes. Message ids are UUIDv7 strings, so the "strictly
//! after" cursor fetch is a lexicographic id comparison.

use mentora_core::conversation::store::ConversationStore;
use mentora_types::conversation::{Conversation, ConversationMessage, MessageRole};
use mentora_types::error::RepositoryError;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationStore`.
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_uuid(s: &str, field: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {field}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

impl ConversationStore for SqliteConversationStore {
    async fn conversations_for_learner(
        &self,
        learner_id: &Uuid,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, learner_id, started_at FROM conversations WHERE learner_id = ? ORDER BY started_at ASC, id ASC",
        )
        .bind(learner_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let learner: String = row
                .try_get("learner_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let started_at: String = row
                .try_get("started_at")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            conversations.push(Conversation {
                id: parse_uuid(&id, "conversation id")?,
                learner_id: parse_uuid(&learner, "learner_id")?,
                started_at: parse_datetime(&started_at)?,
            });
        }

        Ok(conversations)
    }

    async fn messages_after(
        &self,
        conversation_id: &Uuid,
        after: Option<Uuid>,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        let rows = match after {
            Some(after) => {
                sqlx::query(
                    "SELECT * FROM conversation_messages WHERE conversation_id = ? AND id > ? ORDER BY id ASC",
                )
                .bind(conversation_id.to_string())
                .bind(after.to_string())
                .fetch_all(&self.pool.reader)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM conversation_messages WHERE conversation_id = ? ORDER BY id ASC",
                )
                .bind(conversation_id.to_string())
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let conversation: String = row
                .try_get("conversation_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let role: String = row
                .try_get("role")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let content: String = row
                .try_get("content")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let created_at: String = row
                .try_get("created_at")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

            let role: MessageRole = role.parse().map_err(|e: String| RepositoryError::Query(e))?;

            messages.push(ConversationMessage {
                id: parse_uuid(&id, "message id")?,
                conversation_id: parse_uuid(&conversation, "conversation_id")?,
                role,
                content,
                created_at: parse_datetime(&created_at)?,
            });
        }

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn setup_learner_and_conversation(pool: &DatabasePool) -> (Uuid, Uuid) {
        let learner_id = Uuid::now_v7();
        let conversation_id = Uuid::now_v7();

        sqlx::query("INSERT INTO learners (id, display_name, created_at) VALUES (?, ?, ?)")
            .bind(learner_id.to_string())
            .bind("Test Learner")
            .bind(Utc::now().to_rfc3339())
            .execute(&pool.writer)
            .await
            .unwrap();

        sqlx::query("INSERT INTO conversations (id, learner_id, started_at) VALUES (?, ?, ?)")
            .bind(conversation_id.to_string())
            .bind(learner_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&pool.writer)
            .await
            .unwrap();

        (learner_id, conversation_id)
    }

    async fn insert_message(
        pool: &DatabasePool,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO conversation_messages (id, conversation_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(conversation_id.to_string())
        .bind(role.to_string())
        .bind(content)
        .bind(Utc::now().to_rfc3339())
        .execute(&pool.writer)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_conversations_for_learner() {
        let pool = test_pool().await;
        let store = SqliteConversationStore::new(pool.clone());
        let (learner_id, conversation_id) = setup_learner_and_conversation(&pool).await;

        let conversations = store.conversations_for_learner(&learner_id).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].id, conversation_id);
        assert_eq!(conversations[0].learner_id, learner_id);

        // Unknown learner has none
        let none = store
            .conversations_for_learner(&Uuid::now_v7())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_messages_after_none_returns_all_in_order() {
        let pool = test_pool().await;
        let store = SqliteConversationStore::new(pool.clone());
        let (_, conversation_id) = setup_learner_and_conversation(&pool).await;

        let first = insert_message(&pool, conversation_id, MessageRole::User, "first").await;
        let second = insert_message(&pool, conversation_id, MessageRole::Assistant, "second").await;

        let messages = store.messages_after(&conversation_id, None).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, first);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].id, second);
        assert_eq!(messages[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_messages_after_cursor_is_strictly_after() {
        let pool = test_pool().await;
        let store = SqliteConversationStore::new(pool.clone());
        let (_, conversation_id) = setup_learner_and_conversation(&pool).await;

        let first = insert_message(&pool, conversation_id, MessageRole::User, "first").await;
        let second = insert_message(&pool, conversation_id, MessageRole::Assistant, "second").await;
        let third = insert_message(&pool, conversation_id, MessageRole::User, "third").await;

        let after_first = store
            .messages_after(&conversation_id, Some(first))
            .await
            .unwrap();
        assert_eq!(after_first.len(), 2);
        assert_eq!(after_first[0].id, second);
        assert_eq!(after_first[1].id, third);

        let after_third = store
            .messages_after(&conversation_id, Some(third))
            .await
            .unwrap();
        assert!(after_third.is_empty());
    }
}
