//! SQLite memory store implementation.
//!
//! Implements `MemoryStore` from `mentora-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, rfc3339 datetime
//! columns. Embeddings are serialized as little-endian f32 blobs; the
//! domain type only ever sees `Vec<f32>`.

use mentora_core::memory::store::MemoryStore;
use mentora_types::error::RepositoryError;
use mentora_types::memory::{Memory, MemoryCategory};
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MemoryStore`.
pub struct SqliteMemoryStore {
    pool: DatabasePool,
}

impl SqliteMemoryStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Embedding blob codec
// ---------------------------------------------------------------------------

/// Serialize an embedding vector to a little-endian f32 blob.
fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for value in embedding {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Deserialize a little-endian f32 blob back into an embedding vector.
fn blob_to_embedding(blob: &[u8]) -> Result<Vec<f32>, RepositoryError> {
    if blob.len() % 4 != 0 {
        return Err(RepositoryError::Query(format!(
            "embedding blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Memory.
struct MemoryRow {
    id: String,
    learner_id: String,
    conversation_id: String,
    category: String,
    content: String,
    importance: i64,
    embedding: Option<Vec<u8>>,
    occurrence_count: i64,
    superseded_by: Option<String>,
    created_at: String,
}

impl MemoryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            learner_id: row.try_get("learner_id")?,
            conversation_id: row.try_get("conversation_id")?,
            category: row.try_get("category")?,
            content: row.try_get("content")?,
            importance: row.try_get("importance")?,
            embedding: row.try_get("embedding")?,
            occurrence_count: row.try_get("occurrence_count")?,
            superseded_by: row.try_get("superseded_by")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_memory(self) -> Result<Memory, RepositoryError> {
        let id = parse_uuid(&self.id, "memory id")?;
        let learner_id = parse_uuid(&self.learner_id, "learner_id")?;
        let conversation_id = parse_uuid(&self.conversation_id, "conversation_id")?;
        let category: MemoryCategory = self
            .category
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let embedding = self
            .embedding
            .as_deref()
            .map(blob_to_embedding)
            .transpose()?;
        let superseded_by = self
            .superseded_by
            .as_deref()
            .map(|s| parse_uuid(s, "superseded_by"))
            .transpose()?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Memory {
            id,
            learner_id,
            conversation_id,
            category,
            content: self.content,
            importance: self.importance as u8,
            embedding,
            occurrence_count: self.occurrence_count as u32,
            superseded_by,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str, field: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {field}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn rows_to_memories(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Memory>, RepositoryError> {
    let mut memories = Vec::with_capacity(rows.len());
    for row in rows {
        let memory_row =
            MemoryRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        memories.push(memory_row.into_memory()?);
    }
    Ok(memories)
}

// ---------------------------------------------------------------------------
// MemoryStore implementation
// ---------------------------------------------------------------------------

impl MemoryStore for SqliteMemoryStore {
    async fn create_memory(&self, memory: &Memory) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO memories (id, learner_id, conversation_id, category, content, importance, embedding, occurrence_count, superseded_by, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(memory.id.to_string())
        .bind(memory.learner_id.to_string())
        .bind(memory.conversation_id.to_string())
        .bind(memory.category.to_string())
        .bind(&memory.content)
        .bind(memory.importance as i64)
        .bind(memory.embedding.as_deref().map(embedding_to_blob))
        .bind(memory.occurrence_count as i64)
        .bind(memory.superseded_by.map(|id| id.to_string()))
        .bind(format_datetime(&memory.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn find_active_by_category(
        &self,
        learner_id: &Uuid,
        category: MemoryCategory,
    ) -> Result<Option<Memory>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT * FROM memories
               WHERE learner_id = ? AND category = ? AND superseded_by IS NULL
               ORDER BY id DESC
               LIMIT 1"#,
        )
        .bind(learner_id.to_string())
        .bind(category.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let memory_row =
                    MemoryRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(memory_row.into_memory()?))
            }
            None => Ok(None),
        }
    }

    async fn find_active_by_content(
        &self,
        learner_id: &Uuid,
        category: MemoryCategory,
        content: &str,
    ) -> Result<Option<Memory>, RepositoryError> {
        // TEXT equality in SQLite uses BINARY collation: byte-identical
        // content, as the dedupe rule requires.
        let row = sqlx::query(
            r#"SELECT * FROM memories
               WHERE learner_id = ? AND category = ? AND content = ? AND superseded_by IS NULL
               LIMIT 1"#,
        )
        .bind(learner_id.to_string())
        .bind(category.to_string())
        .bind(content)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let memory_row =
                    MemoryRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(memory_row.into_memory()?))
            }
            None => Ok(None),
        }
    }

    async fn list_recent(
        &self,
        learner_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<Memory>, RepositoryError> {
        // Ids are UUIDv7, so id DESC is creation order newest-first even
        // when created_at timestamps collide.
        let rows = sqlx::query(
            r#"SELECT * FROM memories
               WHERE learner_id = ? AND superseded_by IS NULL
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(learner_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_memories(&rows)
    }

    async fn list_high_importance(
        &self,
        learner_id: &Uuid,
        min_importance: u8,
        limit: usize,
    ) -> Result<Vec<Memory>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM memories
               WHERE learner_id = ? AND superseded_by IS NULL AND importance >= ?
               ORDER BY importance DESC, created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(learner_id.to_string())
        .bind(min_importance as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_memories(&rows)
    }

    async fn list_embedded(&self, learner_id: &Uuid) -> Result<Vec<Memory>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM memories
               WHERE learner_id = ? AND superseded_by IS NULL AND embedding IS NOT NULL"#,
        )
        .bind(learner_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows_to_memories(&rows)
    }

    async fn mark_superseded(
        &self,
        memory_id: &Uuid,
        successor_id: &Uuid,
    ) -> Result<(), RepositoryError> {
        // The predicate refuses to re-supersede: a missing or already
        // superseded target signals a caller bug.
        let result = sqlx::query(
            "UPDATE memories SET superseded_by = ? WHERE id = ? AND superseded_by IS NULL",
        )
        .bind(successor_id.to_string())
        .bind(memory_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn reinforce(&self, memory_id: &Uuid, importance: u8) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE memories
               SET occurrence_count = occurrence_count + 1,
                   importance = MAX(importance, ?)
               WHERE id = ? AND superseded_by IS NULL"#,
        )
        .bind(importance as i64)
        .bind(memory_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn cursor(&self, conversation_id: &Uuid) -> Result<Option<Uuid>, RepositoryError> {
        let row = sqlx::query(
            "SELECT last_processed_message_id FROM extraction_cursors WHERE conversation_id = ?",
        )
        .bind(conversation_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let id: String = row
                    .try_get("last_processed_message_id")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(parse_uuid(&id, "last_processed_message_id")?))
            }
            None => Ok(None),
        }
    }

    async fn advance_cursor(
        &self,
        conversation_id: &Uuid,
        last_message_id: Uuid,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO extraction_cursors (conversation_id, last_processed_message_id, updated_at)
               VALUES (?, ?, ?)
               ON CONFLICT(conversation_id) DO UPDATE SET
                   last_processed_message_id = excluded.last_processed_message_id,
                   updated_at = excluded.updated_at"#,
        )
        .bind(conversation_id.to_string())
        .bind(last_message_id.to_string())
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}
