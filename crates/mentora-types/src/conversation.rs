//! Conversation types for Mentora.
//!
//! The conversation store itself is owned by the surrounding application;
//! these types define the shape the memory engine reads through the
//! `ConversationStore` collaborator contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export MessageRole from the llm module (used in both contexts).
pub use crate::llm::MessageRole;

/// A coaching conversation between a learner and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub started_at: DateTime<Utc>,
}

/// A single message within a conversation.
///
/// Ids are UUIDv7, so message ids sort chronologically; the extraction
/// cursor depends on this when fetching messages strictly after a given id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
