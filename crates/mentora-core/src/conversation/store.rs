//! ConversationStore trait definition.
//!
//! Read-only access to conversations and their messages. Implementations
//! live in mentora-infra (e.g., `SqliteConversationStore`).

use mentora_types::conversation::{Conversation, ConversationMessage};
use mentora_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for reading conversations during extraction.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ConversationStore: Send + Sync {
    /// All conversations for a learner, ordered by started_at ASC.
    fn conversations_for_learner(
        &self,
        learner_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Conversation>, RepositoryError>> + Send;

    /// Messages in a conversation strictly after the given message id,
    /// in chronological order. `None` means from the beginning.
    fn messages_after(
        &self,
        conversation_id: &Uuid,
        after: Option<Uuid>,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationMessage>, RepositoryError>> + Send;
}
