//! MemoryStore trait definition.
//!
//! Primitive persistence operations for learner memories and extraction
//! cursors. All category-cardinality branching is a policy decision made
//! by the extraction pipeline; the store enforces nothing beyond
//! "superseded memories are excluded from the active-lookup queries".

use mentora_types::error::RepositoryError;
use mentora_types::memory::{Memory, MemoryCategory};
use uuid::Uuid;

/// Repository trait for learner memory persistence.
///
/// Implementations live in mentora-infra (e.g., `SqliteMemoryStore`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait MemoryStore: Send + Sync {
    /// Save a new memory.
    fn create_memory(
        &self,
        memory: &Memory,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The learner's active memory in a category, if any.
    ///
    /// Single-cardinality lookup: at most one active memory can exist per
    /// learner in such a category, so the newest active one is returned.
    fn find_active_by_category(
        &self,
        learner_id: &Uuid,
        category: MemoryCategory,
    ) -> impl std::future::Future<Output = Result<Option<Memory>, RepositoryError>> + Send;

    /// An active memory with byte-identical content in a category, if any.
    ///
    /// Multi-cardinality dedupe lookup used to decide between reinforcing
    /// and creating.
    fn find_active_by_content(
        &self,
        learner_id: &Uuid,
        category: MemoryCategory,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Option<Memory>, RepositoryError>> + Send;

    /// The most recently created active memories, newest first.
    fn list_recent(
        &self,
        learner_id: &Uuid,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Active memories with importance >= `min_importance`, importance DESC.
    fn list_high_importance(
        &self,
        learner_id: &Uuid,
        min_importance: u8,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// All active memories that carry an embedding.
    fn list_embedded(
        &self,
        learner_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Memory>, RepositoryError>> + Send;

    /// Mark a memory as superseded by a newer one.
    ///
    /// Fails with [`RepositoryError::NotFound`] if the memory does not
    /// exist or is already superseded -- that signals a caller bug or a
    /// mutation outside the documented serialization discipline.
    fn mark_superseded(
        &self,
        memory_id: &Uuid,
        successor_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Reinforce an existing active memory: increment its occurrence count
    /// and raise importance to `max(current, importance)`.
    ///
    /// Fails with [`RepositoryError::NotFound`] if the memory does not
    /// exist or is superseded.
    fn reinforce(
        &self,
        memory_id: &Uuid,
        importance: u8,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The conversation's extraction cursor (last processed message id).
    fn cursor(
        &self,
        conversation_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Uuid>, RepositoryError>> + Send;

    /// Advance the conversation's extraction cursor.
    ///
    /// Must be called only after the batch's memory writes have committed.
    fn advance_cursor(
        &self,
        conversation_id: &Uuid,
        last_message_id: Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
