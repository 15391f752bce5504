use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in mentora-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from an extraction run.
///
/// Collaborator and persistence failures abort the learner's remaining
/// conversations; already-committed conversations stay committed, and the
/// failed conversation's cursor is left behind so the next run retries it.
/// Malformed model output is NOT an error -- it is handled inside the
/// pipeline as zero extracted memories.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("language model call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("store operation failed: {0}")]
    Store(#[from] RepositoryError),

    #[error("extraction cancelled")]
    Cancelled,
}
