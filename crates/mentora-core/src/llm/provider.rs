//! LlmProvider trait definition.
//!
//! The chat-completion contract the memory engine consumes. Implementations
//! (HTTP clients for specific vendors) live in the surrounding application;
//! this crate only defines the port.

use mentora_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for LLM provider backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
