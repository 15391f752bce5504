//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for embedding text into vectors for semantic
//! retrieval, plus the cosine similarity the retrieval engine scores with.
//! Implementations (e.g., fastembed, OpenAI embeddings) live in
//! mentora-infra.

use mentora_types::error::RepositoryError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors.
    ///
    /// Returns one vector per input text, in input order.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, RepositoryError>> + Send;

    /// The model name used for embeddings (e.g., "bge-small-en-v1.5").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Returns 0.0 for mismatched lengths or zero-norm inputs, so degenerate
/// vectors never clear a positive similarity floor.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
