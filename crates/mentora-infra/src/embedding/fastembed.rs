//! FastEmbed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `mentora-core` using fastembed's
//! BGESmallENV15 model (384 dimensions) with ONNX runtime inference.
//! Inference is CPU-bound and synchronous, so calls run on the blocking
//! thread pool; the model itself is behind a mutex because ONNX sessions
//! are not re-entrant.

use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use mentora_core::memory::embedder::Embedder;
use mentora_types::error::RepositoryError;

/// Dimensionality of BGESmallENV15 vectors.
pub const EMBEDDING_DIMENSION: usize = 384;

const MODEL_NAME: &str = "bge-small-en-v1.5";

/// Local embedding backend running BGESmallENV15 via ONNX.
///
/// The model is downloaded to the fastembed cache on first use.
pub struct FastembedEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastembedEmbedder {
    /// Initialize the local model, downloading it if not cached.
    pub fn new() -> Result<Self, RepositoryError> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false),
        )
        .map_err(|e| RepositoryError::Query(format!("failed to initialize embedding model: {e}")))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Embedder for FastembedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RepositoryError::Query("embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| RepositoryError::Query(format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| RepositoryError::Query(format!("embedding task panicked: {e}")))?
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION
    }
}
