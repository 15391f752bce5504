//! Embedding backends for Mentora.
//!
//! Provides the default local fastembed implementation of the `Embedder`
//! trait from `mentora-core`.

pub mod fastembed;

pub use fastembed::FastembedEmbedder;
