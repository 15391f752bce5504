//! Memory retrieval and rank fusion for Mentora.
//!
//! Three independent candidate sets (recency, importance, semantic
//! similarity) are fetched per request and fused into one deduplicated,
//! score-ordered list, then rendered into prompt sections. Retrieval is
//! read-only and side-effect-free.

pub mod config;
pub mod context;
pub mod engine;
