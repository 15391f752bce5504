//! Shared domain types for Mentora.
//!
//! This crate contains the core domain types used across the learner memory
//! engine: memories and their categories, conversations, learner profiles,
//! and the LLM request/response shapes.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod conversation;
pub mod error;
pub mod learner;
pub mod llm;
pub mod memory;
