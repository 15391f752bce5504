//! Business logic and collaborator trait definitions for Mentora.
//!
//! This crate defines the "ports" (store and collaborator traits) that the
//! infrastructure layer implements, plus the two engines built on them:
//! the memory extraction pipeline and the retrieval & rank-fusion engine.
//! It depends only on `mentora-types` -- never on `mentora-infra` or any
//! database/IO crate.

pub mod conversation;
pub mod llm;
pub mod memory;
pub mod retrieval;
