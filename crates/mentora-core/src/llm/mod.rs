//! LLM provider abstraction.
//!
//! `LlmProvider` is the port the extraction pipeline calls through;
//! `BoxLlmProvider` erases the concrete implementation for runtime
//! selection.

pub mod box_provider;
pub mod provider;
