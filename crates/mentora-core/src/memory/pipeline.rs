//! Memory extraction pipeline.
//!
//! Walks every conversation of a learner whose extraction cursor is behind
//! the latest message, asks the LLM for structured facts, and applies the
//! category write policy: single-cardinality facts supersede the prior
//! active memory, multi-cardinality facts reinforce on byte-identical
//! content or create a new memory with a fresh embedding.
//!
//! Conversations are processed sequentially; a collaborator or store
//! failure aborts the remaining conversations for this run. The failed
//! conversation's cursor stays behind, so the next scheduled run retries
//! it (at-least-once; reinforcement and supersession absorb replays).

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use mentora_types::conversation::ConversationMessage;
use mentora_types::error::{ExtractionError, RepositoryError};
use mentora_types::llm::{CompletionRequest, Message, MessageRole};
use mentora_types::memory::{CardinalityClass, ExtractionReport, Memory};

use crate::conversation::store::ConversationStore;
use crate::llm::box_provider::BoxLlmProvider;

use super::box_embedder::BoxEmbedder;
use super::extractor::{
    build_extraction_prompt, parse_extraction, render_transcript, ExtractedFact, ParseOutcome,
    EXTRACTION_SYSTEM_PROMPT,
};
use super::store::MemoryStore;

/// Token ceiling for the extraction completion.
const EXTRACTION_MAX_TOKENS: u32 = 1024;

/// Extraction pipeline over a memory store and a conversation store.
///
/// The LLM provider and embedder are type-erased so the surrounding
/// application can pick backends at runtime.
pub struct MemoryPipeline<M, C> {
    store: M,
    conversations: C,
    llm: BoxLlmProvider,
    embedder: BoxEmbedder,
}

impl<M: MemoryStore, C: ConversationStore> MemoryPipeline<M, C> {
    pub fn new(store: M, conversations: C, llm: BoxLlmProvider, embedder: BoxEmbedder) -> Self {
        Self {
            store,
            conversations,
            llm,
            embedder,
        }
    }

    /// Run extraction for one learner.
    ///
    /// Iterates the learner's conversations sequentially, skipping those
    /// whose cursor is already current. Returns counters for observability.
    #[tracing::instrument(
        name = "extract_memories",
        skip(self, cancel),
        fields(learner_id = %learner_id)
    )]
    pub async fn run_for_learner(
        &self,
        learner_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<ExtractionReport, ExtractionError> {
        let mut report = ExtractionReport::default();

        for conversation in self.conversations.conversations_for_learner(&learner_id).await? {
            if cancel.is_cancelled() {
                return Err(ExtractionError::Cancelled);
            }

            let cursor = self.store.cursor(&conversation.id).await?;
            let messages = self
                .conversations
                .messages_after(&conversation.id, cursor)
                .await?;
            let Some(last_message) = messages.last() else {
                // Cursor already current.
                continue;
            };
            let last_message_id = last_message.id;

            let (created, reinforced) = self
                .process_conversation(learner_id, conversation.id, &messages, cancel)
                .await?;

            // The cursor advances even when the batch yielded nothing: the
            // messages were seen. Ordered strictly after the memory writes.
            self.store
                .advance_cursor(&conversation.id, last_message_id)
                .await?;

            report.conversations_processed += 1;
            report.memories_created += created;
            report.memories_reinforced += reinforced;
        }

        tracing::info!(
            conversations = report.conversations_processed,
            created = report.memories_created,
            reinforced = report.memories_reinforced,
            "extraction run complete"
        );

        Ok(report)
    }

    /// Extract and persist facts for one conversation's unprocessed messages.
    ///
    /// Returns (created, reinforced) counts. The cursor is NOT advanced
    /// here; the caller does that after this returns.
    async fn process_conversation(
        &self,
        learner_id: Uuid,
        conversation_id: Uuid,
        messages: &[ConversationMessage],
        cancel: &CancellationToken,
    ) -> Result<(u32, u32), ExtractionError> {
        let transcript = render_transcript(messages);
        let request = CompletionRequest {
            model: String::new(), // Provider uses its default model
            messages: vec![Message {
                role: MessageRole::User,
                content: build_extraction_prompt(&transcript),
            }],
            system: Some(EXTRACTION_SYSTEM_PROMPT.to_string()),
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: Some(0.0),
        };

        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        let response = self.llm.complete(&request).await?;

        let facts = match parse_extraction(&response.content) {
            ParseOutcome::Parsed(parsed) => parsed.facts,
            ParseOutcome::Failure => Vec::new(),
        };

        let mut created = 0u32;
        let mut reinforced = 0u32;

        for fact in facts {
            match fact.category.cardinality() {
                CardinalityClass::Single => {
                    let prior = self
                        .store
                        .find_active_by_category(&learner_id, fact.category)
                        .await?;
                    let memory = self
                        .new_memory(learner_id, conversation_id, &fact, cancel)
                        .await?;
                    let successor_id = memory.id;
                    self.store.create_memory(&memory).await?;
                    if let Some(prior) = prior {
                        self.store.mark_superseded(&prior.id, &successor_id).await?;
                    }
                    created += 1;
                }
                CardinalityClass::Multi => {
                    let existing = self
                        .store
                        .find_active_by_content(&learner_id, fact.category, &fact.content)
                        .await?;
                    match existing {
                        Some(existing) => {
                            self.store.reinforce(&existing.id, fact.importance).await?;
                            reinforced += 1;
                        }
                        None => {
                            let memory = self
                                .new_memory(learner_id, conversation_id, &fact, cancel)
                                .await?;
                            self.store.create_memory(&memory).await?;
                            created += 1;
                        }
                    }
                }
            }
        }

        Ok((created, reinforced))
    }

    /// Build a new memory for an extracted fact, embedding its content.
    async fn new_memory(
        &self,
        learner_id: Uuid,
        conversation_id: Uuid,
        fact: &ExtractedFact,
        cancel: &CancellationToken,
    ) -> Result<Memory, ExtractionError> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        let embedding = self
            .embedder
            .embed(std::slice::from_ref(&fact.content))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Query("embedder returned no vector".to_string()))?;

        Ok(Memory {
            id: Uuid::now_v7(),
            learner_id,
            conversation_id,
            category: fact.category,
            content: fact.content.clone(),
            importance: fact.importance,
            embedding: Some(embedding),
            occurrence_count: 1,
            superseded_by: None,
            created_at: Utc::now(),
        })
    }
}
