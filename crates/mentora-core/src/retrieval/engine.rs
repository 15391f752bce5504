//! Retrieval & rank-fusion engine.
//!
//! Fetches three independent candidate sets for a learner -- semantic
//! matches against the current message, high-importance memories, and the
//! most recent memories -- and fuses them into one deduplicated,
//! score-ordered list:
//!
//! 1. semantic candidates score `similarity + semantic_boost`
//! 2. high-importance candidates score `importance / 5`
//! 3. recent candidates score `(n - position) / n * 0.5`
//!
//! A memory claimed by an earlier step is never re-added or re-scored by a
//! later one (first-write-wins on identity). Ties keep per-source order:
//! the final sort is stable.

use std::collections::HashSet;

use uuid::Uuid;

use mentora_types::error::RepositoryError;
use mentora_types::memory::Memory;

use crate::memory::box_embedder::BoxEmbedder;
use crate::memory::embedder::cosine_similarity;
use crate::memory::store::MemoryStore;

use super::config::RetrievalConfig;

/// Which candidate set claimed a memory during fusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemorySource {
    Semantic { similarity: f32 },
    HighImportance,
    Recent { position: usize },
}

/// A memory with its fused relevance score.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub score: f64,
    pub source: MemorySource,
}

/// Read-only retrieval engine over a memory store and an embedder.
pub struct RetrievalEngine<M> {
    store: M,
    embedder: BoxEmbedder,
    config: RetrievalConfig,
}

impl<M: MemoryStore> RetrievalEngine<M> {
    pub fn new(store: M, embedder: BoxEmbedder, config: RetrievalConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve the fused memory context for a learner's current message.
    ///
    /// The three candidate fetches are independent and run concurrently;
    /// the merge itself is deterministic given the three result sets. If
    /// this fails, the conversation caller should degrade to "no memory
    /// context" rather than fail the turn.
    #[tracing::instrument(name = "retrieve_memories", skip(self, message), fields(learner_id = %learner_id))]
    pub async fn retrieve(
        &self,
        learner_id: Uuid,
        message: &str,
    ) -> Result<Vec<ScoredMemory>, RepositoryError> {
        let (semantic, important, recent) = tokio::join!(
            self.semantic_candidates(learner_id, message),
            self.store.list_high_importance(
                &learner_id,
                self.config.importance_threshold,
                self.config.importance_limit,
            ),
            self.store.list_recent(&learner_id, self.config.recent_limit),
        );

        let fused = fuse_candidates(&self.config, semantic?, important?, recent?);
        tracing::debug!(memories = fused.len(), "memory context assembled");
        Ok(fused)
    }

    /// Active embedded memories ranked by cosine similarity to the message.
    ///
    /// Candidates below the similarity floor are discarded; survivors are
    /// capped and ordered by similarity descending. Memories without an
    /// embedding never appear here.
    async fn semantic_candidates(
        &self,
        learner_id: Uuid,
        message: &str,
    ) -> Result<Vec<(Memory, f32)>, RepositoryError> {
        let query_text = [message.to_string()];
        let query = self
            .embedder
            .embed(&query_text)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Query("embedder returned no vector".to_string()))?;

        let embedded = self.store.list_embedded(&learner_id).await?;

        let mut matched: Vec<(Memory, f32)> = embedded
            .into_iter()
            .filter_map(|memory| {
                let similarity = memory
                    .embedding
                    .as_deref()
                    .map(|embedding| cosine_similarity(&query, embedding))?;
                (similarity >= self.config.similarity_floor).then_some((memory, similarity))
            })
            .collect();

        matched.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        matched.truncate(self.config.semantic_limit);
        Ok(matched)
    }
}

/// Fuse the three candidate sets into one deduplicated, score-ordered list.
///
/// Pure function of its inputs so the formula is testable in isolation.
/// Expects `semantic` ordered by similarity DESC, `important` by importance
/// DESC, and `recent` newest-first, as the per-source fetches produce them.
pub fn fuse_candidates(
    config: &RetrievalConfig,
    semantic: Vec<(Memory, f32)>,
    important: Vec<Memory>,
    recent: Vec<Memory>,
) -> Vec<ScoredMemory> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut fused: Vec<ScoredMemory> = Vec::new();

    for (memory, similarity) in semantic {
        if seen.insert(memory.id) {
            fused.push(ScoredMemory {
                score: similarity as f64 + config.semantic_boost,
                source: MemorySource::Semantic { similarity },
                memory,
            });
        }
    }

    for memory in important {
        if seen.insert(memory.id) {
            fused.push(ScoredMemory {
                score: memory.importance as f64 / 5.0,
                source: MemorySource::HighImportance,
                memory,
            });
        }
    }

    let recent_count = recent.len();
    for (position, memory) in recent.into_iter().enumerate() {
        if seen.insert(memory.id) {
            // Linear decay by recency position, capped below the
            // importance band.
            fused.push(ScoredMemory {
                score: (recent_count - position) as f64 / recent_count as f64 * 0.5,
                source: MemorySource::Recent { position },
                memory,
            });
        }
    }

    // Stable sort: ties keep insertion order, which is per-source order.
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(config.max_memories);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use mentora_types::memory::MemoryCategory;

    use crate::memory::embedder::Embedder;
    use crate::memory::store::MemoryStore;

    fn memory(category: MemoryCategory, content: &str, importance: u8) -> Memory {
        Memory {
            id: Uuid::now_v7(),
            learner_id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            category,
            content: content.to_string(),
            importance,
            embedding: None,
            occurrence_count: 1,
            superseded_by: None,
            created_at: Utc::now(),
        }
    }

    fn config() -> RetrievalConfig {
        RetrievalConfig::default()
    }

    #[test]
    fn test_fusion_scoring_bands() {
        // M1: semantic 0.9 -> 1.9; M2: importance 5 -> 1.0;
        // M3: most recent of one -> 0.5.
        let m1 = memory(MemoryCategory::ConceptExplained, "M1", 3);
        let m2 = memory(MemoryCategory::StruggleIdentified, "M2", 5);
        let m3 = memory(MemoryCategory::TopicDiscussed, "M3", 2);

        let fused = fuse_candidates(
            &config(),
            vec![(m1.clone(), 0.9)],
            vec![m2.clone()],
            vec![m3.clone()],
        );

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].memory.id, m1.id);
        assert!((fused[0].score - 1.9).abs() < 1e-9);
        assert_eq!(fused[1].memory.id, m2.id);
        assert!((fused[1].score - 1.0).abs() < 1e-9);
        assert_eq!(fused[2].memory.id, m3.id);
        assert!((fused[2].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_recency_scores_decay_linearly() {
        let recents: Vec<Memory> = (0..5)
            .map(|i| memory(MemoryCategory::TopicDiscussed, &format!("r{i}"), 3))
            .collect();

        let fused = fuse_candidates(&config(), vec![], vec![], recents.clone());

        assert_eq!(fused.len(), 5);
        for (index, scored) in fused.iter().enumerate() {
            let expected = (5 - index) as f64 / 5.0 * 0.5;
            assert!((scored.score - expected).abs() < 1e-9);
            assert_eq!(scored.memory.id, recents[index].id);
        }
    }

    #[test]
    fn test_dedup_semantic_wins_over_recent() {
        let shared = memory(MemoryCategory::ConceptExplained, "shared", 3);
        let other = memory(MemoryCategory::TopicDiscussed, "other", 3);

        let fused = fuse_candidates(
            &config(),
            vec![(shared.clone(), 0.8)],
            vec![],
            vec![shared.clone(), other.clone()],
        );

        // The shared memory appears once, scored by the semantic rule.
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].memory.id, shared.id);
        assert!((fused[0].score - 1.8).abs() < 1e-9);
        assert!(matches!(fused[0].source, MemorySource::Semantic { .. }));

        // The other recent memory keeps its positional score (position 1
        // of 2), unaffected by the dedup.
        assert_eq!(fused[1].memory.id, other.id);
        assert!((fused[1].score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_dedup_importance_wins_over_recent() {
        let shared = memory(MemoryCategory::StruggleIdentified, "shared", 4);

        let fused = fuse_candidates(&config(), vec![], vec![shared.clone()], vec![shared.clone()]);

        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 0.8).abs() < 1e-9);
        assert!(matches!(fused[0].source, MemorySource::HighImportance));
    }

    #[test]
    fn test_fused_list_is_truncated() {
        let mut cfg = config();
        cfg.max_memories = 3;

        let important: Vec<Memory> = (0..5)
            .map(|i| memory(MemoryCategory::StruggleIdentified, &format!("i{i}"), 5))
            .collect();
        let recents: Vec<Memory> = (0..5)
            .map(|i| memory(MemoryCategory::TopicDiscussed, &format!("r{i}"), 3))
            .collect();

        let fused = fuse_candidates(&cfg, vec![], important, recents);
        assert_eq!(fused.len(), 3);
        // Importance band (1.0) outranks the recency band (<= 0.5).
        for scored in &fused {
            assert!(matches!(scored.source, MemorySource::HighImportance));
        }
    }

    #[test]
    fn test_ties_keep_per_source_order() {
        // Two importance-5 memories tie at 1.0; stable sort keeps the
        // fetch order (importance DESC, then per-source ordering).
        let first = memory(MemoryCategory::StruggleIdentified, "first", 5);
        let second = memory(MemoryCategory::ConceptExplained, "second", 5);

        let fused = fuse_candidates(&config(), vec![], vec![first.clone(), second.clone()], vec![]);

        assert_eq!(fused[0].memory.id, first.id);
        assert_eq!(fused[1].memory.id, second.id);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let m1 = memory(MemoryCategory::ConceptExplained, "a", 3);
        let m2 = memory(MemoryCategory::StruggleIdentified, "b", 5);
        let m3 = memory(MemoryCategory::TopicDiscussed, "c", 2);
        let m4 = memory(MemoryCategory::StrengthDemonstrated, "d", 4);

        let run = || {
            fuse_candidates(
                &config(),
                vec![(m1.clone(), 0.82), (m4.clone(), 0.75)],
                vec![m2.clone(), m4.clone()],
                vec![m3.clone(), m1.clone()],
            )
        };

        let first: Vec<(Uuid, f64)> = run().iter().map(|s| (s.memory.id, s.score)).collect();
        let second: Vec<(Uuid, f64)> = run().iter().map(|s| (s.memory.id, s.score)).collect();
        assert_eq!(first, second);

        // m4 is claimed by the semantic pass; the importance pass must not
        // re-score it.
        assert_eq!(first.len(), 4);
        assert_eq!(first[0].0, m1.id);
        assert_eq!(first[1].0, m4.id);
        assert!((first[1].1 - 1.75).abs() < 1e-9);
    }

    // --- Engine-level tests with fake store/embedder ---

    #[derive(Clone, Default)]
    struct FixtureStore {
        embedded: Vec<Memory>,
        important: Vec<Memory>,
        recent: Vec<Memory>,
    }

    impl MemoryStore for FixtureStore {
        async fn create_memory(&self, _memory: &Memory) -> Result<(), RepositoryError> {
            unimplemented!("retrieval is read-only")
        }

        async fn find_active_by_category(
            &self,
            _learner_id: &Uuid,
            _category: MemoryCategory,
        ) -> Result<Option<Memory>, RepositoryError> {
            unimplemented!("retrieval is read-only")
        }

        async fn find_active_by_content(
            &self,
            _learner_id: &Uuid,
            _category: MemoryCategory,
            _content: &str,
        ) -> Result<Option<Memory>, RepositoryError> {
            unimplemented!("retrieval is read-only")
        }

        async fn list_recent(
            &self,
            _learner_id: &Uuid,
            limit: usize,
        ) -> Result<Vec<Memory>, RepositoryError> {
            Ok(self.recent.iter().take(limit).cloned().collect())
        }

        async fn list_high_importance(
            &self,
            _learner_id: &Uuid,
            min_importance: u8,
            limit: usize,
        ) -> Result<Vec<Memory>, RepositoryError> {
            Ok(self
                .important
                .iter()
                .filter(|m| m.importance >= min_importance)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn list_embedded(&self, _learner_id: &Uuid) -> Result<Vec<Memory>, RepositoryError> {
            Ok(self.embedded.clone())
        }

        async fn mark_superseded(
            &self,
            _memory_id: &Uuid,
            _successor_id: &Uuid,
        ) -> Result<(), RepositoryError> {
            unimplemented!("retrieval is read-only")
        }

        async fn reinforce(
            &self,
            _memory_id: &Uuid,
            _importance: u8,
        ) -> Result<(), RepositoryError> {
            unimplemented!("retrieval is read-only")
        }

        async fn cursor(&self, _conversation_id: &Uuid) -> Result<Option<Uuid>, RepositoryError> {
            unimplemented!("retrieval is read-only")
        }

        async fn advance_cursor(
            &self,
            _conversation_id: &Uuid,
            _last_message_id: Uuid,
        ) -> Result<(), RepositoryError> {
            unimplemented!("retrieval is read-only")
        }
    }

    /// Embedder whose query vector is the unit x-axis, so a memory's
    /// similarity is just the x component of its (unit) embedding.
    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn model_name(&self) -> &str {
            "axis-test-embedder"
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn with_embedding(mut memory: Memory, x: f32) -> Memory {
        let y = (1.0 - x * x).max(0.0).sqrt();
        memory.embedding = Some(vec![x, y]);
        memory
    }

    #[tokio::test]
    async fn test_engine_excludes_candidates_below_similarity_floor() {
        let strong = with_embedding(memory(MemoryCategory::ConceptExplained, "strong", 3), 0.9);
        let weak = with_embedding(memory(MemoryCategory::ConceptExplained, "weak", 3), 0.3);

        let store = FixtureStore {
            embedded: vec![strong.clone(), weak.clone()],
            ..Default::default()
        };
        let engine = RetrievalEngine::new(
            store,
            BoxEmbedder::new(AxisEmbedder),
            RetrievalConfig::default(),
        );

        let result = engine.retrieve(Uuid::now_v7(), "query").await.unwrap();

        // The weak candidate is excluded entirely, even though no other
        // set includes it.
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].memory.id, strong.id);
        assert!((result[0].score - 1.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_engine_skips_memories_without_embedding() {
        let bare = memory(MemoryCategory::TopicDiscussed, "no embedding", 3);
        let store = FixtureStore {
            // list_embedded in a real store never returns these; the
            // engine also guards against it.
            embedded: vec![bare],
            ..Default::default()
        };
        let engine = RetrievalEngine::new(
            store,
            BoxEmbedder::new(AxisEmbedder),
            RetrievalConfig::default(),
        );

        let result = engine.retrieve(Uuid::now_v7(), "query").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_engine_m1_m2_m3_scenario() {
        let m1 = with_embedding(memory(MemoryCategory::ConceptExplained, "M1", 3), 0.9);
        let m2 = memory(MemoryCategory::StruggleIdentified, "M2", 5);
        let m3 = memory(MemoryCategory::TopicDiscussed, "M3", 2);

        let store = FixtureStore {
            embedded: vec![m1.clone()],
            important: vec![m2.clone()],
            recent: vec![m3.clone()],
        };
        let engine = RetrievalEngine::new(
            store,
            BoxEmbedder::new(AxisEmbedder),
            RetrievalConfig::default(),
        );

        let result = engine.retrieve(Uuid::now_v7(), "query").await.unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].memory.id, m1.id);
        assert!((result[0].score - 1.9).abs() < 1e-6);
        assert_eq!(result[1].memory.id, m2.id);
        assert!((result[1].score - 1.0).abs() < 1e-9);
        assert_eq!(result[2].memory.id, m3.id);
        assert!((result[2].score - 0.5).abs() < 1e-9);
    }
}
