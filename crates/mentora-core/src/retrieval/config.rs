//! Retrieval engine configuration.
//!
//! All thresholds and caps of the fusion formula live here and are
//! injected at engine construction, keeping the merge testable in
//! isolation.

/// Named constants for candidate selection and rank fusion.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// How many most-recent active memories to fetch.
    pub recent_limit: usize,
    /// Minimum importance for the high-importance candidate set.
    pub importance_threshold: u8,
    /// Cap on the high-importance candidate set.
    pub importance_limit: usize,
    /// Cap on the semantic candidate set.
    pub semantic_limit: usize,
    /// Cosine similarity floor below which semantic candidates are dropped.
    pub similarity_floor: f32,
    /// Additive boost so any semantic match outranks non-semantic signals.
    pub semantic_boost: f64,
    /// Cap on the fused result list.
    pub max_memories: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            recent_limit: 5,
            importance_threshold: 4,
            importance_limit: 5,
            semantic_limit: 10,
            similarity_floor: 0.7,
            semantic_boost: 1.0,
            max_memories: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetrievalConfig::default();
        assert_eq!(config.recent_limit, 5);
        assert_eq!(config.importance_threshold, 4);
        assert_eq!(config.importance_limit, 5);
        assert_eq!(config.semantic_limit, 10);
        assert!((config.similarity_floor - 0.7).abs() < f32::EPSILON);
        assert!((config.semantic_boost - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.max_memories, 20);
    }
}
