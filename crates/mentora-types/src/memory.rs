//! Memory types for Mentora.
//!
//! These types model the coach's long-term memory about a learner: durable
//! facts extracted from conversations, classified by category and weighted
//! by importance. Categories carry a cardinality class that drives the
//! write policy: single-cardinality facts supersede their predecessor,
//! multi-cardinality facts are reinforced on exact repeat.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Importance assigned when an extraction carries no hint.
pub const DEFAULT_IMPORTANCE: u8 = 3;

/// Minimum importance for a current-focus fact.
pub const CURRENT_FOCUS_MIN_IMPORTANCE: u8 = 4;

/// Clamp a raw importance value from the LLM into the valid 1..=5 range.
pub fn clamp_importance(raw: i64) -> u8 {
    raw.clamp(1, 5) as u8
}

/// How many active memories a category permits per learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityClass {
    /// At most one active memory; a new write supersedes the prior one.
    Single,
    /// Many memories coexist; exact content repeats reinforce instead.
    Multi,
}

/// Category of an extracted memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    CurrentFocus,
    TopicDiscussed,
    ConceptExplained,
    StruggleIdentified,
    StrengthDemonstrated,
}

impl MemoryCategory {
    /// All categories, in the fixed order used for prompt formatting.
    pub const ALL: [MemoryCategory; 5] = [
        MemoryCategory::CurrentFocus,
        MemoryCategory::TopicDiscussed,
        MemoryCategory::ConceptExplained,
        MemoryCategory::StrengthDemonstrated,
        MemoryCategory::StruggleIdentified,
    ];

    /// The cardinality class driving this category's write policy.
    pub fn cardinality(&self) -> CardinalityClass {
        match self {
            MemoryCategory::CurrentFocus => CardinalityClass::Single,
            MemoryCategory::TopicDiscussed
            | MemoryCategory::ConceptExplained
            | MemoryCategory::StruggleIdentified
            | MemoryCategory::StrengthDemonstrated => CardinalityClass::Multi,
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryCategory::CurrentFocus => write!(f, "current_focus"),
            MemoryCategory::TopicDiscussed => write!(f, "topic_discussed"),
            MemoryCategory::ConceptExplained => write!(f, "concept_explained"),
            MemoryCategory::StruggleIdentified => write!(f, "struggle_identified"),
            MemoryCategory::StrengthDemonstrated => write!(f, "strength_demonstrated"),
        }
    }
}

impl FromStr for MemoryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current_focus" => Ok(MemoryCategory::CurrentFocus),
            "topic_discussed" => Ok(MemoryCategory::TopicDiscussed),
            "concept_explained" => Ok(MemoryCategory::ConceptExplained),
            "struggle_identified" => Ok(MemoryCategory::StruggleIdentified),
            "strength_demonstrated" => Ok(MemoryCategory::StrengthDemonstrated),
            other => Err(format!("invalid memory category: '{other}'")),
        }
    }
}

/// A durable fact about one learner, extracted from a conversation.
///
/// Memories are learner-scoped and conversation-linked. Single-cardinality
/// memories can be superseded by newer ones (the old record is kept for
/// audit, never deleted); multi-cardinality memories accumulate an
/// occurrence count when the same content is extracted again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub learner_id: Uuid,
    /// The conversation this fact was extracted from.
    pub conversation_id: Uuid,
    pub category: MemoryCategory,
    /// The extracted fact, as free text.
    pub content: String,
    /// Importance score from 1 (low) to 5 (critical).
    pub importance: u8,
    /// Embedding vector, present once the embedding collaborator has
    /// processed this memory. Persisted as a little-endian f32 blob.
    pub embedding: Option<Vec<f32>>,
    /// How many times this exact fact has been extracted.
    pub occurrence_count: u32,
    /// If this memory was superseded by a newer one, its ID.
    pub superseded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Memory {
    /// Whether this memory participates in retrieval and reinforcement.
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }
}

/// Per-conversation watermark of messages already folded into memories.
///
/// Advances only after a batch of extracted memories (possibly empty) has
/// been durably written; re-running extraction before the advance is safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionCursor {
    pub conversation_id: Uuid,
    pub last_processed_message_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

/// Counters reported by one extraction run, for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Conversations that had unprocessed messages.
    pub conversations_processed: u32,
    pub memories_created: u32,
    pub memories_reinforced: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_category_roundtrip() {
        for cat in MemoryCategory::ALL {
            let s = cat.to_string();
            let parsed: MemoryCategory = s.parse().unwrap();
            assert_eq!(cat, parsed);
        }
    }

    #[test]
    fn test_memory_category_serde() {
        let cat = MemoryCategory::StruggleIdentified;
        let json = serde_json::to_string(&cat).unwrap();
        assert_eq!(json, "\"struggle_identified\"");
        let parsed: MemoryCategory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MemoryCategory::StruggleIdentified);
    }

    #[test]
    fn test_cardinality_classes() {
        assert_eq!(
            MemoryCategory::CurrentFocus.cardinality(),
            CardinalityClass::Single
        );
        for cat in [
            MemoryCategory::TopicDiscussed,
            MemoryCategory::ConceptExplained,
            MemoryCategory::StruggleIdentified,
            MemoryCategory::StrengthDemonstrated,
        ] {
            assert_eq!(cat.cardinality(), CardinalityClass::Multi);
        }
    }

    #[test]
    fn test_clamp_importance() {
        assert_eq!(clamp_importance(10), 5);
        assert_eq!(clamp_importance(-3), 1);
        assert_eq!(clamp_importance(0), 1);
        assert_eq!(clamp_importance(3), 3);
    }

    #[test]
    fn test_memory_active_predicate() {
        let mut memory = Memory {
            id: Uuid::now_v7(),
            learner_id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            category: MemoryCategory::TopicDiscussed,
            content: "ownership and borrowing".to_string(),
            importance: 3,
            embedding: None,
            occurrence_count: 1,
            superseded_by: None,
            created_at: Utc::now(),
        };
        assert!(memory.is_active());

        memory.superseded_by = Some(Uuid::now_v7());
        assert!(!memory.is_active());
    }

    #[test]
    fn test_memory_serialize() {
        let memory = Memory {
            id: Uuid::now_v7(),
            learner_id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            category: MemoryCategory::CurrentFocus,
            content: "async Rust fundamentals".to_string(),
            importance: 4,
            embedding: None,
            occurrence_count: 1,
            superseded_by: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&memory).unwrap();
        assert!(json.contains("\"category\":\"current_focus\""));
        assert!(json.contains("\"importance\":4"));
    }
}
