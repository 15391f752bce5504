//! Prompt-section formatting for retrieved memories and learner profiles.
//!
//! Two independent sections, each wrapped in an XML tag so the LLM can
//! distinguish them from the rest of the system prompt, and each omitted
//! entirely when there is no data.

use mentora_types::learner::LearnerProfile;
use mentora_types::memory::MemoryCategory;

use super::engine::ScoredMemory;

/// Separator joining multiple items on one category line.
const ITEM_SEPARATOR: &str = ", ";

/// Builds the memory and profile sections of the outbound system prompt.
///
/// Layout:
/// ```text
/// <learner_memory>
/// What you know about this learner from previous sessions:
/// Current focus: ...
/// Topics discussed previously: a, b
/// Concepts already explained: ...
/// Strengths observed: ...
/// Struggles to reinforce: ...
/// </learner_memory>
///
/// <learner_profile>
/// Role: ...
/// Experience level: ...
/// ...
/// </learner_profile>
/// ```
pub struct ContextFormatter;

impl ContextFormatter {
    /// Render the fused memory list into a prompt section.
    ///
    /// Memories are grouped by category into fixed-order lines; categories
    /// with no items produce no line. Returns `None` for an empty list so
    /// the caller omits the section.
    pub fn memory_section(memories: &[ScoredMemory]) -> Option<String> {
        if memories.is_empty() {
            return None;
        }

        let mut lines = vec!["What you know about this learner from previous sessions:".to_string()];

        for category in MemoryCategory::ALL {
            let items: Vec<&str> = memories
                .iter()
                .filter(|scored| scored.memory.category == category)
                .map(|scored| scored.memory.content.as_str())
                .collect();
            if items.is_empty() {
                continue;
            }
            lines.push(format!(
                "{}: {}",
                category_label(category),
                items.join(ITEM_SEPARATOR)
            ));
        }

        Some(format!("<learner_memory>\n{}\n</learner_memory>", lines.join("\n")))
    }

    /// Render the structured learner profile into a prompt section.
    ///
    /// Returns `None` when the profile carries no data.
    pub fn profile_section(profile: &LearnerProfile) -> Option<String> {
        if profile.is_empty() {
            return None;
        }

        let mut lines = Vec::new();
        if let Some(role) = profile.role.as_deref() {
            lines.push(format!("Role: {role}"));
        }
        if let Some(level) = profile.experience_level {
            lines.push(format!("Experience level: {level}"));
        }
        if !profile.tech_stack.is_empty() {
            lines.push(format!("Tech stack: {}", profile.tech_stack.join(ITEM_SEPARATOR)));
        }
        if !profile.goals.is_empty() {
            lines.push(format!("Goals: {}", profile.goals.join(ITEM_SEPARATOR)));
        }
        if let Some(style) = profile.learning_style.as_deref() {
            lines.push(format!("Learning style: {style}"));
        }
        if let Some(pace) = profile.pace_preference {
            lines.push(format!("Preferred pace: {pace}"));
        }

        Some(format!(
            "<learner_profile>\n{}\n</learner_profile>",
            lines.join("\n")
        ))
    }
}

fn category_label(category: MemoryCategory) -> &'static str {
    match category {
        MemoryCategory::CurrentFocus => "Current focus",
        MemoryCategory::TopicDiscussed => "Topics discussed previously",
        MemoryCategory::ConceptExplained => "Concepts already explained",
        MemoryCategory::StrengthDemonstrated => "Strengths observed",
        MemoryCategory::StruggleIdentified => "Struggles to reinforce",
    }
}
