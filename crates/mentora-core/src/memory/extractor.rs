//! Transcript rendering and defensive parsing of LLM extraction output.
//!
//! The extraction call asks the model for a single JSON object describing
//! facts worth remembering about the learner. Model output is unreliable:
//! it may be fenced in Markdown, truncated, or not JSON at all. Parsing is
//! therefore a loosely-typed tree walk with explicit presence checks, and
//! any failure degrades to "zero memories extracted" -- extraction is
//! best-effort, a parse failure is model variance, not a system fault.

use std::collections::HashMap;

use serde_json::Value;

use mentora_types::conversation::ConversationMessage;
use mentora_types::llm::MessageRole;
use mentora_types::memory::{
    clamp_importance, MemoryCategory, CURRENT_FOCUS_MIN_IMPORTANCE, DEFAULT_IMPORTANCE,
};

/// System prompt for the memory extraction LLM call.
///
/// Instructs the model to extract only durable facts about the learner and
/// to answer with bare JSON.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a memory extraction assistant for a \
programming coach. Extract durable facts about the learner from the transcript: topics that \
were discussed, concepts that were explained, struggles the learner showed, strengths the \
learner demonstrated, and what the learner is currently focused on. Return JSON only, with no \
commentary.";

/// Per-conversation instruction describing the expected JSON shape.
///
/// Keys mirror the multi-cardinality categories as arrays, the
/// single-cardinality current focus as an optional string, and an
/// `importance` object mapping fact text to a 1-5 weight.
const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Analyze the coaching transcript below and return a JSON object with exactly these fields:

- "topics_discussed": array of strings, topics the conversation covered
- "concepts_explained": array of strings, concepts the coach explained
- "struggles_identified": array of strings, things the learner struggled with
- "strengths_demonstrated": array of strings, things the learner did well
- "current_focus": string, what the learner is working toward right now (omit if unclear)
- "importance": object mapping each fact string above to an integer 1-5 (5 = critical to remember)

Each fact must be a single, self-contained phrase. Do not include greetings or pleasantries. If there is nothing worth extracting, return empty arrays.

Transcript:
"#;

/// One fact pulled out of the model's response, ready for policy application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub category: MemoryCategory,
    pub content: String,
    pub importance: u8,
}

/// Successfully parsed extraction output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMemories {
    pub facts: Vec<ExtractedFact>,
}

/// Outcome of parsing the model's raw response.
///
/// `Failure` is not an error: the pipeline treats it as zero extracted
/// memories and still advances the cursor (the messages were seen, they
/// just yielded nothing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(ParsedMemories),
    Failure,
}

/// Render messages into a role-tagged transcript, chronological order.
///
/// User messages are labelled `Learner:`, assistant messages `Coach:`;
/// system messages are not part of the conversation and are skipped.
pub fn render_transcript(messages: &[ConversationMessage]) -> String {
    let mut lines = Vec::with_capacity(messages.len());
    for message in messages {
        let speaker = match message.role {
            MessageRole::User => "Learner",
            MessageRole::Assistant => "Coach",
            MessageRole::System => continue,
        };
        lines.push(format!("{speaker}: {}", message.content));
    }
    lines.join("\n")
}

/// Build the extraction prompt for a rendered transcript.
pub fn build_extraction_prompt(transcript: &str) -> String {
    format!("{EXTRACTION_PROMPT_TEMPLATE}{transcript}")
}

/// Parse the model's raw response into extracted facts.
///
/// Strips a Markdown code fence if present, then walks the JSON tree with
/// explicit presence checks. Importance comes from the `importance` hints
/// object keyed by fact text, defaulting to 3 and clamped to 1..=5; a
/// current-focus fact is floored at 4.
pub fn parse_extraction(raw: &str) -> ParseOutcome {
    let stripped = strip_code_fence(raw);

    let root: Value = match serde_json::from_str(stripped) {
        Ok(value) => value,
        Err(e) => {
            let preview: String = stripped.chars().take(200).collect();
            tracing::warn!(
                error = %e,
                content_preview = %preview,
                "Failed to parse extraction JSON; treating as zero memories"
            );
            return ParseOutcome::Failure;
        }
    };

    let Some(object) = root.as_object() else {
        tracing::warn!("Extraction response is valid JSON but not an object; treating as zero memories");
        return ParseOutcome::Failure;
    };

    let hints = importance_hints(object.get("importance"));

    let mut facts = Vec::new();

    for (key, category) in [
        ("topics_discussed", MemoryCategory::TopicDiscussed),
        ("concepts_explained", MemoryCategory::ConceptExplained),
        ("struggles_identified", MemoryCategory::StruggleIdentified),
        ("strengths_demonstrated", MemoryCategory::StrengthDemonstrated),
    ] {
        let Some(entries) = object.get(key).and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            let Some(text) = entry.as_str() else { continue };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            facts.push(ExtractedFact {
                category,
                content: text.to_string(),
                importance: hint_or_default(&hints, text),
            });
        }
    }

    if let Some(focus) = object.get("current_focus").and_then(Value::as_str) {
        let focus = focus.trim();
        if !focus.is_empty() {
            // A current-focus fact is deliberately weighted high.
            let importance = hint_or_default(&hints, focus).max(CURRENT_FOCUS_MIN_IMPORTANCE);
            facts.push(ExtractedFact {
                category: MemoryCategory::CurrentFocus,
                content: focus.to_string(),
                importance,
            });
        }
    }

    ParseOutcome::Parsed(ParsedMemories { facts })
}

/// Collect the importance-hints map, clamping each value to 1..=5.
fn importance_hints(value: Option<&Value>) -> HashMap<String, u8> {
    let mut hints = HashMap::new();
    if let Some(object) = value.and_then(Value::as_object) {
        for (key, raw) in object {
            if let Some(importance) = raw.as_i64() {
                hints.insert(key.clone(), clamp_importance(importance));
            }
        }
    }
    hints
}

fn hint_or_default(hints: &HashMap<String, u8>, text: &str) -> u8 {
    hints.get(text).copied().unwrap_or(DEFAULT_IMPORTANCE)
}

/// Strip a surrounding Markdown code fence (``` or ```json) if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line, then the closing fence.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return trimmed,
    };
    body.strip_suffix("```").map_or(body, str::trim).trim()
}
