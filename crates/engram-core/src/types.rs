// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types shared across the Engram workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a record summary in characters.
pub const MAX_SUMMARY_LEN: usize = 500;

/// The memory layer a record belongs to.
///
/// The layer determines which payload variant [`MemoryContent`] carries and
/// which layer-specific columns (`fact_hash`, `chunk_index`) are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryLayer {
    /// Recent conversation chunks, created live and expired via TTL.
    ShortTerm,
    /// Durable facts extracted from past conversations.
    LongTerm,
    /// Global knowledge base, not scoped to any user or conversation.
    Personality,
}

impl MemoryLayer {
    /// Convert to string for SQLite storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryLayer::ShortTerm => "short_term",
            MemoryLayer::LongTerm => "long_term",
            MemoryLayer::Personality => "personality",
        }
    }

    /// Parse from SQLite string.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "short_term" => MemoryLayer::ShortTerm,
            "personality" => MemoryLayer::Personality,
            _ => MemoryLayer::LongTerm,
        }
    }
}

/// Optional room/conversation tag scoping a memory to its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum MemoryContext {
    Room(String),
    Conversation(String),
}

impl MemoryContext {
    /// The conversation id, if this context is conversation-scoped.
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            MemoryContext::Conversation(id) => Some(id),
            MemoryContext::Room(_) => None,
        }
    }

    /// The room id, if this context is room-scoped.
    pub fn room_id(&self) -> Option<&str> {
        match self {
            MemoryContext::Room(id) => Some(id),
            MemoryContext::Conversation(_) => None,
        }
    }
}

/// A single conversation message stored verbatim inside a short-term chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Identifier of the human sender.
    pub sender_id: String,
    /// Display name used when formatting extraction prompts.
    pub sender_name: String,
    /// Raw message text.
    pub content: String,
}

/// An atomic fact extracted from a short-term chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// The fact as a standalone statement.
    pub text: String,
    /// LLM-assigned importance in [0.0, 1.0].
    pub importance: f64,
    /// Participant names the fact is about.
    #[serde(default)]
    pub participants: Vec<String>,
    /// Short topical label, e.g. "Skill" or "General Fact".
    #[serde(default)]
    pub theme: String,
}

/// Layer-specific payload of a memory record.
///
/// The variant must agree with [`MemoryRecord::layer`]: short-term records
/// carry raw messages, long-term records a single fact, personality records
/// free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryContent {
    /// Verbatim message slice backing a short-term chunk.
    Messages {
        messages: Vec<StoredMessage>,
        message_count: usize,
    },
    /// A single extracted fact.
    Fact { fact: Fact },
    /// Free text from a personality document chunk, with upload metadata
    /// (`category`, `chunk_index`, `total_chunks`, plus caller-supplied keys).
    Text {
        text: String,
        #[serde(default)]
        metadata: serde_json::Value,
    },
}

impl MemoryContent {
    /// The layer this payload variant belongs to.
    pub fn layer(&self) -> MemoryLayer {
        match self {
            MemoryContent::Messages { .. } => MemoryLayer::ShortTerm,
            MemoryContent::Fact { .. } => MemoryLayer::LongTerm,
            MemoryContent::Text { .. } => MemoryLayer::Personality,
        }
    }
}

/// The sole persisted entity: one memory belonging to an AI agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, assigned at creation, immutable.
    pub id: String,
    /// The owning AI agent.
    pub owner_id: String,
    /// Human participants this memory is relevant to; empty for global memories.
    pub user_ids: Vec<String>,
    /// Optional room/conversation provenance tag.
    pub context: Option<MemoryContext>,
    /// Memory layer; determines the `content` variant and layer-specific fields.
    pub layer: MemoryLayer,
    /// Short human/LLM-readable label.
    pub summary: String,
    /// Layer-specific payload.
    pub content: MemoryContent,
    /// Normalized lowercase keywords extracted from the payload.
    pub keywords: Vec<String>,
    /// Importance in [0.0, 1.0]; 1.0 for short-term/personality, LLM-assigned for facts.
    pub importance: f64,
    /// Embedding vector; present for long-term and personality, absent for short-term.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    /// Number of times this memory was surfaced to a caller.
    pub access_count: i64,
    /// When this memory was last surfaced.
    pub last_accessed: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Normalized-text hash for idempotent fact inserts (long-term only).
    pub fact_hash: Option<String>,
    /// Index of the source chunk within its conversation.
    pub chunk_index: Option<i64>,
    /// Message index range `[start, end)` of the source chunk, e.g. `"0-24"`.
    pub message_range: Option<String>,
}

impl MemoryRecord {
    /// The conversation id of this record's context, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.context.as_ref().and_then(MemoryContext::conversation_id)
    }
}

/// Filters applied to a single-layer memory search.
///
/// Vector search applies these in the store query; keyword search applies
/// them post-hoc via [`SearchFilters::matches`] so both paths see the same
/// candidate universe.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Restrict to memories relevant to this user.
    pub user_id: Option<String>,
    /// Restrict to memories from this conversation.
    pub conversation_id: Option<String>,
    /// Exclude memories from this conversation (NULL contexts are kept).
    pub exclude_conversation_id: Option<String>,
    /// Restrict to a single memory layer.
    pub layer: Option<MemoryLayer>,
}

impl SearchFilters {
    /// True when `record` passes every configured filter.
    pub fn matches(&self, record: &MemoryRecord) -> bool {
        if let Some(user_id) = &self.user_id
            && !record.user_ids.iter().any(|u| u == user_id)
        {
            return false;
        }

        if let Some(conversation_id) = &self.conversation_id
            && record.conversation_id() != Some(conversation_id.as_str())
        {
            return false;
        }

        // NULL-safe exclusion: records without a conversation context are kept.
        if let Some(excluded) = &self.exclude_conversation_id
            && record.conversation_id() == Some(excluded.as_str())
        {
            return false;
        }

        if let Some(layer) = self.layer
            && record.layer != layer
        {
            return false;
        }

        true
    }
}

/// Input for an embedding batch call.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output of an embedding batch call; `embeddings` preserves input order.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

/// Truncate text for a record summary, appending an ellipsis when cut.
pub fn truncate_summary(text: &str, max_length: usize) -> String {
    if text.chars().count() > max_length {
        let cut: String = text.chars().take(max_length).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(layer: MemoryLayer, conversation: Option<&str>) -> MemoryRecord {
        MemoryRecord {
            id: "mem-1".into(),
            owner_id: "ai-1".into(),
            user_ids: vec!["u-1".into()],
            context: conversation.map(|c| MemoryContext::Conversation(c.to_string())),
            layer,
            summary: "test".into(),
            content: MemoryContent::Text {
                text: "test".into(),
                metadata: serde_json::Value::Null,
            },
            keywords: vec![],
            importance: 1.0,
            embedding: None,
            access_count: 0,
            last_accessed: None,
            created_at: Utc::now(),
            fact_hash: None,
            chunk_index: None,
            message_range: None,
        }
    }

    #[test]
    fn layer_roundtrip() {
        for layer in [
            MemoryLayer::ShortTerm,
            MemoryLayer::LongTerm,
            MemoryLayer::Personality,
        ] {
            assert_eq!(MemoryLayer::from_str_value(layer.as_str()), layer);
        }
    }

    #[test]
    fn content_variant_maps_to_layer() {
        let messages = MemoryContent::Messages {
            messages: vec![],
            message_count: 0,
        };
        assert_eq!(messages.layer(), MemoryLayer::ShortTerm);

        let fact = MemoryContent::Fact {
            fact: Fact {
                text: "Bob uses Python".into(),
                importance: 0.8,
                participants: vec!["Bob".into()],
                theme: "Skill".into(),
            },
        };
        assert_eq!(fact.layer(), MemoryLayer::LongTerm);

        let text = MemoryContent::Text {
            text: "lore".into(),
            metadata: serde_json::Value::Null,
        };
        assert_eq!(text.layer(), MemoryLayer::Personality);
    }

    #[test]
    fn filters_match_user_and_layer() {
        let record = make_record(MemoryLayer::LongTerm, Some("c-1"));

        let filters = SearchFilters {
            user_id: Some("u-1".into()),
            layer: Some(MemoryLayer::LongTerm),
            ..Default::default()
        };
        assert!(filters.matches(&record));

        let wrong_user = SearchFilters {
            user_id: Some("u-2".into()),
            ..Default::default()
        };
        assert!(!wrong_user.matches(&record));

        let wrong_layer = SearchFilters {
            layer: Some(MemoryLayer::ShortTerm),
            ..Default::default()
        };
        assert!(!wrong_layer.matches(&record));
    }

    #[test]
    fn exclusion_is_null_safe() {
        let filters = SearchFilters {
            exclude_conversation_id: Some("c-42".into()),
            ..Default::default()
        };

        // A record from the excluded conversation is dropped.
        let excluded = make_record(MemoryLayer::LongTerm, Some("c-42"));
        assert!(!filters.matches(&excluded));

        // A record from another conversation passes.
        let other = make_record(MemoryLayer::LongTerm, Some("c-7"));
        assert!(filters.matches(&other));

        // A global record with no context passes.
        let global = make_record(MemoryLayer::Personality, None);
        assert!(filters.matches(&global));
    }

    #[test]
    fn context_accessors() {
        let conv = MemoryContext::Conversation("c-1".into());
        assert_eq!(conv.conversation_id(), Some("c-1"));
        assert_eq!(conv.room_id(), None);

        let room = MemoryContext::Room("r-1".into());
        assert_eq!(room.room_id(), Some("r-1"));
        assert_eq!(room.conversation_id(), None);
    }

    #[test]
    fn truncate_summary_adds_ellipsis() {
        assert_eq!(truncate_summary("short", 10), "short");
        let long = "x".repeat(30);
        let truncated = truncate_summary(&long, 10);
        assert_eq!(truncated, format!("{}...", "x".repeat(10)));
    }

    #[test]
    fn content_serde_is_tagged() {
        let content = MemoryContent::Fact {
            fact: Fact {
                text: "Bob uses Python".into(),
                importance: 0.8,
                participants: vec!["Bob".into()],
                theme: "Skill".into(),
            },
        };
        let json = serde_json::to_string(&content).unwrap();
        assert!(json.contains("\"kind\":\"fact\""));
        let parsed: MemoryContent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, content);
    }
}
